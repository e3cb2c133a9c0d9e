//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions` with SSE streaming and function calling.
//!
//! The provider does not assemble tool calls. Each SSE chunk is forwarded as
//! a [`StreamChunk`] carrying the raw text delta and tool-call fragments.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use switchboard_core::error::ProviderError;
use switchboard_core::message::Message;
use switchboard_core::provider::*;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and forward parsed chunks. Returning drops
        // `tx`, which closes the channel and ends the stream for the receiver.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut parser = SseParser::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in parser.feed(&bytes) {
                    match event {
                        SseEvent::Chunk(chunk) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                trace!(provider = %provider_name, "Receiver dropped, stopping stream");
                                return;
                            }
                        }
                        SseEvent::Done => return,
                        SseEvent::Error {
                            status_code,
                            message,
                        } => {
                            warn!(provider = %provider_name, status = ?status_code, error = %message, "Provider stream reported an error");
                            let error = match status_code {
                                Some(status_code) => ProviderError::ApiError {
                                    status_code,
                                    message,
                                },
                                None => ProviderError::StreamInterrupted(message),
                            };
                            let _ = tx.send(Err(error)).await;
                            return;
                        }
                    }
                }
            }

            trace!(provider = %provider_name, "Stream ended without [DONE]");
        });

        Ok(rx)
    }
}

/// What one complete SSE line turned into.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Chunk(StreamChunk),
    Done,
    /// A malformed line or an in-band `{"error": ...}` object. Ends the stream.
    Error {
        status_code: Option<u16>,
        message: String,
    },
}

impl SseEvent {
    fn malformed(data: &str, error: serde_json::Error) -> Self {
        SseEvent::Error {
            status_code: None,
            message: format!("malformed SSE data ({error}): {data}"),
        }
    }
}

/// Incremental SSE line parser. Bytes may split lines (and UTF-8 sequences)
/// anywhere; only complete lines are interpreted.
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                events.push(SseEvent::Done);
                break;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(StreamResponse {
                    error: Some(error), ..
                }) => {
                    events.push(error.into_event());
                    break;
                }
                Ok(resp) => {
                    if let Some(chunk) = resp.into_chunk() {
                        events.push(SseEvent::Chunk(chunk));
                    }
                }
                Err(e) => {
                    events.push(SseEvent::malformed(data, e));
                    break;
                }
            }
        }

        events
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

/// `{"error": {"message": ..., "code": ...}}` sent mid-stream by some endpoints.
#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl StreamErrorBody {
    fn into_event(self) -> SseEvent {
        let status_code = self
            .code
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|code| u16::try_from(code).ok());
        SseEvent::Error {
            status_code,
            message: self
                .message
                .unwrap_or_else(|| "provider reported an error".into()),
        }
    }
}

impl StreamResponse {
    /// The first choice's delta, or `None` when it carries nothing.
    fn into_chunk(self) -> Option<StreamChunk> {
        let delta = self.choices.into_iter().next()?.delta;
        let content = delta.content.filter(|c| !c.is_empty());
        let tool_calls: Vec<ToolCallFragment> = delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                ToolCallFragment {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect();

        if content.is_none() && tool_calls.is_empty() {
            return None;
        }
        Some(StreamChunk {
            content,
            tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta. Arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
