//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a session's history to an LLM and stream the
//! response back as incremental chunks. Chunks carry raw fragments only;
//! reassembling tool calls is the caller's job.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receiving half of a streamed completion. The stream ends when the channel closes.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, ProviderError>>;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// The full message history, in order
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call during this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Tool call fragments carried by this chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,
}

impl StreamChunk {
    /// A chunk carrying only a text delta.
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            content: Some(delta.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A chunk carrying only tool call fragments.
    pub fn fragments(fragments: Vec<ToolCallFragment>) -> Self {
        Self {
            content: None,
            tool_calls: fragments,
        }
    }
}

/// One piece of a tool call as it arrives mid-stream.
///
/// `index` is the only reliable correlation key; every other field may be
/// absent or split at an arbitrary byte boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    /// The opening fragment of a call: id and name, no arguments yet.
    pub fn start(index: u32, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// A continuation fragment carrying part of the arguments JSON.
    pub fn arguments(index: u32, arguments: impl Into<String>) -> Self {
        Self {
            index,
            arguments: Some(arguments.into()),
            ..Self::default()
        }
    }
}

/// The core Provider trait.
///
/// The workflow engine calls `stream()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response chunks.
    ///
    /// Dropping the receiver tells the producer to stop.
    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError>;
}
