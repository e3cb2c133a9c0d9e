//! Stream accumulator: rebuilds tool calls from streamed fragments.
//!
//! Tool calls arrive as fragments spread over any number of chunks. Each
//! fragment carries an `index`; fragments with the same index belong to the
//! same call and are concatenated in receipt order. Nothing is parsed until
//! the stream ends.

use crate::error::WorkflowError;
use std::collections::BTreeMap;
use switchboard_core::provider::{ChunkReceiver, StreamChunk, ToolCallFragment};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One tool call while its fragments are still arriving.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallBuffer {
    pub id: String,
    pub name: String,
    pub arguments_raw: String,
}

/// The accumulated arguments of one call did not parse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid arguments for tool '{name}': {reason}")]
pub struct ArgumentsError {
    pub name: String,
    pub raw: String,
    pub reason: String,
}

/// A tool call after the stream ended.
#[derive(Debug, Clone)]
pub struct CompletedToolCall {
    pub index: u32,
    pub id: String,
    pub name: String,
    pub arguments: Result<serde_json::Value, ArgumentsError>,
}

/// Everything one streamed response produced.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedTurn {
    pub text: String,
    pub tool_calls: Vec<CompletedToolCall>,
}

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    calls: BTreeMap<u32, ToolCallBuffer>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, delta: &str) {
        if !delta.is_empty() {
            self.text.push_str(delta);
        }
    }

    /// Fold one fragment into the buffer for its index.
    pub fn apply(&mut self, fragment: &ToolCallFragment) {
        let buffer = self.calls.entry(fragment.index).or_default();

        // Ids are not fragmented; keep the first one seen.
        if buffer.id.is_empty() {
            if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
                buffer.id = id.to_string();
            }
        }
        if let Some(name) = fragment.name.as_deref() {
            buffer.name.push_str(name);
        }
        if let Some(arguments) = fragment.arguments.as_deref() {
            buffer.arguments_raw.push_str(arguments);
        }
    }

    /// Fold a whole chunk; returns its non-empty text delta, if any.
    pub fn push_chunk<'a>(&mut self, chunk: &'a StreamChunk) -> Option<&'a str> {
        for fragment in &chunk.tool_calls {
            self.apply(fragment);
        }
        let delta = chunk.content.as_deref().filter(|d| !d.is_empty())?;
        self.push_text(delta);
        Some(delta)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn buffer(&self, index: u32) -> Option<&ToolCallBuffer> {
        self.calls.get(&index)
    }

    /// Parse every buffer, in ascending index order. A parse failure stays on its call.
    pub fn finish(self) -> AccumulatedTurn {
        let tool_calls = self
            .calls
            .into_iter()
            .map(|(index, buffer)| {
                let arguments = parse_arguments(&buffer);
                CompletedToolCall {
                    index,
                    id: buffer.id,
                    name: buffer.name,
                    arguments,
                }
            })
            .collect();

        AccumulatedTurn {
            text: self.text,
            tool_calls,
        }
    }

    /// Drive a provider stream to completion.
    ///
    /// `on_text` sees every non-empty delta as soon as it arrives. The receiver
    /// is dropped on return, which stops the producing task.
    pub async fn drain<F>(
        mut self,
        mut rx: ChunkReceiver,
        cancel: &CancellationToken,
        mut on_text: F,
    ) -> Result<AccumulatedTurn, WorkflowError>
    where
        F: FnMut(&str),
    {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                item = rx.recv() => match item {
                    Some(Ok(chunk)) => {
                        if let Some(delta) = self.push_chunk(&chunk) {
                            on_text(delta);
                        }
                    }
                    Some(Err(e)) => return Err(WorkflowError::Provider(e)),
                    None => break,
                },
            }
        }

        trace!(
            text_len = self.text.len(),
            tool_calls = self.calls.len(),
            "Stream drained"
        );
        Ok(self.finish())
    }
}

fn parse_arguments(buffer: &ToolCallBuffer) -> Result<serde_json::Value, ArgumentsError> {
    if buffer.arguments_raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&buffer.arguments_raw).map_err(|e| ArgumentsError {
        name: buffer.name.clone(),
        raw: buffer.arguments_raw.clone(),
        reason: e.to_string(),
    })
}
