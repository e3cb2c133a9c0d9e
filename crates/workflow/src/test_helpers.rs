//! Shared test helpers for workflow tests.

use crate::event::WorkflowEvent;
use std::collections::VecDeque;
use std::sync::Mutex;
use switchboard_core::error::ProviderError;
use switchboard_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, StreamChunk, ToolCallFragment,
};
use tokio::sync::mpsc;

type Script = Result<Vec<Result<StreamChunk, ProviderError>>, ProviderError>;

/// A mock provider that replays scripted streams, one per call.
///
/// Every request is recorded. Calls past the end of the script fail with an
/// `ApiError`.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Vec<StreamChunk>>) -> Self {
        Self::from_scripts(
            turns
                .into_iter()
                .map(|chunks| Ok(chunks.into_iter().map(Ok).collect()))
                .collect(),
        )
    }

    pub fn from_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose first call fails to open.
    pub fn failing(error: ProviderError) -> Self {
        Self::from_scripts(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "script exhausted".into(),
                })
            })?;

        let (tx, rx) = mpsc::channel(script.len().max(1));
        for item in script {
            let _ = tx.send(item).await;
        }
        Ok(rx)
    }
}

/// A provider that opens a stream and never finishes it.
pub struct HangingProvider {
    senders: Mutex<Vec<mpsc::Sender<Result<StreamChunk, ProviderError>>>>,
}

impl HangingProvider {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Whether every opened stream has lost its receiver.
    pub fn all_closed(&self) -> bool {
        self.senders.lock().unwrap().iter().all(|tx| tx.is_closed())
    }
}

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.send(Ok(StreamChunk::text("thinking"))).await;
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }
}

pub fn text_chunks(deltas: &[&str]) -> Vec<StreamChunk> {
    deltas.iter().map(|d| StreamChunk::text(*d)).collect()
}

/// Fragments for one call: an opening fragment, then `arguments` split into `pieces`.
pub fn tool_call_chunks(index: u32, name: &str, arguments: &str, pieces: usize) -> Vec<StreamChunk> {
    let mut chunks = vec![StreamChunk::fragments(vec![ToolCallFragment::start(
        index,
        format!("call_{index}"),
        name,
    )])];

    let chars: Vec<char> = arguments.chars().collect();
    let size = chars.len().div_ceil(pieces.max(1)).max(1);
    for piece in chars.chunks(size) {
        chunks.push(StreamChunk::fragments(vec![ToolCallFragment::arguments(
            index,
            piece.iter().collect::<String>(),
        )]));
    }
    chunks
}

/// Drain every event already sent. The emitter must have been dropped.
pub async fn collect_events(
    mut rx: mpsc::UnboundedReceiver<WorkflowEvent>,
) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
