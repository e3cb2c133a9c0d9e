//! The Node trait: one state of the conversation workflow.
//!
//! A node owns its system prompt, the tools it offers the model, and how a
//! handled tool call moves the workflow. Most nodes only describe themselves
//! and let [`run_model_turn`](crate::turn::run_model_turn) do the turn; a node
//! with no model interaction (the terminal one) overrides [`Node::run`].

use crate::event::Emitter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchboard_config::AppConfig;
use switchboard_core::provider::Provider;
use switchboard_core::session::Session;
use switchboard_core::tool::{ToolKind, ToolRegistry, ToolResult};
use tokio_util::sync::CancellationToken;

/// What the workflow does after a node's turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Transition {
    /// Remain in the current node.
    Stay,
    /// Move to the named node.
    Goto(String),
    /// The workflow is over.
    Finish,
}

impl Transition {
    pub fn goto(node: impl Into<String>) -> Self {
        Self::Goto(node.into())
    }
}

/// Model parameters shared by every node.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl From<&AppConfig> for ModelSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Everything a node can touch during one turn.
pub struct NodeContext<'a> {
    pub session: &'a mut Session,
    pub emitter: &'a Emitter,
    pub provider: &'a dyn Provider,
    pub tools: &'a ToolRegistry,
    pub settings: &'a ModelSettings,
    pub cancel: &'a CancellationToken,
}

/// A tool call that parsed and whose handler succeeded.
#[derive(Debug, Clone, Copy)]
pub struct HandledCall<'a> {
    pub kind: ToolKind,
    pub arguments: &'a Value,
    pub result: &'a ToolResult,
}

/// A node's verdict on a handled call.
pub type CallOutcome = Result<Option<Transition>, String>;

#[async_trait]
pub trait Node: Send + Sync {
    /// Workflow-unique id, also the value stored in `currentNode`.
    fn id(&self) -> &str;

    /// Tools offered to the model while in this node.
    fn tools(&self) -> &[ToolKind] {
        &[]
    }

    /// Every node this one may transition to.
    fn successors(&self) -> &[&str] {
        &[]
    }

    /// Injected once per node entry.
    fn system_prompt(&self, session: &Session) -> String;

    /// Interpret a handled call. `Ok(Some(_))` is a decisive transition; the last one in a
    /// turn wins. `Err` rejects the call with a message for the client, and the call's
    /// event is not emitted.
    fn on_tool_call(&self, _call: HandledCall<'_>, _ctx: &mut NodeContext<'_>) -> CallOutcome {
        Ok(None)
    }

    /// Transition after a failed model call: stay, or fall through to the terminal node.
    fn on_error(&self) -> Transition {
        Transition::Stay
    }

    /// Message reported to the client when the model call fails.
    fn failure_message(&self) -> &str {
        "Node failed"
    }

    fn is_terminal(&self) -> bool {
        false
    }

    /// Run one turn of this node.
    async fn run(&self, ctx: &mut NodeContext<'_>, user_text: &str) -> Transition {
        crate::turn::run_model_turn(self, ctx, user_text).await
    }
}
