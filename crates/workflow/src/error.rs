//! Workflow error types.

use switchboard_core::error::{ProviderError, SessionError, ToolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The model call failed to open or broke mid-stream.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The turn was cancelled (connection closed).
    #[error("Turn cancelled")]
    Cancelled,

    /// Invalid workflow definition, caught by `WorkflowEngine::build`.
    #[error("Workflow configuration error: {0}")]
    Config(String),

    /// A session points at a node the engine does not know.
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// The session already reached the terminal node.
    #[error("Workflow already complete")]
    AlreadyComplete,

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
