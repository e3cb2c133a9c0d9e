//! Tool trait: the side-effecting handlers behind function calls.
//!
//! Tools are keyed by [`ToolKind`], a closed set of the functions the workflow
//! knows how to interpret. Nodes advertise a subset of kinds to the model; the
//! registry resolves a kind to its handler once the arguments are fully parsed.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every tool the workflow can offer to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SaveUserData,
    CompleteTask,
    CompleteInterview,
    CompleteSales,
    GetProductInfo,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::SaveUserData,
        ToolKind::CompleteTask,
        ToolKind::CompleteInterview,
        ToolKind::CompleteSales,
        ToolKind::GetProductInfo,
    ];

    /// The function name the model sees.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SaveUserData => "save_user_data",
            Self::CompleteTask => "complete_task",
            Self::CompleteInterview => "complete_interview",
            Self::CompleteSales => "complete_sales",
            Self::GetProductInfo => "get_product_info",
        }
    }

    /// Resolve a function name emitted by the model.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Human-readable outcome
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: Some(data),
        }
    }
}

/// The core Tool trait.
///
/// Handlers validate their own required fields and fail with
/// [`ToolError::InvalidArguments`] rather than proceeding silently.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which function this handler implements.
    fn kind(&self) -> ToolKind;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The workflow uses this to:
/// 1. Build the node-scoped tool schema sent to the LLM
/// 2. Dispatch completed tool calls to their handlers
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing handler for the same kind.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Get a tool by kind.
    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    /// Definitions for the given kinds, in the order requested.
    pub fn definitions_for(&self, kinds: &[ToolKind]) -> Result<Vec<ToolDefinition>, ToolError> {
        kinds
            .iter()
            .map(|kind| {
                self.get(*kind)
                    .map(|t| t.to_definition())
                    .ok_or_else(|| ToolError::NotFound(kind.name().to_string()))
            })
            .collect()
    }

    /// Fail on the first kind that has no registered handler.
    pub fn ensure_registered(&self, kinds: &[ToolKind]) -> Result<(), ToolError> {
        match kinds.iter().find(|k| !self.tools.contains_key(k)) {
            Some(missing) => Err(ToolError::NotFound(missing.name().to_string())),
            None => Ok(()),
        }
    }

    /// Invoke the handler for `kind`.
    pub async fn invoke(
        &self,
        kind: ToolKind,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&kind)
            .ok_or_else(|| ToolError::NotFound(kind.name().to_string()))?;
        tool.execute(arguments).await
    }

    /// Invoke a handler by the function name the model used.
    pub async fn invoke_named(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        self.invoke(kind, arguments).await
    }

    /// All registered kinds, sorted.
    pub fn kinds(&self) -> Vec<ToolKind> {
        let mut kinds: Vec<ToolKind> = self.tools.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
