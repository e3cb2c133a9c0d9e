//! `complete_task`: the receptionist declares where the user should go next.

use crate::args::{require_fields, require_one_of};
use async_trait::async_trait;
use switchboard_core::error::ToolError;
use switchboard_core::tool::{Tool, ToolKind, ToolResult};

/// Intents the receptionist may route to.
pub const INTENTS: [&str; 2] = ["interview", "sales"];

pub struct CompleteTaskTool;

#[async_trait]
impl Tool for CompleteTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CompleteTask
    }

    fn description(&self) -> &str {
        "Call this after save_user_data to determine next step based on user's intent"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "next_intent": {
                    "type": "string",
                    "enum": INTENTS,
                    "description": "Detected intent: 'interview' for job seekers, 'sales' for purchase inquiries"
                },
                "reason": {
                    "type": "string",
                    "description": "Brief reason for routing decision"
                }
            },
            "required": ["next_intent", "reason"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        require_fields(&arguments, &["next_intent", "reason"])?;
        require_one_of(&arguments, "next_intent", &INTENTS)?;

        let next_intent = &arguments["next_intent"];
        Ok(ToolResult::ok(
            format!("Routing to {}", next_intent.as_str().unwrap_or_default()),
            serde_json::json!({
                "success": true,
                "next_intent": next_intent,
                "reason": arguments["reason"],
            }),
        ))
    }
}
