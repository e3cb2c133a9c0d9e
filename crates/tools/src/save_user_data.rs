//! `save_user_data`: the receptionist's intake form.

use crate::args::require_fields;
use async_trait::async_trait;
use switchboard_core::error::ToolError;
use switchboard_core::tool::{Tool, ToolKind, ToolResult};
use tracing::info;

const REQUIRED: [&str; 6] = ["username", "age", "email", "phone_number", "role", "location"];

pub struct SaveUserDataTool;

#[async_trait]
impl Tool for SaveUserDataTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SaveUserData
    }

    fn description(&self) -> &str {
        "Save user's username, age, email, phone_number, role, location"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "username": { "type": "string" },
                "age": { "type": "integer" },
                "email": { "type": "string" },
                "phone_number": { "type": "string" },
                "role": { "type": "string" },
                "location": { "type": "string" }
            },
            "required": REQUIRED
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        require_fields(&arguments, &REQUIRED)?;
        info!(username = %arguments["username"], "Saving user data");

        Ok(ToolResult::ok(
            "User data saved successfully",
            serde_json::json!({
                "success": true,
                "message": "User data saved successfully",
                "data": arguments,
            }),
        ))
    }
}
