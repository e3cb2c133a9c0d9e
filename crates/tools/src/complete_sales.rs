//! `complete_sales`: records the outcome of a sales conversation.

use crate::args::{require_fields, require_one_of};
use async_trait::async_trait;
use switchboard_core::error::ToolError;
use switchboard_core::tool::{Tool, ToolKind, ToolResult};
use tracing::info;

pub const STATUSES: [&str; 3] = ["purchased", "considering", "needs_followup"];

pub struct CompleteSalesTool;

#[async_trait]
impl Tool for CompleteSalesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CompleteSales
    }

    fn description(&self) -> &str {
        "Call when sales interaction is complete"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "product_interest": {
                    "type": "string",
                    "description": "Product/service the customer is interested in"
                },
                "price_discussed": { "type": "number", "description": "Price point discussed" },
                "status": {
                    "type": "string",
                    "enum": STATUSES,
                    "description": "Current sales status"
                },
                "notes": { "type": "string", "description": "Important details or concerns" }
            },
            "required": ["product_interest", "status"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        require_fields(&arguments, &["product_interest", "status"])?;
        require_one_of(&arguments, "status", &STATUSES)?;
        info!(
            product = %arguments["product_interest"],
            status = %arguments["status"],
            "Sales interaction completed"
        );

        Ok(ToolResult::ok(
            "Sales interaction recorded",
            serde_json::json!({
                "success": true,
                "message": "Sales interaction recorded",
                "data": arguments,
            }),
        ))
    }
}
