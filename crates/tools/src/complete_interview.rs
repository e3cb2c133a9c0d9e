//! `complete_interview`: closes the interview-scheduling conversation.

use crate::args::require_fields;
use async_trait::async_trait;
use switchboard_core::error::ToolError;
use switchboard_core::tool::{Tool, ToolKind, ToolResult};
use tracing::info;

pub struct CompleteInterviewTool;

#[async_trait]
impl Tool for CompleteInterviewTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CompleteInterview
    }

    fn description(&self) -> &str {
        "Call when interview scheduling is complete"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "position": { "type": "string", "description": "Position applied for" },
                "experience_years": { "type": "integer", "description": "Years of experience" },
                "interview_date": { "type": "string", "description": "Scheduled interview date/time" },
                "notes": { "type": "string", "description": "Additional notes" }
            },
            "required": ["position", "interview_date"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        require_fields(&arguments, &["position", "interview_date"])?;
        info!(
            position = %arguments["position"],
            date = %arguments["interview_date"],
            "Interview scheduled"
        );

        Ok(ToolResult::ok(
            "Interview scheduled successfully",
            serde_json::json!({
                "success": true,
                "message": "Interview scheduled successfully",
                "data": arguments,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn optional_fields_may_be_omitted() {
        let result = CompleteInterviewTool
            .execute(json!({"position": "SRE", "interview_date": "2025-03-01T10:00"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["data"]["position"], "SRE");
    }

    #[tokio::test]
    async fn missing_date_is_rejected() {
        let err = CompleteInterviewTool
            .execute(json!({"position": "SRE", "notes": "remote"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(m) if m.contains("interview_date")));
    }
}
