//! Outbound workflow events.
//!
//! Every event is serialized as `{"event": <name>, "data": <payload>}` so a
//! transport can forward it as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchboard_core::message::Message;
use switchboard_core::tool::{ToolKind, ToolResult};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum WorkflowEvent {
    /// Session established or looked up.
    Authenticated {
        session_id: String,
        current_node: Option<String>,
        created: bool,
    },

    /// Partial text from the model.
    AiMessageStream(String),

    /// The complete assistant message of a turn.
    AiMessage {
        role: String,
        content: String,
        date: String,
    },

    UserData(Value),
    RoutingDecided(Value),
    InterviewScheduled(Value),
    SalesCompleted(Value),
    ProductInfo(Value),

    Error {
        message: String,
    },

    WorkflowComplete(CompletionSummary),
}

/// Everything the workflow collected, sent once at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub user_data: Option<Value>,
    pub interview_data: Option<Value>,
    pub sales_data: Option<Value>,
    pub routing_reason: Option<Value>,
}

impl WorkflowEvent {
    /// Wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AiMessageStream(_) => "ai-message-stream",
            Self::AiMessage { .. } => "ai-message",
            Self::UserData(_) => "user-data",
            Self::RoutingDecided(_) => "routing-decided",
            Self::InterviewScheduled(_) => "interview-scheduled",
            Self::SalesCompleted(_) => "sales-completed",
            Self::ProductInfo(_) => "product-info",
            Self::Error { .. } => "error",
            Self::WorkflowComplete(_) => "workflow-complete",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn ai_message(message: &Message) -> Self {
        Self::AiMessage {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            date: message.timestamp.to_rfc3339(),
        }
    }

    /// The event announcing a successfully handled tool call.
    ///
    /// Most tools echo their arguments; `get_product_info` reports its lookup result.
    pub fn for_tool(kind: ToolKind, arguments: &Value, result: &ToolResult) -> Self {
        match kind {
            ToolKind::SaveUserData => Self::UserData(arguments.clone()),
            ToolKind::CompleteTask => Self::RoutingDecided(arguments.clone()),
            ToolKind::CompleteInterview => Self::InterviewScheduled(arguments.clone()),
            ToolKind::CompleteSales => Self::SalesCompleted(arguments.clone()),
            ToolKind::GetProductInfo => {
                Self::ProductInfo(result.data.clone().unwrap_or(Value::Null))
            }
        }
    }
}

/// Sending half of a session's event stream.
///
/// Emitting never blocks and never fails; once the receiver is gone (the
/// connection closed) events are dropped.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl Emitter {
    pub fn new(tx: mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: WorkflowEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver closed, dropping event");
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(WorkflowEvent::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_event_wire_shape() {
        let event = WorkflowEvent::AiMessageStream("Hel".into());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"event": "ai-message-stream", "data": "Hel"}));
    }

    #[test]
    fn workflow_complete_uses_camel_case_keys() {
        let event = WorkflowEvent::WorkflowComplete(CompletionSummary {
            user_data: Some(json!({"username": "Ann"})),
            routing_reason: Some(json!("job seeker")),
            ..CompletionSummary::default()
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "workflow-complete");
        assert_eq!(json["data"]["userData"]["username"], "Ann");
        assert_eq!(json["data"]["routingReason"], "job seeker");
        assert!(json["data"]["interviewData"].is_null());
    }

    #[test]
    fn event_names_match_serialized_tag() {
        let events = [
            WorkflowEvent::Authenticated {
                session_id: "u1".into(),
                current_node: Some("receptionist".into()),
                created: true,
            },
            WorkflowEvent::AiMessage {
                role: "assistant".into(),
                content: "Hi".into(),
                date: "2025-01-01T00:00:00Z".into(),
            },
            WorkflowEvent::UserData(json!({})),
            WorkflowEvent::RoutingDecided(json!({})),
            WorkflowEvent::InterviewScheduled(json!({})),
            WorkflowEvent::SalesCompleted(json!({})),
            WorkflowEvent::ProductInfo(json!({})),
            WorkflowEvent::error("boom"),
            WorkflowEvent::WorkflowComplete(CompletionSummary::default()),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.event_name());
        }
    }

    #[test]
    fn product_info_carries_result_data() {
        let result = ToolResult {
            success: false,
            output: "Product not found".into(),
            data: Some(json!({"success": false, "message": "Product not found"})),
        };
        let event = WorkflowEvent::for_tool(
            ToolKind::GetProductInfo,
            &json!({"product_name": "x"}),
            &result,
        );
        assert_eq!(
            event,
            WorkflowEvent::ProductInfo(json!({"success": false, "message": "Product not found"}))
        );
    }

    #[test]
    fn emitting_after_receiver_dropped_is_silent() {
        let (emitter, rx) = Emitter::channel();
        drop(rx);
        emitter.error("nobody listening");
    }
}
