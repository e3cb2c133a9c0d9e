//! End: reports everything collected. Makes no model call.

use super::END;
use crate::event::{CompletionSummary, WorkflowEvent};
use crate::node::{Node, NodeContext, Transition};
use async_trait::async_trait;
use switchboard_core::session::{Session, keys};
use tracing::info;

pub struct EndNode;

impl EndNode {
    pub fn summary(session: &Session) -> CompletionSummary {
        CompletionSummary {
            user_data: session.get_variable(keys::USER_DATA).cloned(),
            interview_data: session.get_variable(keys::INTERVIEW_DATA).cloned(),
            sales_data: session.get_variable(keys::SALES_DATA).cloned(),
            routing_reason: session.get_variable(keys::ROUTING_REASON).cloned(),
        }
    }
}

#[async_trait]
impl Node for EndNode {
    fn id(&self) -> &str {
        END
    }

    fn system_prompt(&self, _session: &Session) -> String {
        String::new()
    }

    fn is_terminal(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut NodeContext<'_>, _user_text: &str) -> Transition {
        info!(session_id = %ctx.session.id(), "Workflow completed");
        ctx.emitter
            .emit(WorkflowEvent::WorkflowComplete(Self::summary(ctx.session)));
        Transition::Finish
    }
}
