//! Interview coordinator: schedules an interview for a job seeker.

use super::{END, INTERVIEW, username_or};
use crate::node::{CallOutcome, HandledCall, Node, NodeContext, Transition};
use switchboard_core::session::{Session, keys};
use switchboard_core::tool::ToolKind;

pub struct InterviewNode;

impl Node for InterviewNode {
    fn id(&self) -> &str {
        INTERVIEW
    }

    fn tools(&self) -> &[ToolKind] {
        &[ToolKind::CompleteInterview]
    }

    fn successors(&self) -> &[&str] {
        &[END]
    }

    fn system_prompt(&self, session: &Session) -> String {
        format!(
            "You are an Interview Coordinator assistant for {}.

Your tasks:
1. Acknowledge the user is here for an interview
2. Ask about their desired position and experience
3. Schedule an interview time
4. Collect any additional relevant information

When you've gathered interview preferences and scheduled a time, call 'complete_interview' to finish.
Be professional, encouraging, and thorough.",
            username_or(session, "the candidate")
        )
    }

    fn on_tool_call(&self, call: HandledCall<'_>, ctx: &mut NodeContext<'_>) -> CallOutcome {
        if call.kind != ToolKind::CompleteInterview {
            return Ok(None);
        }
        ctx.session
            .set_variable(keys::INTERVIEW_DATA, call.arguments.clone())
            .map_err(|e| e.to_string())?;
        Ok(Some(Transition::goto(END)))
    }

    fn failure_message(&self) -> &str {
        "Interview scheduling failed"
    }

    /// A failed turn ends the conversation.
    fn on_error(&self) -> Transition {
        Transition::goto(END)
    }
}
