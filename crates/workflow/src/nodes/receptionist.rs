//! Receptionist: collects the user's details and picks the next node.

use super::{INTERVIEW, RECEPTIONIST, SALES};
use crate::node::{CallOutcome, HandledCall, Node, NodeContext, Transition};
use switchboard_core::session::{Session, keys};
use switchboard_core::tool::ToolKind;
use tracing::{info, warn};

const PROMPT: &str = "You are a Receptionist assistant.
Your task is to collect the following user details: username, age, email, phone number, role, and location.
When all required details are collected, call the function 'save_user_data' with those values.
After saving, you MUST call 'complete_task' to determine the next step.
Do NOT summarize or explain. Only ask for missing details until all are collected.";

pub struct ReceptionistNode;

impl Node for ReceptionistNode {
    fn id(&self) -> &str {
        RECEPTIONIST
    }

    fn tools(&self) -> &[ToolKind] {
        &[ToolKind::SaveUserData, ToolKind::CompleteTask]
    }

    fn successors(&self) -> &[&str] {
        &[INTERVIEW, SALES]
    }

    fn system_prompt(&self, _session: &Session) -> String {
        PROMPT.to_string()
    }

    fn on_tool_call(&self, call: HandledCall<'_>, ctx: &mut NodeContext<'_>) -> CallOutcome {
        match call.kind {
            ToolKind::SaveUserData => {
                ctx.session
                    .set_variable(keys::USER_DATA, call.arguments.clone())
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
            ToolKind::CompleteTask => {
                if ctx.session.get_variable(keys::USER_DATA).is_none() {
                    warn!(session_id = %ctx.session.id(), "complete_task before save_user_data, staying");
                    return Err("Cannot route before user details are collected".into());
                }

                let next = call.arguments["next_intent"]
                    .as_str()
                    .ok_or("next_intent must be a string")?
                    .to_string();
                let reason = call.arguments["reason"].clone();
                info!(session_id = %ctx.session.id(), next = %next, reason = %reason, "Routing decided");
                ctx.session
                    .set_variable(keys::ROUTING_REASON, reason)
                    .map_err(|e| e.to_string())?;
                Ok(Some(Transition::Goto(next)))
            }
            _ => Ok(None),
        }
    }

    fn failure_message(&self) -> &str {
        "Receptionist node failed"
    }
}
