//! Sales assistant: answers product questions and records the outcome.

use super::{END, SALES, username_or};
use crate::node::{CallOutcome, HandledCall, Node, NodeContext, Transition};
use switchboard_core::session::{Session, keys};
use switchboard_core::tool::ToolKind;

pub struct SalesNode;

impl Node for SalesNode {
    fn id(&self) -> &str {
        SALES
    }

    fn tools(&self) -> &[ToolKind] {
        &[ToolKind::GetProductInfo, ToolKind::CompleteSales]
    }

    fn successors(&self) -> &[&str] {
        &[END]
    }

    fn system_prompt(&self, session: &Session) -> String {
        format!(
            "You are a Sales assistant helping {}.

Your tasks:
1. Understand their product/service interests
2. Present relevant options and pricing
3. Address questions and concerns
4. Guide them through the purchase process

Use 'get_product_info' to look up plans (basic-plan, pro-plan, enterprise-plan).
When the customer is ready to proceed or has all information, call 'complete_sales' to finish.
Be helpful, informative, and customer-focused.",
            username_or(session, "the customer")
        )
    }

    fn on_tool_call(&self, call: HandledCall<'_>, ctx: &mut NodeContext<'_>) -> CallOutcome {
        match call.kind {
            ToolKind::GetProductInfo => {
                let info = call.result.data.clone().unwrap_or_default();
                ctx.session
                    .set_variable(keys::PRODUCT_INFO, info)
                    .map_err(|e| e.to_string())?;
                Ok(None)
            }
            ToolKind::CompleteSales => {
                ctx.session
                    .set_variable(keys::SALES_DATA, call.arguments.clone())
                    .map_err(|e| e.to_string())?;
                Ok(Some(Transition::goto(END)))
            }
            _ => Ok(None),
        }
    }

    fn failure_message(&self) -> &str {
        "Sales interaction failed"
    }

    /// A failed turn ends the conversation.
    fn on_error(&self) -> Transition {
        Transition::goto(END)
    }
}
