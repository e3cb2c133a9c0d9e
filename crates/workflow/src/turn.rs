//! The standard model-driven node turn.
//!
//! 1. Inject the node's system prompt once per node entry.
//! 2. Append the user message.
//! 3. Stream the model response with the full history and the node's tools.
//! 4. Append the assistant message.
//! 5. Hand each completed tool call to its handler, then to the node.
//!
//! A failed model call ends the turn with [`Node::on_error`], a cancelled one
//! stays put. A failed or rejected tool call is reported and skipped.

use crate::accumulator::{AccumulatedTurn, CompletedToolCall, StreamAccumulator};
use crate::error::WorkflowError;
use crate::event::WorkflowEvent;
use crate::node::{HandledCall, Node, NodeContext, Transition};
use switchboard_core::message::Message;
use switchboard_core::provider::ProviderRequest;
use switchboard_core::tool::ToolKind;
use tracing::{debug, info, warn};

pub async fn run_model_turn<N>(node: &N, ctx: &mut NodeContext<'_>, user_text: &str) -> Transition
where
    N: Node + ?Sized,
{
    if !ctx.session.prompt_initiated() {
        let prompt = node.system_prompt(ctx.session);
        ctx.session.append_message(Message::system(prompt));
        ctx.session.set_prompt_initiated(true);
        debug!(session_id = %ctx.session.id(), node = %node.id(), "System prompt injected");
    }

    ctx.session.append_message(Message::user(user_text));

    let turn = match stream_response(node, ctx).await {
        Ok(turn) => turn,
        Err(WorkflowError::Cancelled) => {
            debug!(session_id = %ctx.session.id(), node = %node.id(), "Turn cancelled");
            return Transition::Stay;
        }
        Err(e) => {
            warn!(session_id = %ctx.session.id(), node = %node.id(), error = %e, "Model call failed");
            ctx.emitter
                .error(format!("{}: {e}", node.failure_message()));
            return node.on_error();
        }
    };

    let reply = Message::assistant(turn.text);
    ctx.emitter.emit(WorkflowEvent::ai_message(&reply));
    ctx.session.append_message(reply);

    let mut decided = None;
    for call in &turn.tool_calls {
        if let Some(transition) = handle_tool_call(node, ctx, call).await {
            decided = Some(transition);
        }
    }

    ctx.session.bump_message_count(2);
    decided.unwrap_or(Transition::Stay)
}

async fn stream_response<N>(node: &N, ctx: &mut NodeContext<'_>) -> Result<AccumulatedTurn, WorkflowError>
where
    N: Node + ?Sized,
{
    let request = ProviderRequest {
        model: ctx.settings.model.clone(),
        messages: ctx.session.messages(),
        temperature: ctx.settings.temperature,
        max_tokens: ctx.settings.max_tokens,
        tools: ctx.tools.definitions_for(node.tools())?,
        stream: true,
    };

    let rx = ctx.provider.stream(request).await?;
    let emitter = ctx.emitter;
    StreamAccumulator::new()
        .drain(rx, ctx.cancel, |delta| {
            emitter.emit(WorkflowEvent::AiMessageStream(delta.to_string()))
        })
        .await
}

/// Validate, execute and interpret one completed call. Failures are reported, never raised.
async fn handle_tool_call<N>(
    node: &N,
    ctx: &mut NodeContext<'_>,
    call: &CompletedToolCall,
) -> Option<Transition>
where
    N: Node + ?Sized,
{
    let arguments = match &call.arguments {
        Ok(arguments) => arguments,
        Err(e) => {
            warn!(session_id = %ctx.session.id(), tool = %call.name, error = %e.reason, "Unparseable tool arguments");
            ctx.emitter.error(e.to_string());
            return None;
        }
    };

    let Some(kind) = ToolKind::from_name(&call.name).filter(|k| node.tools().contains(k)) else {
        warn!(session_id = %ctx.session.id(), node = %node.id(), tool = %call.name, "Tool not offered by node");
        ctx.emitter
            .error(format!("Tool '{}' is not available in node '{}'", call.name, node.id()));
        return None;
    };

    let result = match ctx.tools.invoke(kind, arguments.clone()).await {
        Ok(result) => result,
        Err(e) => {
            warn!(session_id = %ctx.session.id(), tool = %kind, error = %e, "Tool handler failed");
            ctx.emitter.error(format!("{kind}: {e}"));
            return None;
        }
    };

    let handled = HandledCall {
        kind,
        arguments,
        result: &result,
    };
    match node.on_tool_call(handled, ctx) {
        Ok(transition) => {
            info!(session_id = %ctx.session.id(), node = %node.id(), tool = %kind, "Tool call handled");
            ctx.emitter
                .emit(WorkflowEvent::for_tool(kind, arguments, &result));
            transition
        }
        Err(message) => {
            warn!(session_id = %ctx.session.id(), node = %node.id(), tool = %kind, reason = %message, "Tool call rejected by node");
            ctx.emitter.error(message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Emitter;
    use crate::node::{CallOutcome, ModelSettings};
    use crate::test_helpers::{ScriptedProvider, collect_events, text_chunks, tool_call_chunks};
    use serde_json::json;
    use switchboard_core::error::ProviderError;
    use switchboard_core::message::Role;
    use switchboard_core::session::{Session, keys};
    use switchboard_core::tool::ToolRegistry;
    use tokio_util::sync::CancellationToken;

    /// A node offering only `save_user_data` that never transitions.
    struct Recorder;

    #[async_trait::async_trait]
    impl Node for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }
        fn tools(&self) -> &[ToolKind] {
            &[ToolKind::SaveUserData]
        }
        fn system_prompt(&self, _session: &Session) -> String {
            "You are a recorder.".into()
        }
        fn failure_message(&self) -> &str {
            "Recorder failed"
        }
        fn on_tool_call(&self, call: HandledCall<'_>, ctx: &mut NodeContext<'_>) -> CallOutcome {
            ctx.session
                .set_variable(keys::USER_DATA, call.arguments.clone())
                .map_err(|e| e.to_string())?;
            Ok(None)
        }
    }

    async fn run(
        provider: &ScriptedProvider,
        session: &mut Session,
        text: &str,
    ) -> (Transition, Vec<WorkflowEvent>) {
        let tools = switchboard_tools::default_registry();
        let (emitter, rx) = Emitter::channel();
        let settings = ModelSettings::default();
        let cancel = CancellationToken::new();
        let mut ctx = NodeContext {
            session,
            emitter: &emitter,
            provider,
            tools: &tools,
            settings: &settings,
            cancel: &cancel,
        };
        let transition = Recorder.run(&mut ctx, text).await;
        drop(emitter);
        (transition, collect_events(rx).await)
    }

    #[tokio::test]
    async fn prompt_injected_once_per_entry() {
        let provider = ScriptedProvider::new(vec![text_chunks(&["Hi"]), text_chunks(&["Again"])]);
        let mut session = Session::for_user("u1", "recorder");

        run(&provider, &mut session, "hello").await;
        run(&provider, &mut session, "hello again").await;

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.get_variable(keys::MESSAGE_COUNT), Some(&json!(4)));
    }

    #[tokio::test]
    async fn request_carries_history_and_node_tools() {
        let provider = ScriptedProvider::new(vec![text_chunks(&["Hi"])]);
        let mut session = Session::for_user("u1", "recorder");
        run(&provider, &mut session, "hello").await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].stream);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[0].content, "You are a recorder.");
        let tool_names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tool_names, vec!["save_user_data"]);
    }

    #[tokio::test]
    async fn streams_deltas_then_final_message() {
        let provider = ScriptedProvider::new(vec![text_chunks(&["Hel", "lo"])]);
        let mut session = Session::for_user("u1", "recorder");
        let (transition, events) = run(&provider, &mut session, "hi").await;

        assert_eq!(transition, Transition::Stay);
        assert_eq!(events[0], WorkflowEvent::AiMessageStream("Hel".into()));
        assert_eq!(events[1], WorkflowEvent::AiMessageStream("lo".into()));
        assert!(matches!(&events[2], WorkflowEvent::AiMessage { content, .. } if content == "Hello"));
        assert_eq!(session.messages().last().unwrap().content, "Hello");
    }

    #[tokio::test]
    async fn invalid_call_does_not_block_valid_one() {
        let args = json!({
            "username": "Ann", "age": 30, "email": "a@x.io",
            "phone_number": "1", "role": "dev", "location": "NYC"
        })
        .to_string();
        let mut chunks = tool_call_chunks(0, "save_user_data", "{\"username\": ", 1);
        chunks.extend(tool_call_chunks(1, "save_user_data", &args, 4));
        let provider = ScriptedProvider::new(vec![chunks]);
        let mut session = Session::for_user("u1", "recorder");

        let (_, events) = run(&provider, &mut session, "hi").await;

        let names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
        assert_eq!(names, vec!["ai-message", "error", "user-data"]);
        assert_eq!(
            session.get_variable(keys::USER_DATA).unwrap()["username"],
            "Ann"
        );
    }

    #[tokio::test]
    async fn handler_validation_failure_is_reported() {
        let provider = ScriptedProvider::new(vec![tool_call_chunks(
            0,
            "save_user_data",
            r#"{"username":"Ann"}"#,
            2,
        )]);
        let mut session = Session::for_user("u1", "recorder");
        let (_, events) = run(&provider, &mut session, "hi").await;

        assert!(events.iter().any(|e| matches!(
            e,
            WorkflowEvent::Error { message } if message.contains("Missing required field: age")
        )));
        assert!(session.get_variable(keys::USER_DATA).is_none());
        assert_eq!(session.get_variable(keys::MESSAGE_COUNT), Some(&json!(2)));
    }

    #[tokio::test]
    async fn tool_not_offered_by_node_is_rejected() {
        let provider = ScriptedProvider::new(vec![tool_call_chunks(
            0,
            "complete_task",
            r#"{"next_intent":"sales","reason":"x"}"#,
            1,
        )]);
        let mut session = Session::for_user("u1", "recorder");
        let (transition, events) = run(&provider, &mut session, "hi").await;

        assert_eq!(transition, Transition::Stay);
        assert!(events.iter().any(|e| matches!(
            e,
            WorkflowEvent::Error { message } if message.contains("not available")
        )));
    }

    #[tokio::test]
    async fn provider_failure_ends_turn_with_error() {
        let provider = ScriptedProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
        let mut session = Session::for_user("u1", "recorder");
        let (transition, events) = run(&provider, &mut session, "hi").await;

        assert_eq!(transition, Transition::Stay);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], WorkflowEvent::Error { message } if message.starts_with("Recorder failed")));
        assert!(session.get_variable(keys::MESSAGE_COUNT).is_none());
        assert_eq!(session.messages().last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn unregistered_handler_is_reported() {
        let provider = ScriptedProvider::new(vec![tool_call_chunks(
            0,
            "save_user_data",
            "{}",
            1,
        )]);
        let tools = ToolRegistry::new();
        let (emitter, rx) = Emitter::channel();
        let settings = ModelSettings::default();
        let cancel = CancellationToken::new();
        let mut session = Session::for_user("u1", "recorder");
        let mut ctx = NodeContext {
            session: &mut session,
            emitter: &emitter,
            provider: &provider,
            tools: &tools,
            settings: &settings,
            cancel: &cancel,
        };

        // Definitions fail before the model is called.
        assert_eq!(Recorder.run(&mut ctx, "hi").await, Transition::Stay);
        drop(emitter);
        let events = collect_events(rx).await;
        assert_eq!(events.len(), 1);
        assert!(provider.requests().is_empty());
    }
}
