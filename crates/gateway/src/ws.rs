//! WebSocket conversation transport.
//!
//! Protocol:
//! - Client → Server: `{"type": "authenticate", "user_id": "..."}`, then
//!   `{"type": "message-user", "content": "..."}` per utterance
//! - Server → Client: [`WorkflowEvent`] frames, `{"event": ..., "data": ...}`
//!
//! Each connection has one writer task forwarding its event stream to the
//! socket and one worker draining its turn queue, so messages are answered
//! in arrival order. Closing the socket cancels the in-flight turn and
//! releases the session; it leaves the store with its last connection.

use crate::SharedState;
use axum::{
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use switchboard_core::session::{CurrentNode, keys};
use switchboard_core::store::SessionHandle;
use switchboard_workflow::{Emitter, WorkflowEngine, WorkflowError, WorkflowEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inbound control event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Authenticate { user_id: String },
    MessageUser { content: String },
}

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    info!("WebSocket connection established");
    let (mut sink, mut stream) = socket.split();
    let (emitter, mut events) = Emitter::channel();

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(event = event.event_name(), error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut connection = Connection::open(state, emitter);
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => connection.handle_frame(text.as_str()).await,
            Ok(WsMessage::Close(_)) | Err(_) => break,
            Ok(_) => continue, // binary, ping, pong
        }
    }

    connection.close().await;
    writer.abort();
    info!("WebSocket connection closed");
}

/// One turn waiting in a connection's queue.
struct QueuedTurn {
    session: SessionHandle,
    text: String,
}

/// Per-connection protocol state, independent of the socket.
pub struct Connection {
    state: SharedState,
    emitter: Emitter,
    cancel: CancellationToken,
    turns: mpsc::UnboundedSender<QueuedTurn>,
    session: Option<(String, SessionHandle)>,
}

impl Connection {
    /// Start the connection's turn worker. Events go to `emitter`.
    pub fn open(state: SharedState, emitter: Emitter) -> Self {
        let cancel = CancellationToken::new();
        let (turns, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_turns(
            state.engine.clone(),
            queue,
            emitter.clone(),
            cancel.clone(),
        ));

        Self {
            state,
            emitter,
            cancel,
            turns,
            session: None,
        }
    }

    /// The authenticated user id, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|(id, _)| id.as_str())
    }

    /// The session this connection holds, if authenticated.
    pub fn session_handle(&self) -> Option<&SessionHandle> {
        self.session.as_ref().map(|(_, handle)| handle)
    }

    /// Parse and act on one text frame.
    pub async fn handle_frame(&mut self, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                debug!(error = %e, "Unparseable client frame");
                self.emitter.error(format!("Invalid message: {e}"));
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Authenticate { user_id } => self.authenticate(user_id.trim()).await,
            ClientEvent::MessageUser { content } => self.enqueue(content),
        }
    }

    async fn authenticate(&mut self, user_id: &str) {
        if user_id.is_empty() {
            self.emitter.error("user_id is required");
            return;
        }

        let (handle, created) = match self.session.take() {
            // Re-authenticating as the same user keeps this connection's hold.
            Some((previous, handle)) if previous == user_id => (handle, false),
            previous => {
                if let Some((previous, _)) = previous {
                    self.state.store.release(&previous).await;
                }
                self.state.store.acquire(user_id).await
            }
        };
        let current_node = {
            let mut session = handle.lock().await;
            let now = Value::from(chrono::Utc::now().to_rfc3339());
            if let Err(e) = session.set_variable(keys::LAST_CONNECTED, now) {
                warn!(session_id = %user_id, error = %e, "Failed to record lastConnected");
            }
            match session.current_node() {
                CurrentNode::Unset => Some(self.state.engine.entry().to_string()),
                CurrentNode::Node(id) => Some(id),
                CurrentNode::Finished => None,
            }
        };

        info!(session_id = %user_id, created, "Client authenticated");
        self.emitter.emit(WorkflowEvent::Authenticated {
            session_id: user_id.to_string(),
            current_node,
            created,
        });
        self.session = Some((user_id.to_string(), handle));
    }

    fn enqueue(&self, content: String) {
        let Some((_, session)) = &self.session else {
            self.emitter
                .error("Not authenticated. Send an authenticate event first");
            return;
        };

        let turn = QueuedTurn {
            session: session.clone(),
            text: content,
        };
        if self.turns.send(turn).is_err() {
            self.emitter.error("Connection is closing");
        }
    }

    /// Cancel the in-flight turn and release this connection's session.
    /// The session is dropped once no other connection holds it.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Some((user_id, _)) = &self.session {
            if self.state.store.release(user_id).await {
                debug!(session_id = %user_id, "Session removed on disconnect");
            }
        }
    }
}

/// Drain a connection's turn queue, one turn at a time.
async fn run_turns(
    engine: Arc<WorkflowEngine>,
    mut queue: mpsc::UnboundedReceiver<QueuedTurn>,
    emitter: Emitter,
    cancel: CancellationToken,
) {
    loop {
        let turn = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = queue.recv() => match next {
                Some(turn) => turn,
                None => break,
            },
        };

        match engine
            .handle_user_message(&turn.session, &turn.text, &emitter, &cancel)
            .await
        {
            Ok(report) => debug!(
                node = %report.node,
                transition = ?report.transition,
                "Turn finished"
            ),
            // Already reported to the client by the engine.
            Err(WorkflowError::AlreadyComplete) => {}
            Err(e) => {
                warn!(error = %e, "Turn failed");
                emitter.error(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_state;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn next_event(rx: &mut UnboundedReceiver<WorkflowEvent>) -> WorkflowEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn parse_client_events() {
        let auth: ClientEvent =
            serde_json::from_str(r#"{"type":"authenticate","user_id":"u1"}"#).unwrap();
        assert_eq!(
            auth,
            ClientEvent::Authenticate {
                user_id: "u1".into()
            }
        );

        let msg: ClientEvent =
            serde_json::from_str(r#"{"type":"message-user","content":"Hi"}"#).unwrap();
        assert_eq!(
            msg,
            ClientEvent::MessageUser {
                content: "Hi".into()
            }
        );
    }

    #[test]
    fn reject_unknown_client_event() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"content":"no type"}"#).is_err());
    }

    #[tokio::test]
    async fn message_before_authenticate_is_rejected() {
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(test_state(), emitter);

        conn.handle_frame(r#"{"type":"message-user","content":"Hi"}"#)
            .await;

        match next_event(&mut rx).await {
            WorkflowEvent::Error { message } => assert!(message.contains("Not authenticated")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_frame_is_reported() {
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(test_state(), emitter);

        conn.handle_frame("not json").await;

        match next_event(&mut rx).await {
            WorkflowEvent::Error { message } => assert!(message.starts_with("Invalid message")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn authenticate_creates_session_at_entry() {
        let state = test_state();
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;

        assert_eq!(
            next_event(&mut rx).await,
            WorkflowEvent::Authenticated {
                session_id: "u1".into(),
                current_node: Some("receptionist".into()),
                created: true,
            }
        );
        assert_eq!(conn.user_id(), Some("u1"));

        let handle = state.store.get("u1").await.unwrap();
        let session = handle.lock().await;
        assert!(session.get_variable(keys::LAST_CONNECTED).is_some());
    }

    #[tokio::test]
    async fn blank_user_id_is_rejected() {
        let state = test_state();
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"  "}"#)
            .await;

        assert!(matches!(next_event(&mut rx).await, WorkflowEvent::Error { .. }));
        assert_eq!(state.store.len().await, 0);
    }

    #[tokio::test]
    async fn message_runs_a_turn() {
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(test_state(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        conn.handle_frame(r#"{"type":"message-user","content":"Hi"}"#)
            .await;

        assert!(matches!(
            next_event(&mut rx).await,
            WorkflowEvent::Authenticated { .. }
        ));
        assert_eq!(
            next_event(&mut rx).await,
            WorkflowEvent::AiMessageStream("Hello".into())
        );
        assert_eq!(
            next_event(&mut rx).await,
            WorkflowEvent::AiMessageStream(", what is your name?".into())
        );
        match next_event(&mut rx).await {
            WorkflowEvent::AiMessage { role, content, .. } => {
                assert_eq!(role, "assistant");
                assert_eq!(content, "Hello, what is your name?");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn queued_turns_run_in_order() {
        let state = test_state();
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        conn.handle_frame(r#"{"type":"message-user","content":"first"}"#)
            .await;
        conn.handle_frame(r#"{"type":"message-user","content":"second"}"#)
            .await;

        let mut finals = 0;
        while finals < 2 {
            if let WorkflowEvent::AiMessage { .. } = next_event(&mut rx).await {
                finals += 1;
            }
        }

        let handle = state.store.get("u1").await.unwrap();
        let session = handle.lock().await;
        let users: Vec<String> = session
            .messages()
            .into_iter()
            .filter(|m| m.role == switchboard_core::message::Role::User)
            .map(|m| m.content)
            .collect();
        assert_eq!(users, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn reauthenticate_reports_existing_session() {
        let (emitter, mut rx) = Emitter::channel();
        let mut conn = Connection::open(test_state(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;

        next_event(&mut rx).await;
        match next_event(&mut rx).await {
            WorkflowEvent::Authenticated { created, .. } => assert!(!created),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn switching_users_releases_previous_session() {
        let state = test_state();
        let (emitter, _rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        conn.handle_frame(r#"{"type":"authenticate","user_id":"u2"}"#)
            .await;

        assert_eq!(state.store.list().await, vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn session_outlives_one_of_two_connections() {
        let state = test_state();
        let (a_emitter, _a_rx) = Emitter::channel();
        let (b_emitter, _b_rx) = Emitter::channel();
        let (c_emitter, mut c_rx) = Emitter::channel();
        let mut a = Connection::open(state.clone(), a_emitter);
        let mut b = Connection::open(state.clone(), b_emitter);

        a.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        b.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        assert_eq!(state.store.holders("u1").await, 2);

        a.close().await;
        assert_eq!(state.store.list().await, vec!["u1".to_string()]);

        let mut c = Connection::open(state.clone(), c_emitter);
        c.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        match next_event(&mut c_rx).await {
            WorkflowEvent::Authenticated { created, .. } => assert!(!created),
            other => panic!("unexpected event: {other:?}"),
        }

        let shared = state.store.get("u1").await.unwrap();
        assert!(Arc::ptr_eq(&shared, b.session_handle().unwrap()));
        assert!(Arc::ptr_eq(&shared, c.session_handle().unwrap()));

        b.close().await;
        assert_eq!(state.store.len().await, 1);
        c.close().await;
        assert_eq!(state.store.len().await, 0);
    }

    #[tokio::test]
    async fn reauthenticate_keeps_a_single_hold() {
        let state = test_state();
        let (emitter, _rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        assert_eq!(state.store.holders("u1").await, 1);

        conn.close().await;
        assert_eq!(state.store.len().await, 0);
    }

    #[tokio::test]
    async fn switching_users_keeps_session_held_elsewhere() {
        let state = test_state();
        let (a_emitter, _a_rx) = Emitter::channel();
        let (b_emitter, _b_rx) = Emitter::channel();
        let mut a = Connection::open(state.clone(), a_emitter);
        let mut b = Connection::open(state.clone(), b_emitter);

        a.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        b.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        a.handle_frame(r#"{"type":"authenticate","user_id":"u2"}"#)
            .await;

        assert_eq!(
            state.store.list().await,
            vec!["u1".to_string(), "u2".to_string()]
        );
        assert_eq!(state.store.holders("u1").await, 1);
    }

    #[tokio::test]
    async fn close_removes_session() {
        let state = test_state();
        let (emitter, _rx) = Emitter::channel();
        let mut conn = Connection::open(state.clone(), emitter);

        conn.handle_frame(r#"{"type":"authenticate","user_id":"u1"}"#)
            .await;
        assert_eq!(state.store.len().await, 1);

        conn.close().await;
        assert_eq!(state.store.len().await, 0);
    }
}
