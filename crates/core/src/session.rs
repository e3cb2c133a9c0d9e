//! Session: one user's conversation state.
//!
//! A session holds the ordered message history (the literal prompt sent to the
//! model) and a key/value bag of workflow variables. Mutation is synchronous and
//! unguarded; callers serialize turns through a [`SessionHandle`](crate::store::SessionHandle).

use crate::error::SessionError;
use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Well-known variable keys.
pub mod keys {
    pub const CURRENT_NODE: &str = "currentNode";
    pub const PROMPT_INITIATED: &str = "promptInitiated";
    pub const MESSAGE_COUNT: &str = "messageCount";
    pub const USER_DATA: &str = "userData";
    pub const INTERVIEW_DATA: &str = "interviewData";
    pub const SALES_DATA: &str = "salesData";
    pub const ROUTING_REASON: &str = "routingReason";
    pub const PRODUCT_INFO: &str = "productInfo";
    pub const USER_ID: &str = "userId";
    pub const CONNECTED_AT: &str = "connectedAt";
    pub const LAST_CONNECTED: &str = "lastConnected";
}

/// Where the session sits in the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentNode {
    /// No node recorded yet; the entry node applies.
    Unset,
    /// A node id (not yet checked against the node table).
    Node(String),
    /// The terminal node has run.
    Finished,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    messages: Vec<Message>,
    variables: HashMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            variables: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// A session seeded for a freshly authenticated user.
    pub fn for_user(user_id: &str, entry_node: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        let mut session = Self::new(user_id);
        session.insert(keys::USER_ID, Value::from(user_id));
        session.insert(keys::CURRENT_NODE, Value::from(entry_node));
        session.insert(keys::PROMPT_INITIATED, Value::Bool(false));
        session.insert(keys::CONNECTED_AT, Value::from(now));
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // --- Messages ---

    /// Append a message. No dedup.
    pub fn append_message(&mut self, message: Message) -> &mut Self {
        self.messages.push(message);
        self
    }

    /// An independent copy of the history.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn message_len(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear_messages(&mut self) -> &mut Self {
        self.messages.clear();
        self
    }

    // --- Variables ---

    /// Set a variable. Last write wins; empty keys are rejected.
    pub fn set_variable(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<&mut Self, SessionError> {
        let key = key.into();
        if key.is_empty() {
            return Err(SessionError::EmptyKey);
        }
        self.variables.insert(key, value);
        Ok(self)
    }

    pub fn get_variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn get_variable_or(&self, key: &str, fallback: Value) -> Value {
        self.variables.get(key).cloned().unwrap_or(fallback)
    }

    /// Deserialize a variable into `T`. `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.variables.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                SessionError::InvalidVariable {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    pub fn delete_variable(&mut self, key: &str) -> bool {
        self.variables.remove(key).is_some()
    }

    /// A copy of the variable bag.
    pub fn variables(&self) -> HashMap<String, Value> {
        self.variables.clone()
    }

    pub fn clear_variables(&mut self) -> &mut Self {
        self.variables.clear();
        self
    }

    // --- Workflow helpers ---

    pub fn current_node(&self) -> CurrentNode {
        match self.variables.get(keys::CURRENT_NODE) {
            None => CurrentNode::Unset,
            Some(Value::Null) => CurrentNode::Finished,
            Some(Value::String(id)) => CurrentNode::Node(id.clone()),
            Some(other) => CurrentNode::Node(other.to_string()),
        }
    }

    /// Record the current node; `None` marks the terminal state.
    pub fn set_current_node(&mut self, node: Option<&str>) {
        let value = node.map(Value::from).unwrap_or(Value::Null);
        self.insert(keys::CURRENT_NODE, value);
    }

    pub fn prompt_initiated(&self) -> bool {
        self.variables
            .get(keys::PROMPT_INITIATED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_prompt_initiated(&mut self, initiated: bool) {
        self.insert(keys::PROMPT_INITIATED, Value::Bool(initiated));
    }

    /// Add `by` to `messageCount` and return the new total.
    pub fn bump_message_count(&mut self, by: u64) -> u64 {
        let count = self
            .variables
            .get(keys::MESSAGE_COUNT)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            + by;
        self.insert(keys::MESSAGE_COUNT, Value::from(count));
        count
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            messages: self.messages.clone(),
            variables: self.variables.clone(),
            created_at: self.created_at,
        }
    }

    // Keys passed here are compile-time constants, never empty.
    fn insert(&mut self, key: &str, value: Value) {
        self.variables.insert(key.to_string(), value);
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub messages: Vec<Message>,
    pub variables: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}
