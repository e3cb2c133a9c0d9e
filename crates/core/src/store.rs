//! Session storage: where live sessions are kept between turns.
//!
//! The transport owns the lifecycle. A connection calls `acquire` on
//! authenticate and `release` when it ends; the session leaves the store once
//! its last holder is gone. Each session sits behind its own async mutex so
//! that only one turn runs against it at a time, while different sessions
//! proceed in parallel.

use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared, turn-serializing handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// The session storage trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Look up a session, creating it with `Session::for_user` if absent.
    /// The flag is `true` when the session was created by this call.
    async fn get_or_create(&self, id: &str) -> (SessionHandle, bool);

    /// Like `get_or_create`, and registers the caller as a holder.
    async fn acquire(&self, id: &str) -> (SessionHandle, bool);

    /// Drop one holder. The session is removed when none are left;
    /// returns whether that happened.
    async fn release(&self, id: &str) -> bool;

    /// Number of holders of a session.
    async fn holders(&self, id: &str) -> usize;

    /// Look up an existing session.
    async fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Remove a session regardless of holders. Returns whether one existed.
    async fn remove(&self, id: &str) -> bool;

    /// Ids of all live sessions, sorted.
    async fn list(&self) -> Vec<String>;

    /// Number of live sessions.
    async fn len(&self) -> usize;
}

struct Entry {
    handle: SessionHandle,
    holders: usize,
}

/// Process-local session store.
pub struct InMemorySessionStore {
    entry_node: String,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    /// New sessions start at `entry_node`.
    pub fn new(entry_node: impl Into<String>) -> Self {
        Self {
            entry_node: entry_node.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn lookup_or_insert(&self, id: &str, hold: bool) -> (SessionHandle, bool) {
        let mut sessions = self.sessions.write().await;
        let created = !sessions.contains_key(id);
        let entry = sessions.entry(id.to_string()).or_insert_with(|| Entry {
            handle: Arc::new(Mutex::new(Session::for_user(id, &self.entry_node))),
            holders: 0,
        });
        if hold {
            entry.holders += 1;
        }
        if created {
            tracing::debug!(session_id = %id, "Session created");
        }
        (entry.handle.clone(), created)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create(&self, id: &str) -> (SessionHandle, bool) {
        if let Some(existing) = self.sessions.read().await.get(id) {
            return (existing.handle.clone(), false);
        }
        self.lookup_or_insert(id, false).await
    }

    async fn acquire(&self, id: &str) -> (SessionHandle, bool) {
        self.lookup_or_insert(id, true).await
    }

    async fn release(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.get_mut(id) else {
            return false;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders > 0 {
            tracing::debug!(session_id = %id, holders = entry.holders, "Session still held");
            return false;
        }
        sessions.remove(id);
        tracing::debug!(session_id = %id, "Session released");
        true
    }

    async fn holders(&self, id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(id)
            .map_or(0, |entry| entry.holders)
    }

    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(|e| e.handle.clone())
    }

    async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session removed");
        }
        removed
    }

    async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
