//! # Switchboard Core
//!
//! Domain types, traits, and error definitions for the Switchboard workflow engine.
//! Nothing here talks to the network; the other crates implement against these
//! types.
//!
//! - [`session`]: per-user history and variables
//! - [`store`]: where sessions live between turns
//! - [`provider`]: the streaming model boundary
//! - [`tool`]: function-call handlers and their registry

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SessionError, ToolError};
pub use message::{Message, Role};
pub use provider::{
    ChunkReceiver, Provider, ProviderRequest, StreamChunk, ToolCallFragment, ToolDefinition,
};
pub use session::{CurrentNode, Session, SessionSnapshot, keys};
pub use store::{InMemorySessionStore, SessionHandle, SessionStore};
pub use tool::{Tool, ToolKind, ToolRegistry, ToolResult};
