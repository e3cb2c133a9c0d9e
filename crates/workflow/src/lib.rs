//! Node workflow engine for Switchboard.
//!
//! A session sits in one node at a time. Each user message runs that node's
//! turn: the model response streams through the [`StreamAccumulator`], the
//! completed tool calls go to their handlers, and the node decides whether the
//! workflow moves on. The [`WorkflowEngine`] stores the decision in the session.

pub mod accumulator;
pub mod engine;
pub mod error;
pub mod event;
pub mod node;
pub mod nodes;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use accumulator::{AccumulatedTurn, ArgumentsError, CompletedToolCall, StreamAccumulator};
pub use engine::{NodeDescription, TurnReport, WorkflowEngine, WorkflowEngineBuilder, default_workflow, workflow_from_config};
pub use error::WorkflowError;
pub use event::{CompletionSummary, Emitter, WorkflowEvent};
pub use node::{CallOutcome, HandledCall, ModelSettings, Node, NodeContext, Transition};
