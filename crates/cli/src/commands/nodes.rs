//! `switchboard nodes`: print the workflow graph.

use std::sync::Arc;
use switchboard_core::error::ProviderError;
use switchboard_core::provider::{ChunkReceiver, Provider, ProviderRequest};
use switchboard_workflow::{NodeDescription, WorkflowEngine};

/// Stands in for the model when only the graph is needed.
struct Offline;

#[async_trait::async_trait]
impl Provider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        Err(ProviderError::NotConfigured("offline".into()))
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let engine = super::engine_with(Arc::new(Offline), &config)?;
    print!("{}", render(&engine));
    Ok(())
}

fn render(engine: &WorkflowEngine) -> String {
    let mut out = String::new();
    for node in engine.describe() {
        out.push_str(&render_row(&node));
        out.push('\n');
    }
    out
}

fn render_row(node: &NodeDescription) -> String {
    let mut marker = String::new();
    if node.entry {
        marker.push_str(" (entry)");
    }
    if node.terminal {
        marker.push_str(" (terminal)");
    }

    let tools = if node.tools.is_empty() {
        "-".to_string()
    } else {
        node.tools
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let next = if node.successors.is_empty() {
        "-".to_string()
    } else {
        node.successors.join(", ")
    };

    format!("{}{marker}\n   tools: {tools}\n   next:  {next}", node.id)
}
