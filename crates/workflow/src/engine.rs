//! Workflow engine: resolves a session's node, runs it, applies the transition.

use crate::error::{Result, WorkflowError};
use crate::event::Emitter;
use crate::node::{ModelSettings, Node, NodeContext, Transition};
use crate::nodes::{self, EndNode, InterviewNode, ReceptionistNode, SalesNode};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_config::AppConfig;
use switchboard_core::provider::Provider;
use switchboard_core::session::{CurrentNode, Session};
use switchboard_core::store::SessionHandle;
use switchboard_core::tool::{ToolKind, ToolRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one `handle_user_message` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The node that handled the message.
    pub node: String,
    /// The transition that node returned.
    pub transition: Transition,
    /// Where the session stands after the turn.
    pub current_node: CurrentNode,
}

/// One row of [`WorkflowEngine::describe`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescription {
    pub id: String,
    pub entry: bool,
    pub terminal: bool,
    pub tools: Vec<ToolKind>,
    pub successors: Vec<String>,
}

pub struct WorkflowEngine {
    nodes: HashMap<String, Arc<dyn Node>>,
    order: Vec<String>,
    entry: String,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: ModelSettings,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("nodes", &self.order)
            .field("entry", &self.entry)
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}

pub struct WorkflowEngineBuilder {
    nodes: Vec<Arc<dyn Node>>,
    entry: Option<String>,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: ModelSettings,
}

impl WorkflowEngineBuilder {
    pub fn node(mut self, node: impl Node + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Defaults to the first node added.
    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }

    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the node graph and build the engine.
    pub fn build(self) -> Result<WorkflowEngine> {
        let mut nodes: HashMap<String, Arc<dyn Node>> = HashMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for node in self.nodes {
            let id = node.id().to_string();
            if id.is_empty() {
                return Err(WorkflowError::Config("node id must not be empty".into()));
            }
            if nodes.contains_key(&id) {
                return Err(WorkflowError::Config(format!("duplicate node id '{id}'")));
            }
            self.tools.ensure_registered(node.tools()).map_err(|e| {
                WorkflowError::Config(format!("node '{id}' offers an unregistered tool: {e}"))
            })?;
            order.push(id.clone());
            nodes.insert(id, node);
        }

        for id in &order {
            for successor in nodes[id].successors() {
                if !nodes.contains_key(*successor) {
                    return Err(WorkflowError::Config(format!(
                        "node '{id}' routes to unknown node '{successor}'"
                    )));
                }
            }
        }

        let entry = self
            .entry
            .or_else(|| order.first().cloned())
            .ok_or_else(|| WorkflowError::Config("workflow has no nodes".into()))?;
        if !nodes.contains_key(&entry) {
            return Err(WorkflowError::Config(format!("unknown entry node '{entry}'")));
        }

        debug!(nodes = ?order, entry = %entry, "Workflow built");
        Ok(WorkflowEngine {
            nodes,
            order,
            entry,
            provider: self.provider,
            tools: self.tools,
            settings: self.settings,
        })
    }
}

impl WorkflowEngine {
    pub fn builder(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> WorkflowEngineBuilder {
        WorkflowEngineBuilder {
            nodes: Vec::new(),
            entry: None,
            provider,
            tools,
            settings: ModelSettings::default(),
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn node(&self, id: &str) -> Option<&dyn Node> {
        self.nodes.get(id).map(|n| n.as_ref())
    }

    /// Nodes in registration order.
    pub fn describe(&self) -> Vec<NodeDescription> {
        self.order
            .iter()
            .map(|id| {
                let node = &self.nodes[id];
                NodeDescription {
                    id: id.clone(),
                    entry: *id == self.entry,
                    terminal: node.is_terminal(),
                    tools: node.tools().to_vec(),
                    successors: node.successors().iter().map(|s| s.to_string()).collect(),
                }
            })
            .collect()
    }

    /// Run one turn for `text` against the session's current node.
    ///
    /// The session stays locked for the whole turn, so turns on one session
    /// never interleave.
    pub async fn handle_user_message(
        &self,
        session: &SessionHandle,
        text: &str,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) -> Result<TurnReport> {
        let mut session = session.lock().await;

        let node_id = match session.current_node() {
            CurrentNode::Unset => {
                session.set_current_node(Some(&self.entry));
                self.entry.clone()
            }
            CurrentNode::Node(id) => id,
            CurrentNode::Finished => {
                emitter.error("Workflow already complete");
                return Err(WorkflowError::AlreadyComplete);
            }
        };
        let node = self
            .nodes
            .get(&node_id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownNode(node_id.clone()))?;

        debug!(session_id = %session.id(), node = %node_id, "Running node");
        let transition = {
            let mut ctx = self.context(&mut session, emitter, cancel);
            node.run(&mut ctx, text).await
        };

        self.apply_transition(&mut session, &node_id, &transition, text, emitter, cancel)
            .await;

        Ok(TurnReport {
            node: node_id,
            transition,
            current_node: session.current_node(),
        })
    }

    async fn apply_transition(
        &self,
        session: &mut Session,
        from: &str,
        transition: &Transition,
        text: &str,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) {
        match transition {
            Transition::Stay => {}
            Transition::Finish => session.set_current_node(None),
            Transition::Goto(to) if to == from => {}
            Transition::Goto(to) => {
                let Some(target) = self.nodes.get(to).cloned() else {
                    warn!(session_id = %session.id(), from = %from, to = %to, "Transition to unknown node, staying");
                    emitter.error(format!("Cannot route to unknown node '{to}'"));
                    return;
                };

                info!(session_id = %session.id(), from = %from, to = %to, "Node transition");
                session.set_current_node(Some(to));
                session.set_prompt_initiated(false);

                if target.is_terminal() {
                    let next = {
                        let mut ctx = self.context(session, emitter, cancel);
                        target.run(&mut ctx, text).await
                    };
                    if next == Transition::Finish {
                        session.set_current_node(None);
                    }
                }
            }
        }
    }

    fn context<'a>(
        &'a self,
        session: &'a mut Session,
        emitter: &'a Emitter,
        cancel: &'a CancellationToken,
    ) -> NodeContext<'a> {
        NodeContext {
            session,
            emitter,
            provider: self.provider.as_ref(),
            tools: self.tools.as_ref(),
            settings: &self.settings,
            cancel,
        }
    }
}

/// The receptionist → interview | sales → end workflow.
pub fn default_workflow(
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: ModelSettings,
) -> Result<WorkflowEngine> {
    standard_nodes(provider, tools)
        .entry(nodes::RECEPTIONIST)
        .settings(settings)
        .build()
}

/// The default workflow with entry node and model settings taken from `config`.
pub fn workflow_from_config(
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    config: &AppConfig,
) -> Result<WorkflowEngine> {
    standard_nodes(provider, tools)
        .entry(config.workflow.entry_node.as_str())
        .settings(ModelSettings::from(config))
        .build()
}

fn standard_nodes(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> WorkflowEngineBuilder {
    WorkflowEngine::builder(provider, tools)
        .node(ReceptionistNode)
        .node(InterviewNode)
        .node(SalesNode)
        .node(EndNode)
}
