pub mod chat;
pub mod config_cmd;
pub mod nodes;
pub mod serve;

use std::sync::Arc;
use switchboard_config::AppConfig;
use switchboard_core::provider::Provider;
use switchboard_workflow::WorkflowEngine;

/// Load the configuration, naming the failure for the user.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// Wire the configured provider and the built-in tools into the workflow.
pub fn build_engine(config: &AppConfig) -> Result<Arc<WorkflowEngine>, Box<dyn std::error::Error>> {
    config.require_api_key()?;
    let provider: Arc<dyn Provider> = Arc::new(switchboard_providers::build_from_config(config)?);
    engine_with(provider, config)
}

/// The workflow for `config` running against `provider`.
pub fn engine_with(
    provider: Arc<dyn Provider>,
    config: &AppConfig,
) -> Result<Arc<WorkflowEngine>, Box<dyn std::error::Error>> {
    let tools = Arc::new(switchboard_tools::default_registry());
    let engine = switchboard_workflow::workflow_from_config(provider, tools, config)
        .map_err(|e| format!("Invalid workflow: {e}"))?;
    Ok(Arc::new(engine))
}
