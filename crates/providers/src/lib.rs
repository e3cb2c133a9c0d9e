//! LLM Provider implementations for Switchboard.
//!
//! All providers implement the `switchboard_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use switchboard_config::AppConfig;
use switchboard_core::error::ProviderError;

/// Build the configured provider. Fails when no API key is set.
pub fn build_from_config(config: &AppConfig) -> Result<OpenAiCompatProvider, ProviderError> {
    let api_key = config
        .require_api_key()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
    OpenAiCompatProvider::new("openai", &config.api_url, api_key)
}
