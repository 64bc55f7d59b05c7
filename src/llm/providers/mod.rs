//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;

use crate::config::{LlmConfig, API_KEY_ENV};
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and the API key.
///
/// `api_key` is sourced from `OPENAI_API_KEY` (never TOML). The hosted
/// provider refuses to build without one, so a missing credential surfaces
/// before any request is attempted.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" => {
            let api_key = api_key.ok_or_else(|| ProviderError::MissingCredential(API_KEY_ENV.into()))?;
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}
