//! Dummy LLM provider — echoes the latest user turn prefixed with `[echo]`.
//! Used for running both front-ends without an API key.

use crate::conversation::{Role, Turn};
use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, transcript: &[Turn]) -> Result<Turn, ProviderError> {
        let last = transcript
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or_default();
        Ok(Turn::assistant(format!("[echo] {last}")))
    }
}
