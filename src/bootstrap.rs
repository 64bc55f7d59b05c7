//! Shared startup for both binaries.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config; a missing credential for the hosted provider fails here
//!   3. Init logger at configured level
//!   4. Build the completion gateway and the in-memory conversation store

use std::sync::Arc;

use tracing::info;

use crate::chat::ChatService;
use crate::config::{self, Config};
use crate::conversation::{ConversationStore, InMemoryStore};
use crate::error::AppError;
use crate::llm::{providers, Gateway, RetryPolicy};
use crate::logger;

/// Everything a binary needs to start its channel.
pub struct App {
    pub config: Config,
    pub chat: Arc<ChatService>,
}

pub fn init() -> Result<App, AppError> {
    // Load .env if present, ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        app_name = %config.app_name,
        log_level = %config.log_level,
        provider = %config.llm.provider,
        "config loaded"
    );

    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryStore::new());
    let chat = build_chat(&config, store)?;
    Ok(App { config, chat: Arc::new(chat) })
}

/// Wire a [`ChatService`] from config over the given store.
pub fn build_chat(config: &Config, store: Arc<dyn ConversationStore>) -> Result<ChatService, AppError> {
    let provider = providers::build(&config.llm, config.llm_api_key.clone())?;
    let retry = RetryPolicy::from_config(&config.llm.openai);

    info!(
        provider = provider.name(),
        model = provider.model(),
        store = store.store_type(),
        max_retries = retry.max_retries,
        context_turns = ?config.conversation.context_turns,
        "chat service ready"
    );

    Ok(ChatService::new(store, Gateway::new(provider, retry))
        .with_context_turns(config.conversation.context_turns))
}
