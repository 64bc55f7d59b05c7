//! Axum-based HTTP channel.
//!
//! Implements [`Channel`]: `run()` drives the axum event loop and the
//! [`CancellationToken`] is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! POST /chat      {"message": "...", "session_id": "..."?}
//! GET  /health
//! ```

mod api;

use std::sync::Arc;

use axum::{Router, routing::{get, post}};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chat::ChatService;
use crate::error::AppError;

use super::{Channel, ChannelFuture};

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
pub(crate) struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    pub chat: Arc<ChatService>,
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    chat: Arc<ChatService>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        chat: Arc<ChatService>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            chat,
        }
    }
}

impl Channel for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.chat, shutdown))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    chat: Arc<ChatService>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(&channel_id, chat);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the HTTP router over `chat`. Public so tests can drive it directly.
pub fn build_router(channel_id: &str, chat: Arc<ChatService>) -> Router {
    let state = AxumState { channel_id: Arc::from(channel_id), chat };
    Router::new()
        .route("/chat",   post(api::chat))
        .route("/health", get(api::health))
        .with_state(state)
}
