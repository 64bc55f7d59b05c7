//! Comms — the external I/O channels in front of the [`ChatService`].
//!
//! Each channel (console, HTTP) implements [`Channel`]. A channel captures
//! its shared `Arc<ChatService>` at construction time and is driven by
//! [`Channel::run`] until its own work is done or the shutdown token is
//! cancelled (Ctrl-C).
//!
//! [`ChatService`]: crate::chat::ChatService

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;

/// A boxed, owned future returned by [`Channel::run`].
pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained front-end.
pub trait Channel: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the channel and return its run-loop as a boxed future.
    ///
    /// The future must respect `shutdown` for cooperative termination.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture;
}

/// Drive `channel` to completion, cancelling `shutdown` on Ctrl-C.
pub async fn serve(channel: Box<dyn Channel>, shutdown: CancellationToken) -> Result<(), AppError> {
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let id = channel.id().to_string();
    debug!(channel = %id, "starting channel");
    let result = channel.run(shutdown).await;
    debug!(channel = %id, ok = result.is_ok(), "channel exited");
    result
}
