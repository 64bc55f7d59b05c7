//! Console front-end — `You:` / `Chatbot:` loop on stdin/stdout.

use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use chatbot_relay::bootstrap;
use chatbot_relay::comms::{self, pty::PtyChannel};
use chatbot_relay::error::AppError;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let app = bootstrap::init()?;

    // One console, one conversation: a fresh id per process.
    let session_id = Uuid::new_v4().to_string();
    info!(%session_id, "starting console front-end");

    let channel = PtyChannel::new("pty0", session_id, app.chat);
    comms::serve(Box::new(channel), CancellationToken::new()).await
}
