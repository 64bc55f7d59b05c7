//! HTTP front-end — serves `POST /chat` until Ctrl-C.

use tokio_util::sync::CancellationToken;
use tracing::info;

use chatbot_relay::bootstrap;
use chatbot_relay::comms::{self, axum_channel::AxumChannel};
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

    info!(bind = %app.config.http.bind, "starting http front-end");
    let channel = AxumChannel::new("http0", app.config.http.bind.clone(), app.chat);
    comms::serve(Box::new(channel), CancellationToken::new()).await
}
