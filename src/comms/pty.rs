//! PTY (console) comms channel — reads lines from stdin, runs one exchange
//! per line, prints the reply to stdout.
//!
//! Strictly sequential: the loop blocks on each exchange before printing
//! and reading the next line. The literal line `exit` ends the session.
//! End of input or Ctrl-C also stop the loop.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::ChatService;
use crate::error::AppError;

use super::{Channel, ChannelFuture};

const PROMPT: &str = "You: ";
const EXIT_COMMAND: &str = "exit";
const FAREWELL: &str = "Goodbye!";

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    session_id: String,
    chat: Arc<ChatService>,
}

impl PtyChannel {
    pub fn new(
        channel_id: impl Into<String>,
        session_id: impl Into<String>,
        chat: Arc<ChatService>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            session_id: session_id.into(),
            chat,
        }
    }
}

impl Channel for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(async move {
            info!(channel_id = %self.channel_id, session_id = %self.session_id, "pty channel started");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            run_console(stdin, stdout, &self.chat, &self.session_id, shutdown).await
        })
    }
}

// ── run_console ──────────────────────────────────────────────────────────────

/// The console loop, generic over its I/O so it can run against buffers.
pub async fn run_console<R, W>(
    reader: R,
    mut writer: W,
    chat: &ChatService,
    session_id: &str,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let line = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                writer.write_all(b"\n").await?;
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => line,
        };

        let input = match line {
            Err(e) => {
                warn!("pty read error: {e}");
                break;
            }
            Ok(None) => {
                info!("pty stdin closed");
                break;
            }
            Ok(Some(input)) => input,
        };

        if input == EXIT_COMMAND {
            writer.write_all(format!("Chatbot: {FAREWELL}\n").as_bytes()).await?;
            writer.flush().await?;
            info!("exit requested");
            break;
        }

        debug!(input_len = input.len(), "pty received line");

        let out = match chat.exchange(session_id, input).await {
            Ok(reply) => format!("Chatbot: {}\n", reply.content),
            Err(e) => format!("Chatbot: error: {e}\n"),
        };
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
