//! Line-oriented command interface.
//!
//! Reads one command per line (text or JSON), runs it against the manager
//! and prints the result. Errors are reported and the loop continues; only
//! `exit`, end of input, or a shutdown signal ends it.

use crate::command::{error_json, Command, Outcome};
use crate::manager::PortManager;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// How responses are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Plain values, errors as `error: ...` lines.
    #[default]
    Text,
    /// One JSON object per response.
    Json,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exit,
    EndOfInput,
    Signal,
}

/// Rendered response to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text to print, if any.
    pub rendered: Option<String>,
    /// The command asked to end the session.
    pub exit: bool,
    /// The command failed.
    pub failed: bool,
}

/// Run one line against the manager and render the response.
pub fn handle_line(manager: &mut PortManager, line: &str, mode: OutputMode) -> Reply {
    let result = Command::parse(line).and_then(|command| {
        debug!(?command, "executing");
        command.execute(manager)
    });

    match result {
        Ok(outcome) => {
            let exit = outcome == Outcome::Exit;
            let rendered = match mode {
                OutputMode::Text => outcome.to_text(),
                OutputMode::Json => Some(outcome.to_json().to_string()),
            };
            Reply {
                rendered,
                exit,
                failed: false,
            }
        }
        Err(e) => {
            let rendered = match mode {
                OutputMode::Text => format!("error: {e}"),
                OutputMode::Json => error_json(&e).to_string(),
            };
            Reply {
                rendered: Some(rendered),
                exit: false,
                failed: true,
            }
        }
    }
}

/// Run the interactive loop until exit, end of input, or `shutdown` resolves.
///
/// The manager is left as-is; dropping it afterwards releases any open port.
pub async fn run_stdio_interface<R, W, S>(
    manager: &mut PortManager,
    input: R,
    mut output: W,
    mode: OutputMode,
    shutdown: S,
) -> std::io::Result<StopReason>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                info!("shutdown signal received");
                return Ok(StopReason::Signal);
            }
        };

        let Some(line) = line else {
            return Ok(StopReason::EndOfInput);
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(manager, &line, mode);
        if let Some(text) = reply.rendered {
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        if reply.exit {
            return Ok(StopReason::Exit);
        }
    }
}
