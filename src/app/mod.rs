//! App driver — owns the display connection and the event loop.
//!
//! Connects to X11, builds the [`Clipboard`], and pumps selection events
//! into it from a single `tokio::select!` loop until the command is done
//! or a signal arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal::unix::{SignalKind, signal as tokio_signal};
use tokio::sync::{mpsc, oneshot};

use crate::cli::Command;
use crate::clipboard::{
    CLIPBOARD_TIMEOUT, Clipboard, ClipboardData, ClipboardError, Timeouts, text,
};
use crate::platform::x11::{self, X11Backend};
use crate::platform::{PlatformError, SelectionEvent};

/// App errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("X11: {0}")]
    Platform(#[from] PlatformError),
    #[error("clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
    #[error("X11 event thread exited unexpectedly")]
    EventThreadDied,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the event loop is waiting for.
enum Goal {
    /// A read to complete.
    Read(oneshot::Receiver<ClipboardData>),
    /// Losing ownership of the text we set.
    Serve,
}

/// Run one clipboard command against the display.
pub async fn run(display: Option<String>, command: Command) -> Result<(), AppError> {
    let backend = X11Backend::connect(display.as_deref())?;
    tracing::info!(screen = backend.screen_num(), "connected to X11 display");

    let stop = Arc::new(AtomicBool::new(false));
    let (events, x11_thread) =
        x11::spawn_event_thread(Arc::clone(backend.conn()), Arc::clone(&stop))?;

    let (clipboard, timeouts) = Clipboard::new(backend)?;

    let goal = match command {
        Command::Get => {
            let (tx, rx) = oneshot::channel();
            clipboard.use_clipboard(Box::new(move |data| {
                let _ = tx.send(data);
            }))?;
            Goal::Read(rx)
        }
        Command::Set { text } => {
            clipboard.set_clipboard_text(&text::to_wide(&text))?;
            tracing::info!(chars = text.chars().count(), "serving clipboard text");
            Goal::Serve
        }
    };

    let result = event_loop(&clipboard, events, timeouts, goal).await;

    clipboard.shutdown();
    stop.store(true, Ordering::Relaxed);
    // Exits within 100ms due to the poll timeout.
    if let Err(e) = x11_thread.join() {
        tracing::warn!("X11 event thread panicked: {e:?}");
    }

    result
}

async fn event_loop(
    clipboard: &Clipboard<X11Backend>,
    mut events: mpsc::UnboundedReceiver<SelectionEvent>,
    mut timeouts: Timeouts,
    goal: Goal,
) -> Result<(), AppError> {
    let mut sig_term = tokio_signal(SignalKind::terminate())?;
    let mut sig_int = tokio_signal(SignalKind::interrupt())?;

    let (mut read, serving) = match goal {
        Goal::Read(rx) => (Some(rx), false),
        Goal::Serve => (None, true),
    };

    loop {
        if serving && !clipboard.owns_text() {
            tracing::info!("clipboard taken by another client");
            eprintln!("clipboard ownership lost");
            return Ok(());
        }

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::error!("X11 event thread died, shutting down");
                    return Err(AppError::EventThreadDied);
                };
                clipboard.handle_event(&event);
            }

            Some(id) = timeouts.recv() => {
                clipboard.handle_timeout(id);
            }

            data = async { read.as_mut()?.await.ok() }, if read.is_some() => {
                print_read(data.unwrap_or_default());
                return Ok(());
            }

            _ = sig_term.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                return Ok(());
            }

            _ = sig_int.recv() => {
                tracing::info!("received SIGINT, shutting down");
                return Ok(());
            }
        }
    }
}

fn print_read(data: ClipboardData) {
    match data.text {
        Some(text) => {
            tracing::debug!(len = data.len, "clipboard read");
            println!("{text}");
        }
        None => {
            eprintln!(
                "clipboard empty or owner did not answer within {}ms",
                CLIPBOARD_TIMEOUT.as_millis()
            );
        }
    }
}
