//! Timeout supervisor — bounds the wait for a conversion reply.
//!
//! The supervisor never completes a request itself. When its timer runs
//! out it posts the request id to a [`Timeouts`] queue, and the event
//! loop that drains the queue completes the request through
//! [`Clipboard::handle_timeout`](super::Clipboard::handle_timeout). That
//! keeps every callback on the event-loop thread.

use std::time::Duration;

use tokio::sync::mpsc;

use super::state::{ClipboardState, RequestId};

/// How long an owner gets to answer a conversion request.
pub const CLIPBOARD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Expired request ids, drained by the event loop.
pub struct Timeouts {
    rx: mpsc::UnboundedReceiver<RequestId>,
}

impl Timeouts {
    /// Wait for the next expired request. `None` once the clipboard is gone.
    pub async fn recv(&mut self) -> Option<RequestId> {
        self.rx.recv().await
    }
}

/// Create the queue the supervisors post to.
pub fn channel() -> (mpsc::UnboundedSender<RequestId>, Timeouts) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Timeouts { rx })
}

/// Start the supervisor for request `id` and hand its task to the state.
///
/// After [`CLIPBOARD_TIMEOUT`] the id is posted to `expired`. The event
/// path aborts the task when it wins; if the abort lands too late the
/// stale id finds no matching request and is ignored.
///
/// Must be called from within a tokio runtime.
pub fn start(state: &ClipboardState, expired: &mpsc::UnboundedSender<RequestId>, id: RequestId) {
    let expired = expired.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(CLIPBOARD_TIMEOUT).await;
        tracing::debug!(?id, "clipboard request timed out");
        // Receiver gone means the clipboard was dropped.
        let _ = expired.send(id);
    });
    state.attach_supervisor(id, handle);
}
