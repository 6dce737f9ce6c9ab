//! Clipboard — asynchronous selection exchange over a platform backend.
//!
//! Reconciles a callback-style "give me the clipboard" API with the
//! event-driven selection protocol. A read is armed, a conversion
//! request goes out, and exactly one of three things completes it: the
//! owner's reply, its expired timer, or the local fast path when
//! this process owns the selection itself.
//!
//! All handlers and callbacks run on the event loop that feeds
//! [`Clipboard::handle_event`] and [`Clipboard::handle_timeout`]. The
//! supervisor only posts expired request ids to [`Timeouts`].

mod atoms;
mod handler;
mod state;
mod supervisor;
pub mod text;

use tokio::sync::mpsc;

use crate::platform::{NONE, PlatformError, SelectionBackend, SelectionEvent};

pub use state::{ClipboardAction, ClipboardData};
pub use supervisor::{CLIPBOARD_TIMEOUT, Timeouts};

use atoms::SelectionAtoms;
use state::{ClipboardState, Completion, RequestId};

/// Clipboard errors.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// A read is already in flight.
    #[error("a clipboard request is already running")]
    Busy,
    /// Input text contains a unit that is not a Unicode scalar value.
    #[error("invalid character U+{unit:04X} at position {position}")]
    Encoding { position: usize, unit: u32 },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// The clipboard subsystem for one display connection.
///
/// Constructed once at startup and passed by reference to whatever
/// delivers platform events.
pub struct Clipboard<B> {
    backend: B,
    atoms: SelectionAtoms,
    state: ClipboardState,
    expired: mpsc::UnboundedSender<RequestId>,
}

impl<B: SelectionBackend> Clipboard<B> {
    /// Resolve the selection atoms. Failure here is fatal to the subsystem.
    ///
    /// The returned [`Timeouts`] must be drained by the event loop and each
    /// id passed to [`handle_timeout`](Self::handle_timeout).
    pub fn new(backend: B) -> Result<(Self, Timeouts), ClipboardError> {
        let atoms = SelectionAtoms::resolve(&backend)?;
        let (expired, timeouts) = supervisor::channel();
        let clipboard = Self {
            backend,
            atoms,
            state: ClipboardState::new(),
            expired,
        };
        Ok((clipboard, timeouts))
    }

    #[cfg(test)]
    pub fn atoms(&self) -> &SelectionAtoms {
        &self.atoms
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether a read is currently in flight.
    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.state.is_running()
    }

    /// Whether this process holds text to serve as selection owner.
    pub fn owns_text(&self) -> bool {
        self.state.owns_text()
    }

    /// Read the clipboard; `action` runs exactly once with the result.
    ///
    /// Never blocks. If another process owns the clipboard the result
    /// arrives via [`handle_event`](Self::handle_event) or, after
    /// [`CLIPBOARD_TIMEOUT`], as an empty payload via
    /// [`handle_timeout`](Self::handle_timeout). When this process owns
    /// it, or nobody does, `action` runs before this returns.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ClipboardError::Busy`] if a read is already in flight; `action`
    /// is dropped without being called and the running read is untouched.
    pub fn use_clipboard(&self, action: ClipboardAction) -> Result<(), ClipboardError> {
        let Some(id) = self.state.arm(action) else {
            tracing::debug!("tried to read the clipboard while a read was in progress");
            return Err(ClipboardError::Busy);
        };

        let owner = match self.backend.selection_owner(self.atoms.clipboard) {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(error = %e, "clipboard owner query failed");
                self.state.complete(Completion::Event, ClipboardData::empty());
                return Ok(());
            }
        };

        if owner == self.backend.window() {
            tracing::debug!("clipboard owned by self");
            let data = self.state.with_owned(|owned| match owned {
                Some(bytes) => ClipboardData::text(text::decode(bytes, text::Encoding::Utf8)),
                None => ClipboardData::empty(),
            });
            self.state.complete(Completion::Event, data);
            return Ok(());
        }

        if owner == NONE {
            tracing::debug!("clipboard owner not found");
            self.state.complete(Completion::Event, ClipboardData::empty());
            return Ok(());
        }

        if let Err(e) = self.backend.convert_selection(
            self.atoms.clipboard,
            self.atoms.utf8_string,
            self.atoms.transfer,
        ) {
            tracing::warn!(error = %e, "clipboard conversion request failed");
            self.state.complete(Completion::Event, ClipboardData::empty());
            return Ok(());
        }

        supervisor::start(&self.state, &self.expired, id);
        tracing::debug!(owner, "clipboard content requested, expecting SelectionNotify");
        Ok(())
    }

    /// Take ownership of PRIMARY and CLIPBOARD with `text`.
    ///
    /// `text` is in the toolkit's wide-character units. The previous
    /// payload, if any, is released. Ownership is only claimed again when
    /// we are not already the owner.
    ///
    /// Claiming is best-effort per selection: a failure on PRIMARY is
    /// logged and CLIPBOARD is still claimed.
    ///
    /// # Errors
    ///
    /// [`ClipboardError::Encoding`] leaves the state untouched.
    /// [`ClipboardError::Platform`] carries the first failed claim, after
    /// both selections were attempted; the new payload is kept.
    pub fn set_clipboard_text(&self, text: &[u32]) -> Result<(), ClipboardError> {
        let bytes = text::encode_wide(text).inspect_err(|e| {
            tracing::debug!(error = %e, "failed to encode clipboard text");
        })?;
        let len = bytes.len();

        let held = self.state.replace_owned(bytes);
        tracing::debug!(bytes = len, "copying text to clipboard");

        let owner = self
            .backend
            .selection_owner(self.atoms.clipboard)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "clipboard owner query failed");
                NONE
            });
        if held && owner == self.backend.window() {
            tracing::debug!("clipboard already owned");
            return Ok(());
        }

        let mut failed = None;
        for selection in self.atoms.owned_selections() {
            if let Err(e) = self.backend.set_selection_owner(selection) {
                tracing::warn!(error = %e, selection, "failed to claim selection");
                failed.get_or_insert(e);
            }
        }
        match failed {
            Some(e) => Err(e.into()),
            None => {
                tracing::debug!("took ownership of the clipboard");
                Ok(())
            }
        }
    }

    /// Route a selection event to its handler.
    pub fn handle_event(&self, event: &SelectionEvent) {
        match event {
            SelectionEvent::Notify(e) => {
                handler::on_selection_notify(&self.backend, &self.atoms, &self.state, e)
            }
            SelectionEvent::Clear(e) => handler::on_selection_clear(&self.state, e),
            SelectionEvent::Request(e) => {
                handler::on_selection_request(&self.backend, &self.atoms, &self.state, e)
            }
        }
    }

    /// Complete request `id` with an empty payload if it is still the one
    /// in flight. Ids from requests that already completed are ignored.
    pub fn handle_timeout(&self, id: RequestId) {
        self.state.complete(Completion::Timeout(id), ClipboardData::empty());
    }

    /// Tear down: complete any in-flight read with an empty payload and
    /// release the owned text.
    pub fn shutdown(&self) {
        if self.state.complete(Completion::Event, ClipboardData::empty()) {
            tracing::debug!("completed pending clipboard read on shutdown");
        }
        self.state.release_owned();
    }
}
