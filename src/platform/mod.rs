//! Platform seam — the windowing-system calls the clipboard depends on.
//!
//! The clipboard core never talks to a display server directly. It
//! consumes selection events as [`SelectionEvent`] values and issues its
//! outbound calls through [`SelectionBackend`]. `x11` is the reference
//! adapter; tests drive the core through an in-memory fake.

#[cfg(test)]
pub mod fake;
pub mod x11;

pub use x11rb::protocol::xproto::{Atom, Timestamp, Window};

/// The "no atom / no window" value of the selection protocol.
pub const NONE: u32 = x11rb::NONE;

/// Errors returned by platform adapters.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Could not open the display connection.
    #[error("connect: {0}")]
    Connect(String),

    /// A request could not be sent, or its reply reported an error.
    #[error("{request}: {reason}")]
    Request {
        request: &'static str,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    pub fn request(request: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Request {
            request,
            reason: reason.to_string(),
        }
    }
}

/// A window property as read back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Type atom the owner stored the data under.
    pub type_: Atom,
    /// Unit size in bits (8, 16 or 32).
    pub format: u8,
    pub value: Vec<u8>,
}

/// A conversion reply: the owner finished writing (or refused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionNotify {
    pub time: Timestamp,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    /// `NONE` when the owner refused the conversion.
    pub property: Atom,
}

/// Another client took ownership of a selection we held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionClear {
    pub time: Timestamp,
    pub owner: Window,
    pub selection: Atom,
}

/// Another client asks us, as owner, to convert a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
    pub time: Timestamp,
    pub owner: Window,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    pub property: Atom,
}

/// Selection events routed to the clipboard, one variant per message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Notify(SelectionNotify),
    Clear(SelectionClear),
    Request(SelectionRequest),
}

/// Outbound selection-protocol calls.
///
/// Every call is fire-and-forget from the caller's point of view except
/// the ones that return data. Adapters flush as needed so a request is on
/// the wire when the call returns.
///
/// `Send + Sync` so a clipboard can be held across awaits on the
/// multi-threaded runtime.
pub trait SelectionBackend: Send + Sync {
    /// The window this process uses to own selections and receive replies.
    fn window(&self) -> Window;

    /// Resolve a protocol name to its atom.
    fn intern_atom(&self, name: &[u8]) -> Result<Atom, PlatformError>;

    /// Current owner of `selection`, or `NONE`.
    fn selection_owner(&self, selection: Atom) -> Result<Window, PlatformError>;

    /// Claim `selection` for [`window`](Self::window).
    fn set_selection_owner(&self, selection: Atom) -> Result<(), PlatformError>;

    /// Ask the owner of `selection` to write it as `target` into `property`
    /// on our window. The answer arrives later as [`SelectionEvent::Notify`].
    fn convert_selection(
        &self,
        selection: Atom,
        target: Atom,
        property: Atom,
    ) -> Result<(), PlatformError>;

    /// Read a whole property; `None` if it does not exist.
    fn get_property(
        &self,
        window: Window,
        property: Atom,
    ) -> Result<Option<Property>, PlatformError>;

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), PlatformError>;

    /// Replace a property with 8-bit data.
    fn change_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), PlatformError>;

    /// Replace a property with 32-bit data.
    fn change_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), PlatformError>;

    /// Send a synthetic selection-notify event to `notify.requestor`.
    fn send_selection_notify(&self, notify: SelectionNotify) -> Result<(), PlatformError>;
}
