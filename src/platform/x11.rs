//! X11 integration — connection, owner window, selection calls, event thread.
//!
//! Wraps `x11rb::rust_connection::RustConnection` behind
//! [`SelectionBackend`]. Selections are owned by a hidden 1x1 window
//! created at connect time, and a polling thread feeds selection events
//! to the main async loop.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    self, AtomEnum, ConnectionExt as _, CreateWindowAux, EventMask, PropMode, SELECTION_NOTIFY_EVENT,
    SelectionNotifyEvent, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, CURRENT_TIME};

use super::{
    Atom, PlatformError, Property, SelectionBackend, SelectionClear, SelectionEvent,
    SelectionNotify, SelectionRequest, Window,
};

/// X11 implementation of [`SelectionBackend`].
#[derive(Clone)]
pub struct X11Backend {
    conn: Arc<RustConnection>,
    screen_num: usize,
    window: Window,
}

impl X11Backend {
    /// Connect to the display and create the hidden owner window.
    ///
    /// `display` follows Xlib naming (`":0"`); `None` uses `$DISPLAY`.
    pub fn connect(display: Option<&str>) -> Result<Self, PlatformError> {
        let (conn, screen_num) =
            RustConnection::connect(display).map_err(|e| PlatformError::Connect(e.to_string()))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let visual = screen.root_visual;

        let window = conn
            .generate_id()
            .map_err(|e| PlatformError::request("generate_id", e))?;

        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new(),
        )
        .map_err(|e| PlatformError::request("create_window", e))?
        .check()
        .map_err(|e| PlatformError::request("create_window", e))?;

        tracing::debug!(window, screen = screen_num, "created selection owner window");

        Ok(Self {
            conn: Arc::new(conn),
            screen_num,
            window,
        })
    }

    /// Get a shared reference to the X11 connection.
    pub fn conn(&self) -> &Arc<RustConnection> {
        &self.conn
    }

    /// Get the screen number.
    pub fn screen_num(&self) -> usize {
        self.screen_num
    }

    fn flush(&self, request: &'static str) -> Result<(), PlatformError> {
        self.conn
            .flush()
            .map_err(|e| PlatformError::request(request, e))
    }
}

impl SelectionBackend for X11Backend {
    fn window(&self) -> Window {
        self.window
    }

    fn intern_atom(&self, name: &[u8]) -> Result<Atom, PlatformError> {
        Ok(xproto::intern_atom(&*self.conn, false, name)
            .map_err(|e| PlatformError::request("intern_atom", e))?
            .reply()
            .map_err(|e| PlatformError::request("intern_atom reply", e))?
            .atom)
    }

    fn selection_owner(&self, selection: Atom) -> Result<Window, PlatformError> {
        Ok(self
            .conn
            .get_selection_owner(selection)
            .map_err(|e| PlatformError::request("get_selection_owner", e))?
            .reply()
            .map_err(|e| PlatformError::request("get_selection_owner reply", e))?
            .owner)
    }

    fn set_selection_owner(&self, selection: Atom) -> Result<(), PlatformError> {
        self.conn
            .set_selection_owner(self.window, selection, CURRENT_TIME)
            .map_err(|e| PlatformError::request("set_selection_owner", e))?;
        self.flush("set_selection_owner")
    }

    fn convert_selection(
        &self,
        selection: Atom,
        target: Atom,
        property: Atom,
    ) -> Result<(), PlatformError> {
        self.conn
            .convert_selection(self.window, selection, target, property, CURRENT_TIME)
            .map_err(|e| PlatformError::request("convert_selection", e))?;
        self.flush("convert_selection")
    }

    fn get_property(
        &self,
        window: Window,
        property: Atom,
    ) -> Result<Option<Property>, PlatformError> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX)
            .map_err(|e| PlatformError::request("get_property", e))?
            .reply()
            .map_err(|e| PlatformError::request("get_property reply", e))?;

        // A missing property comes back with type None.
        if reply.type_ == super::NONE {
            return Ok(None);
        }

        Ok(Some(Property {
            type_: reply.type_,
            format: reply.format,
            value: reply.value,
        }))
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), PlatformError> {
        self.conn
            .delete_property(window, property)
            .map_err(|e| PlatformError::request("delete_property", e))?;
        self.flush("delete_property")
    }

    fn change_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), PlatformError> {
        self.conn
            .change_property8(PropMode::REPLACE, window, property, type_, data)
            .map_err(|e| PlatformError::request("change_property8", e))?;
        self.flush("change_property8")
    }

    fn change_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), PlatformError> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)
            .map_err(|e| PlatformError::request("change_property32", e))?;
        self.flush("change_property32")
    }

    fn send_selection_notify(&self, notify: SelectionNotify) -> Result<(), PlatformError> {
        let event = SelectionNotifyEvent {
            response_type: SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: notify.time,
            requestor: notify.requestor,
            selection: notify.selection,
            target: notify.target,
            property: notify.property,
        };
        self.conn
            .send_event(true, notify.requestor, EventMask::NO_EVENT, event)
            .map_err(|e| PlatformError::request("send_event", e))?;
        self.flush("send_event")
    }
}

/// Pick the selection events out of the X11 event stream.
pub fn selection_event(event: &Event) -> Option<SelectionEvent> {
    match event {
        Event::SelectionNotify(e) => Some(SelectionEvent::Notify(SelectionNotify {
            time: e.time,
            requestor: e.requestor,
            selection: e.selection,
            target: e.target,
            property: e.property,
        })),
        Event::SelectionClear(e) => Some(SelectionEvent::Clear(SelectionClear {
            time: e.time,
            owner: e.owner,
            selection: e.selection,
        })),
        Event::SelectionRequest(e) => Some(SelectionEvent::Request(SelectionRequest {
            time: e.time,
            owner: e.owner,
            requestor: e.requestor,
            selection: e.selection,
            target: e.target,
            property: e.property,
        })),
        _ => None,
    }
}

/// Spawn a dedicated thread that polls the X11 connection for events.
///
/// Uses `nix::poll()` on the X11 connection fd with a 100ms timeout.
/// When readable, drains all available events and forwards the selection
/// events; everything else is dropped. Checks the `stop` flag each
/// iteration for clean shutdown.
pub fn spawn_event_thread(
    conn: Arc<RustConnection>,
    stop: Arc<AtomicBool>,
) -> Result<
    (
        tokio::sync::mpsc::UnboundedReceiver<SelectionEvent>,
        JoinHandle<()>,
    ),
    PlatformError,
> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = std::thread::Builder::new()
        .name("x11-events".into())
        .spawn(move || {
            let raw_fd = conn.stream().as_raw_fd();

            while !stop.load(Ordering::Relaxed) {
                // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
                let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
                let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

                match poll(&mut fds, PollTimeout::from(100u16)) {
                    Ok(0) => continue,
                    Ok(_) => loop {
                        match conn.poll_for_event() {
                            Ok(Some(event)) => {
                                let Some(event) = selection_event(&event) else {
                                    continue;
                                };
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "X11 connection error");
                                return;
                            }
                        }
                    },
                    Err(nix::Error::EINTR) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "poll error on X11 fd");
                        return;
                    }
                }
            }
        })?;

    Ok((rx, handle))
}
