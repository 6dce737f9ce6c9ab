//! In-memory selection backend for tests.
//!
//! Models just enough of a display server: an atom table, per-selection
//! owners and per-window properties. Every outbound call is recorded so
//! tests can assert on the protocol traffic.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Atom, PlatformError, Property, SelectionBackend, SelectionNotify, Window};

pub const LOCAL_WINDOW: Window = 0x0040_0001;
pub const REMOTE_WINDOW: Window = 0x0060_0001;

/// Predefined atoms, matching the core protocol numbering.
pub const PRIMARY: Atom = 1;
pub const STRING: Atom = 31;
pub const ATOM: Atom = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetSelectionOwner(Atom),
    ConvertSelection {
        selection: Atom,
        target: Atom,
        property: Atom,
    },
    DeleteProperty(Window, Atom),
    ChangeProperty {
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        value: Vec<u8>,
    },
    SendNotify(SelectionNotify),
}

#[derive(Default)]
struct Server {
    atoms: HashMap<Vec<u8>, Atom>,
    owners: HashMap<Atom, Window>,
    properties: HashMap<(Window, Atom), Property>,
    calls: Vec<Call>,
    fail_owner_query: bool,
    fail_convert: bool,
    fail_get_property: bool,
    fail_claim: Option<Atom>,
}

pub struct FakeBackend {
    server: Mutex<Server>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let mut server = Server::default();
        server.atoms.insert(b"PRIMARY".to_vec(), PRIMARY);
        server.atoms.insert(b"STRING".to_vec(), STRING);
        server.atoms.insert(b"ATOM".to_vec(), ATOM);
        Self {
            server: Mutex::new(server),
        }
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.intern_atom(name.as_bytes()).unwrap()
    }

    /// Make `window` the owner of `selection`, as if another client claimed it.
    pub fn set_owner(&self, selection: Atom, window: Window) {
        self.server.lock().owners.insert(selection, window);
    }

    pub fn owner(&self, selection: Atom) -> Window {
        self.server
            .lock()
            .owners
            .get(&selection)
            .copied()
            .unwrap_or(super::NONE)
    }

    /// Store a property as a remote owner would before replying.
    pub fn put_property(&self, window: Window, property: Atom, type_: Atom, value: &[u8]) {
        self.server.lock().properties.insert(
            (window, property),
            Property {
                type_,
                format: 8,
                value: value.to_vec(),
            },
        );
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<Property> {
        self.server
            .lock()
            .properties
            .get(&(window, property))
            .cloned()
    }

    pub fn fail_owner_query(&self) {
        self.server.lock().fail_owner_query = true;
    }

    pub fn fail_convert(&self) {
        self.server.lock().fail_convert = true;
    }

    pub fn fail_get_property(&self) {
        self.server.lock().fail_get_property = true;
    }

    /// Make claiming `selection` fail; other selections still succeed.
    pub fn fail_claim(&self, selection: Atom) {
        self.server.lock().fail_claim = Some(selection);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.server.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.server.lock().calls.clear();
    }

    pub fn owner_claims(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::SetSelectionOwner(_)))
            .count()
    }

    pub fn notifications(&self) -> Vec<SelectionNotify> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendNotify(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl SelectionBackend for FakeBackend {
    fn window(&self) -> Window {
        LOCAL_WINDOW
    }

    fn intern_atom(&self, name: &[u8]) -> Result<Atom, PlatformError> {
        let mut server = self.server.lock();
        let next = 100 + server.atoms.len() as Atom;
        Ok(*server.atoms.entry(name.to_vec()).or_insert(next))
    }

    fn selection_owner(&self, selection: Atom) -> Result<Window, PlatformError> {
        let server = self.server.lock();
        if server.fail_owner_query {
            return Err(PlatformError::request("get_selection_owner", "BadAtom"));
        }
        Ok(server
            .owners
            .get(&selection)
            .copied()
            .unwrap_or(super::NONE))
    }

    fn set_selection_owner(&self, selection: Atom) -> Result<(), PlatformError> {
        let mut server = self.server.lock();
        if server.fail_claim == Some(selection) {
            return Err(PlatformError::request("set_selection_owner", "BadWindow"));
        }
        server.owners.insert(selection, LOCAL_WINDOW);
        server.calls.push(Call::SetSelectionOwner(selection));
        Ok(())
    }

    fn convert_selection(
        &self,
        selection: Atom,
        target: Atom,
        property: Atom,
    ) -> Result<(), PlatformError> {
        let mut server = self.server.lock();
        if server.fail_convert {
            return Err(PlatformError::request("convert_selection", "BadAtom"));
        }
        server.calls.push(Call::ConvertSelection {
            selection,
            target,
            property,
        });
        Ok(())
    }

    fn get_property(
        &self,
        window: Window,
        property: Atom,
    ) -> Result<Option<Property>, PlatformError> {
        if self.server.lock().fail_get_property {
            return Err(PlatformError::request("get_property", "BadWindow"));
        }
        Ok(self.property(window, property))
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), PlatformError> {
        let mut server = self.server.lock();
        server.properties.remove(&(window, property));
        server.calls.push(Call::DeleteProperty(window, property));
        Ok(())
    }

    fn change_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), PlatformError> {
        self.server.lock().calls.push(Call::ChangeProperty {
            window,
            property,
            type_,
            format: 8,
            value: data.to_vec(),
        });
        Ok(())
    }

    fn change_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), PlatformError> {
        let value = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.server.lock().calls.push(Call::ChangeProperty {
            window,
            property,
            type_,
            format: 32,
            value,
        });
        Ok(())
    }

    fn send_selection_notify(&self, notify: SelectionNotify) -> Result<(), PlatformError> {
        self.server.lock().calls.push(Call::SendNotify(notify));
        Ok(())
    }
}
