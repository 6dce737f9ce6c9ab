//! Selection atom registry — the protocol names the clipboard speaks.

use x11rb::protocol::xproto::AtomEnum;

use crate::platform::{Atom, PlatformError, SelectionBackend};

/// Atoms resolved once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionAtoms {
    pub clipboard: Atom,
    pub primary: Atom,
    pub utf8_string: Atom,
    pub string: Atom,
    pub targets: Atom,
    pub text: Atom,
    /// Type atom for 32-bit atom lists (`TARGETS` replies).
    pub atom: Atom,
    /// Property on our window that conversion replies are written into.
    pub transfer: Atom,
    /// Type marking an incremental transfer, which is not supported.
    pub incr: Atom,
}

impl SelectionAtoms {
    /// Intern the selection atoms. `PRIMARY`, `STRING` and `ATOM` are
    /// predefined by the core protocol and need no round trip.
    pub fn resolve(backend: &dyn SelectionBackend) -> Result<Self, PlatformError> {
        let atoms = Self {
            clipboard: backend.intern_atom(b"CLIPBOARD")?,
            primary: AtomEnum::PRIMARY.into(),
            utf8_string: backend.intern_atom(b"UTF8_STRING")?,
            string: AtomEnum::STRING.into(),
            targets: backend.intern_atom(b"TARGETS")?,
            text: backend.intern_atom(b"TEXT")?,
            atom: AtomEnum::ATOM.into(),
            transfer: backend.intern_atom(b"XSEL_DATA")?,
            incr: backend.intern_atom(b"INCR")?,
        };
        tracing::debug!(?atoms, "resolved selection atoms");
        Ok(atoms)
    }

    /// Targets this process can serve, in the order they are advertised.
    pub fn supported_targets(&self) -> [Atom; 4] {
        [self.targets, self.text, self.utf8_string, self.string]
    }

    /// Whether `target` names a text format we can serve.
    pub fn is_text_target(&self, target: Atom) -> bool {
        target == self.text || target == self.utf8_string || target == self.string
    }

    /// Selections this process claims when it takes ownership.
    pub fn owned_selections(&self) -> [Atom; 2] {
        [self.primary, self.clipboard]
    }
}
