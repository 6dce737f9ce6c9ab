//! Selection event handlers — one per inbound protocol message.
//!
//! Platform failures here are best-effort: they are logged and the
//! handler carries on, so an in-flight read still completes and a
//! requestor still gets an answer.

use crate::platform::{
    NONE, SelectionBackend, SelectionClear, SelectionNotify, SelectionRequest,
};

use super::atoms::SelectionAtoms;
use super::state::{ClipboardData, ClipboardState, Completion};
use super::text::{self, Encoding};

/// A conversion reply arrived for the read we armed.
pub fn on_selection_notify(
    backend: &dyn SelectionBackend,
    atoms: &SelectionAtoms,
    state: &ClipboardState,
    event: &SelectionNotify,
) {
    if !state.is_running() {
        tracing::debug!("SelectionNotify received with no request running");
        return;
    }
    if event.selection != atoms.clipboard {
        tracing::debug!(selection = event.selection, "SelectionNotify for another selection");
        return;
    }

    let data = if event.property == NONE {
        tracing::debug!(target_atom = event.target, "selection owner refused conversion");
        ClipboardData::empty()
    } else {
        let data = read_transfer(backend, atoms, event);
        if let Err(e) = backend.delete_property(event.requestor, event.property) {
            tracing::warn!(error = %e, "failed to delete transfer property");
        }
        data
    };

    state.complete(Completion::Event, data);
}

fn read_transfer(
    backend: &dyn SelectionBackend,
    atoms: &SelectionAtoms,
    event: &SelectionNotify,
) -> ClipboardData {
    let property = match backend.get_property(event.requestor, event.property) {
        Ok(Some(property)) => property,
        Ok(None) => {
            tracing::debug!("transfer property missing");
            return ClipboardData::empty();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read transfer property");
            return ClipboardData::empty();
        }
    };

    let encoding = if property.type_ == atoms.utf8_string {
        Encoding::Utf8
    } else if property.type_ == atoms.string {
        Encoding::Latin1
    } else if property.type_ == atoms.incr {
        tracing::warn!("incremental selection transfer is not supported");
        return ClipboardData::empty();
    } else {
        tracing::debug!(type_ = property.type_, "transfer property is not text");
        return ClipboardData::empty();
    };
    if property.format != 8 {
        tracing::debug!(format = property.format, "text property with unexpected format");
        return ClipboardData::empty();
    }

    let text = text::decode(&property.value, encoding);
    tracing::debug!(bytes = property.value.len(), ?encoding, "received clipboard text");
    ClipboardData::text(text)
}

/// Another client claimed a selection we owned.
pub fn on_selection_clear(state: &ClipboardState, event: &SelectionClear) {
    if let Some(text) = state.release_owned() {
        tracing::debug!(
            selection = event.selection,
            bytes = text.len(),
            "lost ownership of the clipboard"
        );
    }
}

/// Another client asks for the data we own.
///
/// The reply defaults to a refusal (`property = None`) and is upgraded
/// when we can serve the target.
pub fn on_selection_request(
    backend: &dyn SelectionBackend,
    atoms: &SelectionAtoms,
    state: &ClipboardState,
    event: &SelectionRequest,
) {
    // Obsolete requestors leave the property unset and expect the target
    // name to be used instead.
    let property = if event.property == NONE {
        event.target
    } else {
        event.property
    };

    let served = if !atoms.owned_selections().contains(&event.selection) {
        tracing::debug!(selection = event.selection, "SelectionRequest for a foreign selection");
        false
    } else if event.target == atoms.targets {
        tracing::debug!("requested supported targets");
        store(backend.change_property32(
            event.requestor,
            property,
            atoms.atom,
            &atoms.supported_targets(),
        ))
    } else if atoms.is_text_target(event.target) {
        state.with_owned(|owned| match owned {
            Some(text) => {
                tracing::debug!(target_atom = event.target, bytes = text.len(), "requested clipboard text");
                store(backend.change_property8(event.requestor, property, event.target, text))
            }
            None => {
                tracing::debug!("SelectionRequest received with no text");
                false
            }
        })
    } else {
        tracing::debug!(target_atom = event.target, "SelectionRequest for unsupported target");
        false
    };

    let reply = SelectionNotify {
        time: event.time,
        requestor: event.requestor,
        selection: event.selection,
        target: event.target,
        property: if served { property } else { NONE },
    };
    if let Err(e) = backend.send_selection_notify(reply) {
        tracing::warn!(error = %e, requestor = event.requestor, "failed to answer SelectionRequest");
    }
}

fn store(result: Result<(), crate::platform::PlatformError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "failed to write reply property");
            false
        }
    }
}
