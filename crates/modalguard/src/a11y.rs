#![forbid(unsafe_code)]

//! Assistive-technology state toggling.
//!
//! A two-state toggler over the container/dialog-root pair: the container's
//! `aria-hidden` flag tracks visibility, and the dialog root carries a
//! semantic role only while open — `dialog` when content is operable,
//! `alertdialog` when the dialog is a non-interactive, action-demanding
//! announcement. Bootstrap hides every container before any open, with no
//! role assigned until the first open.

use modalguard_dom::{Document, NodeId};

/// Role for dialogs with operable content.
pub const ROLE_DIALOG: &str = "dialog";
/// Role for non-interactive, action-demanding dialogs.
pub const ROLE_ALERTDIALOG: &str = "alertdialog";

/// Mark the pair visible to assistive technology and assign the role.
pub fn activate(doc: &Document, container: NodeId, dialog_root: NodeId, interactive: bool) {
    let role = if interactive { ROLE_DIALOG } else { ROLE_ALERTDIALOG };
    doc.set_attribute(container, "aria-hidden", "false");
    doc.set_attribute(dialog_root, "role", role);
}

/// Mark the pair hidden again and clear the role.
pub fn deactivate(doc: &Document, container: NodeId, dialog_root: NodeId) {
    doc.set_attribute(container, "aria-hidden", "true");
    doc.remove_attribute(dialog_root, "role");
}

/// Hide a container before any open. No role is assigned here.
pub fn bootstrap_hidden(doc: &Document, container: NodeId) {
    doc.set_attribute(container, "aria-hidden", "true");
}

/// Remove every assistive-technology attribute this module manages,
/// returning the pair to its pre-`init` markup. Used by teardown only.
pub(crate) fn strip(doc: &Document, container: NodeId, dialog_root: Option<NodeId>) {
    doc.remove_attribute(container, "aria-hidden");
    if let Some(root) = dialog_root {
        doc.remove_attribute(root, "role");
    }
}
