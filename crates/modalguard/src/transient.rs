#![forbid(unsafe_code)]

//! Transient listener attachment.
//!
//! These handlers exist only between a dialog opening and closing:
//!
//! - document-level keydown: Escape closes, Tab runs the cyclic rule;
//! - close-control activation: closes;
//! - container activation (non-interactive dialogs only): closes iff the
//!   activation target is the container itself — a click landing on the
//!   dialog body or anything inside it bubbles through the container but
//!   must not close.
//!
//! Detachment is dropping the returned guards; there is no explicit unbind
//! call to forget.

use std::rc::Rc;

use modalguard_dom::{Document, EventType, KeyCode, ListenerGuard, NodeId};

use crate::controller::{self, Shared};

/// Bind the transient handler set for one open session.
///
/// # Panics
///
/// Panics if the dialog root contains no close control matching
/// `close_marker` (markup-contract fault, surfaced on first interaction).
pub(crate) fn attach(
    doc: &Document,
    shared: &Shared,
    container: NodeId,
    root: NodeId,
    interactive: bool,
    close_marker: &str,
) -> Vec<ListenerGuard> {
    let mut guards = Vec::with_capacity(3);

    let weak = Rc::downgrade(shared);
    guards.push(doc.bind_document(EventType::KeyDown, move |ctx| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let Some(key) = ctx.key() else {
            return;
        };
        match key.code {
            KeyCode::Escape => {
                controller::close(&shared, true);
            }
            KeyCode::Tab => controller::handle_tab(&shared, key.has_shift(), ctx),
            _ => {}
        }
    }));

    let close_control = doc
        .query_class(Some(root), close_marker)
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("dialog root has no close control matching `{close_marker}`"));
    let weak = Rc::downgrade(shared);
    guards.push(doc.bind(close_control, EventType::Activate, move |_ctx| {
        if let Some(shared) = weak.upgrade() {
            controller::close(&shared, true);
        }
    }));

    if !interactive {
        let weak = Rc::downgrade(shared);
        guards.push(doc.bind(container, EventType::Activate, move |ctx| {
            // Backdrop only: a descendant target means the activation landed
            // inside the dialog body.
            if ctx.target() != Some(container) {
                return;
            }
            if let Some(shared) = weak.upgrade() {
                controller::close(&shared, true);
            }
        }));
    }

    tracing::debug!(count = guards.len(), interactive, "transient listeners attached");
    guards
}
