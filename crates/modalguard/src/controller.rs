#![forbid(unsafe_code)]

//! Dialog lifecycle state machine.
//!
//! Two states, Closed and Open, transitioning only through explicit user or
//! API action. The single "currently open dialog" record ([`OpenState`]) is
//! an explicit owned value inside the controller state — one dialog at a
//! time is a design constraint, and keeping the record owned (not ambient)
//! lets tests inject and inspect it.
//!
//! # Invariants
//!
//! 1. At most one dialog is open; `open` while Open is a silent no-op (the
//!    first dialog stays open, nothing leaks).
//! 2. Transient listeners exist iff a dialog is open. Attachment is
//!    deferred one turn, so the record carries a session number; a close
//!    racing the pending attachment invalidates it.
//! 3. The focusable set is resolved fresh on every open, never reused.

use std::cell::RefCell;
use std::rc::Rc;

use modalguard_dom::{Document, EventCtx, ListenerGuard, NodeId};

use crate::config::DialogOptions;
use crate::focusable::{self, FocusableSet};
use crate::{a11y, transient};

pub(crate) type Shared = Rc<RefCell<ControllerState>>;

/// One discovered dialog: container/dialog-root pair plus its triggers.
/// Immutable after discovery.
pub(crate) struct DialogInstance {
    pub(crate) container: NodeId,
    /// Resolved at discovery when present; its absence is a markup fault
    /// surfaced on first open, not at `init`.
    pub(crate) root: Option<NodeId>,
    pub(crate) container_id: Option<String>,
    pub(crate) interactive: bool,
    pub(crate) triggers: Vec<NodeId>,
}

/// The currently open dialog. Created on open, cleared on close.
pub(crate) struct OpenState {
    pub(crate) instance: usize,
    /// Trigger that opened the dialog; `None` for API-driven opens with no
    /// focused element to return to.
    pub(crate) trigger: Option<NodeId>,
    pub(crate) focusables: FocusableSet,
    pub(crate) tab_disallowed: bool,
    pub(crate) session: u64,
    pub(crate) transient: Vec<ListenerGuard>,
}

pub(crate) struct ControllerState {
    pub(crate) doc: Document,
    pub(crate) options: DialogOptions,
    pub(crate) instances: Vec<DialogInstance>,
    pub(crate) open: Option<OpenState>,
    pub(crate) session: u64,
    pub(crate) trigger_guards: Vec<ListenerGuard>,
    pub(crate) initialized: bool,
}

/// Open transition.
///
/// # Panics
///
/// Panics if the instance's container has no dialog root matching the
/// configured marker (markup-contract fault).
pub(crate) fn open(shared: &Shared, trigger: Option<NodeId>, instance: usize) {
    let (doc, container, root, interactive, active_class, session) = {
        let mut state = shared.borrow_mut();
        if state.open.is_some() {
            tracing::debug!("open ignored: a dialog is already open");
            return;
        }
        state.session += 1;
        let inst = &state.instances[instance];
        let root = inst.root.unwrap_or_else(|| {
            panic!(
                "dialog container has no dialog root matching `{}`",
                state.options.modal_marker
            )
        });
        (
            state.doc.clone(),
            inst.container,
            root,
            inst.interactive,
            state.options.active_class.clone(),
            state.session,
        )
    };

    a11y::activate(&doc, container, root, interactive);
    doc.set_attribute(root, "tabindex", "-1");
    doc.focus(root);
    doc.set_scroll_top(root, 0);
    doc.add_class(container, &active_class);

    let focusables = focusable::resolve(&doc, root);
    let tab_disallowed = focusables.len() < 2;
    tracing::debug!(
        focusable = focusables.len(),
        interactive,
        "dialog opened"
    );

    shared.borrow_mut().open = Some(OpenState {
        instance,
        trigger,
        focusables,
        tab_disallowed,
        session,
        transient: Vec::new(),
    });

    // Transient handlers attach on the next turn so the activation that
    // opened the dialog cannot bubble into a just-attached backdrop handler.
    let weak = Rc::downgrade(shared);
    doc.defer(move || attach_pending(&weak, session));
}

/// Run the deferred transient attachment, unless the session it was queued
/// for has already closed.
fn attach_pending(weak: &std::rc::Weak<RefCell<ControllerState>>, session: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let (doc, container, root, interactive, close_marker) = {
        let state = shared.borrow();
        let Some(open) = state.open.as_ref() else {
            tracing::debug!("pending transient attach cancelled: dialog closed");
            return;
        };
        if open.session != session {
            tracing::debug!("pending transient attach superseded");
            return;
        }
        let inst = &state.instances[open.instance];
        (
            state.doc.clone(),
            inst.container,
            inst.root.expect("an open dialog always has a resolved root"),
            inst.interactive,
            state.options.close_marker.clone(),
        )
    };

    let guards = transient::attach(&doc, &shared, container, root, interactive, &close_marker);

    let mut state = shared.borrow_mut();
    match state.open.as_mut() {
        Some(open) if open.session == session => open.transient = guards,
        // Closed while attaching; dropping the guards unbinds immediately.
        _ => {}
    }
}

/// Close transition. Returns whether a dialog was actually closed.
pub(crate) fn close(shared: &Shared, return_focus: bool) -> bool {
    let (doc, open, container, root, active_class) = {
        let mut state = shared.borrow_mut();
        let Some(open) = state.open.take() else {
            tracing::debug!("close ignored: no dialog is open");
            return false;
        };
        let inst = &state.instances[open.instance];
        (
            state.doc.clone(),
            open,
            inst.container,
            inst.root.expect("an open dialog always has a resolved root"),
            state.options.active_class.clone(),
        )
    };

    a11y::deactivate(&doc, container, root);
    doc.remove_attribute(root, "tabindex");
    doc.remove_class(container, &active_class);

    let OpenState {
        trigger, transient, ..
    } = open;
    let detached = transient.len();
    drop(transient);
    tracing::debug!(detached, "transient listeners detached");

    if return_focus
        && let Some(trigger) = trigger
    {
        doc.focus(trigger);
    }
    tracing::debug!(return_focus, "dialog closed");
    true
}

/// Cyclic tab rule, invoked by the transient key handler while Open.
///
/// Wraps focus at the boundaries of the focusable set and suppresses the
/// host's default navigation when it does. With fewer than two members
/// there is nowhere cyclic to go, so every Tab is suppressed outright.
pub(crate) fn handle_tab(shared: &Shared, shift: bool, ctx: &mut EventCtx<'_>) {
    let state = shared.borrow();
    let Some(open) = state.open.as_ref() else {
        return;
    };
    if open.tab_disallowed {
        ctx.prevent_default();
        return;
    }
    let doc = &state.doc;
    let position = doc
        .active_element()
        .and_then(|node| open.focusables.position(node));
    if shift && position == Some(0) {
        if let Some(last) = open.focusables.last() {
            doc.focus(last);
        }
        tracing::trace!("tab wrapped to last focusable");
        ctx.prevent_default();
    } else if !shift && position == Some(open.focusables.len() - 1) {
        if let Some(first) = open.focusables.first() {
            doc.focus(first);
        }
        tracing::trace!("tab wrapped to first focusable");
        ctx.prevent_default();
    }
}
