#![forbid(unsafe_code)]

//! Listener registry types.
//!
//! Binding a handler returns a [`ListenerGuard`], an RAII value that removes
//! the registration when dropped. A listener removed while a dispatch is in
//! flight is not invoked for the remainder of that dispatch.

use core::fmt;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::document::{DocInner, NodeId};
use crate::event::{EventCtx, EventType};

/// Boxed handler invoked for each matching dispatch.
pub type EventHandler = Rc<dyn Fn(&mut EventCtx<'_>)>;

/// Unique identity of one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Where a listener is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTarget {
    /// Document level: sees every dispatch of its event type.
    Document,
    /// A specific node: sees activations targeting the node or bubbling
    /// through it.
    Node(NodeId),
}

pub(crate) struct ListenerRecord {
    pub(crate) id: ListenerId,
    pub(crate) target: ListenerTarget,
    pub(crate) event_type: EventType,
    pub(crate) handler: EventHandler,
}

/// Owns one listener registration; unbinds on drop.
///
/// Dropping the guard after the document is gone is a no-op.
pub struct ListenerGuard {
    doc: Weak<RefCell<DocInner>>,
    id: ListenerId,
}

impl ListenerGuard {
    pub(crate) fn new(doc: Weak<RefCell<DocInner>>, id: ListenerId) -> Self {
        Self { doc, id }
    }

    /// Identity of the registration this guard owns.
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.doc.upgrade() {
            inner.borrow_mut().listeners.retain(|l| l.id != self.id);
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}
