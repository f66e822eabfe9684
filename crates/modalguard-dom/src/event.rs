#![forbid(unsafe_code)]

//! Event types and the handler-side context.
//!
//! Two event types exist: [`EventType::KeyDown`], dispatched at document
//! level, and [`EventType::Activate`], a pointer activation dispatched at a
//! target node that bubbles up to the tree root. Handlers receive an
//! [`EventCtx`] giving access to the document, the original target, the node
//! currently handling the event, and `prevent_default()`.

use bitflags::bitflags;

use crate::document::{Document, NodeId};

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Key identity for a [`KeyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Escape,
    Tab,
    Enter,
    Char(char),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key event with no modifiers.
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Add the Shift modifier.
    pub fn shift(mut self) -> Self {
        self.modifiers |= Modifiers::SHIFT;
        self
    }

    /// Whether Shift is held.
    pub fn has_shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Listener registration key: which class of event a handler observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    Activate,
}

/// Event data carried through a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    Key(KeyEvent),
    Activate,
}

impl EventPayload {
    /// The registration key this payload is routed under.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Key(_) => EventType::KeyDown,
            Self::Activate => EventType::Activate,
        }
    }
}

/// Outcome of a completed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// Whether any handler called [`EventCtx::prevent_default`].
    pub default_prevented: bool,
}

/// Per-handler view of an in-flight event.
///
/// A fresh context is constructed for every handler invocation; the
/// `default_prevented` flag is shared across all handlers of one dispatch.
pub struct EventCtx<'a> {
    doc: &'a Document,
    target: Option<NodeId>,
    current: Option<NodeId>,
    payload: EventPayload,
    prevented: &'a mut bool,
}

impl<'a> EventCtx<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        target: Option<NodeId>,
        current: Option<NodeId>,
        payload: EventPayload,
        prevented: &'a mut bool,
    ) -> Self {
        Self {
            doc,
            target,
            current,
            payload,
            prevented,
        }
    }

    /// The document the event is dispatching through.
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// The node the event was originally dispatched at, if any.
    ///
    /// For key events this is the active element at dispatch time.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// The node whose listener is currently running (`None` for
    /// document-level listeners).
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// The event data.
    pub fn payload(&self) -> EventPayload {
        self.payload
    }

    /// The key event, if this is a key dispatch.
    pub fn key(&self) -> Option<KeyEvent> {
        match self.payload {
            EventPayload::Key(key) => Some(key),
            EventPayload::Activate => None,
        }
    }

    /// Suppress the host's default action for this event.
    pub fn prevent_default(&mut self) {
        *self.prevented = true;
    }
}
