#![forbid(unsafe_code)]

//! Retained document tree with event dispatch and deferred scheduling.
//!
//! [`Document`] is a cheap-to-clone handle over shared single-threaded state.
//! Nodes are addressed by [`NodeId`] handles issued by `create_element`; all
//! structural and attribute mutation goes through the document.
//!
//! # Invariants
//!
//! 1. `query_class` and `descendants` return nodes in document order
//!    (preorder, attached nodes only).
//! 2. The id index tracks the `id` attribute exactly: setting it indexes the
//!    node, removing or overwriting it updates the index.
//! 3. A listener removed during a dispatch is not invoked for the remainder
//!    of that dispatch.
//! 4. Deferred tasks run only once no dispatch is in flight: at the end of
//!    the outermost dispatch, or on an explicit [`Document::flush`]. Tasks
//!    queued by tasks run in the same drain.
//!
//! # Failure Modes
//!
//! - `append_child` refuses self-attachment, cycles, and re-parenting
//!   (returns [`DomError`]).
//! - `dispatch_activate` on a node detached from the tree returns
//!   [`DomError::Detached`].
//! - Passing a `NodeId` from a different document is a host bug and may
//!   panic or address an unrelated node.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ahash::AHashMap;
use bitflags::bitflags;

use crate::event::{Dispatch, EventCtx, EventPayload, EventType, KeyEvent};
use crate::listener::{EventHandler, ListenerGuard, ListenerId, ListenerRecord, ListenerTarget};

bitflags! {
    /// Host capabilities advertised by a document.
    ///
    /// A controller probes these before wiring itself up; a host lacking
    /// structured query or event registration gets a no-op controller. The
    /// in-memory document always implements both; the flags model the
    /// feature-detection gate of less capable hosts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Structured-document querying (`query_class`, `element_by_id`).
        const QUERY = 1 << 0;
        /// Event registration and dispatch.
        const EVENTS = 1 << 1;
    }
}

/// Errors from host-facing tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node is already attached to a parent")]
    AlreadyAttached,
    #[error("cannot attach a node under itself or its own descendant")]
    CircularAttachment,
    #[error("node is not attached to the document tree")]
    Detached,
}

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct NodeData {
    tag: String,
    attrs: AHashMap<String, String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    scroll_top: u32,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: AHashMap::new(),
            classes: Vec::new(),
            parent: None,
            children: Vec::new(),
            scroll_top: 0,
        }
    }
}

pub(crate) struct DocInner {
    nodes: Vec<NodeData>,
    root: NodeId,
    ids: AHashMap<String, NodeId>,
    active: Option<NodeId>,
    pub(crate) listeners: Vec<ListenerRecord>,
    next_listener: u64,
    tasks: VecDeque<Box<dyn FnOnce()>>,
    dispatch_depth: u32,
    caps: Capabilities,
}

/// Shared handle to a document. Cloning is cheap and aliases the same tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with a `body` root and full capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    /// Create a document advertising only the given capabilities.
    pub fn with_capabilities(caps: Capabilities) -> Self {
        let root = NodeId(0);
        let inner = DocInner {
            nodes: vec![NodeData::new("body")],
            root,
            ids: AHashMap::new(),
            active: None,
            listeners: Vec::new(),
            next_listener: 0,
            tasks: VecDeque::new(),
            dispatch_depth: 0,
            caps,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Capabilities advertised by this host.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.borrow().caps
    }

    /// The tree root.
    pub fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    // --- Tree construction ---

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len() as u32);
        inner.nodes.push(NodeData::new(tag));
        id
    }

    /// Attach `child` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if inner.nodes[child.index()].parent.is_some() {
            return Err(DomError::AlreadyAttached);
        }
        // Walk up from `parent`; hitting `child` would create a cycle.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(DomError::CircularAttachment);
            }
            cursor = inner.nodes[node.index()].parent;
        }
        inner.nodes[child.index()].parent = Some(parent);
        inner.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Tag name of a node (lowercase).
    pub fn tag(&self, node: NodeId) -> String {
        self.inner.borrow().nodes[node.index()].tag.clone()
    }

    /// Parent of a node, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes[node.index()].parent
    }

    /// Children of a node, in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.borrow().nodes[node.index()].children.clone()
    }

    /// Descendants of `node` in document order (preorder), excluding `node`
    /// itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner.nodes[node.index()]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(inner.nodes[next.index()].children.iter().rev().copied());
        }
        out
    }

    // --- Attributes and classes ---

    /// Set an attribute. Setting `id` updates the id index.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        if name == "id" {
            if let Some(old) = inner.nodes[node.index()].attrs.get("id").cloned() {
                inner.ids.remove(&old);
            }
            inner.ids.insert(value.to_owned(), node);
        }
        inner.nodes[node.index()]
            .attrs
            .insert(name.to_owned(), value.to_owned());
    }

    /// Read an attribute value.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner.borrow().nodes[node.index()].attrs.get(name).cloned()
    }

    /// Whether the attribute is present (any value, including empty).
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner.borrow().nodes[node.index()].attrs.contains_key(name)
    }

    /// Remove an attribute. Removing `id` drops the index entry.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(value) = inner.nodes[node.index()].attrs.remove(name)
            && name == "id"
        {
            inner.ids.remove(&value);
        }
    }

    /// Add a class token (no-op if already present).
    pub fn add_class(&self, node: NodeId, token: &str) {
        let mut inner = self.inner.borrow_mut();
        let classes = &mut inner.nodes[node.index()].classes;
        if !classes.iter().any(|c| c == token) {
            classes.push(token.to_owned());
        }
    }

    /// Remove a class token.
    pub fn remove_class(&self, node: NodeId, token: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.nodes[node.index()].classes.retain(|c| c != token);
    }

    /// Whether the node carries a class token.
    pub fn has_class(&self, node: NodeId, token: &str) -> bool {
        self.inner.borrow().nodes[node.index()]
            .classes
            .iter()
            .any(|c| c == token)
    }

    // --- Queries ---

    /// Look up a node by its `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.inner.borrow().ids.get(id).copied()
    }

    /// Attached nodes carrying a class token, in document order. `scope`
    /// limits the search to descendants of the given node (excluding the
    /// node itself); `None` searches the whole tree.
    pub fn query_class(&self, scope: Option<NodeId>, token: &str) -> Vec<NodeId> {
        let start = scope.unwrap_or_else(|| self.root());
        self.descendants(start)
            .into_iter()
            .filter(|n| self.has_class(*n, token))
            .collect()
    }

    // --- Focus and scroll ---

    /// Move keyboard focus to a node.
    pub fn focus(&self, node: NodeId) {
        self.inner.borrow_mut().active = Some(node);
    }

    /// Clear keyboard focus.
    pub fn blur(&self) {
        self.inner.borrow_mut().active = None;
    }

    /// The currently focused node.
    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.borrow().active
    }

    /// Vertical scroll offset of a node.
    pub fn scroll_top(&self, node: NodeId) -> u32 {
        self.inner.borrow().nodes[node.index()].scroll_top
    }

    /// Set the vertical scroll offset of a node.
    pub fn set_scroll_top(&self, node: NodeId, offset: u32) {
        self.inner.borrow_mut().nodes[node.index()].scroll_top = offset;
    }

    // --- Listeners ---

    /// Bind a handler on a node. Activations targeting the node or bubbling
    /// through it invoke the handler.
    pub fn bind(
        &self,
        node: NodeId,
        event_type: EventType,
        handler: impl Fn(&mut EventCtx<'_>) + 'static,
    ) -> ListenerGuard {
        self.bind_target(ListenerTarget::Node(node), event_type, Rc::new(handler))
    }

    /// Bind a document-level handler; it observes every dispatch of the
    /// event type.
    pub fn bind_document(
        &self,
        event_type: EventType,
        handler: impl Fn(&mut EventCtx<'_>) + 'static,
    ) -> ListenerGuard {
        self.bind_target(ListenerTarget::Document, event_type, Rc::new(handler))
    }

    fn bind_target(
        &self,
        target: ListenerTarget,
        event_type: EventType,
        handler: EventHandler,
    ) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.push(ListenerRecord {
            id,
            target,
            event_type,
            handler,
        });
        ListenerGuard::new(Rc::downgrade(&self.inner), id)
    }

    /// Number of live listener registrations (all targets, all types).
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    // --- Deferred tasks ---

    /// Queue a task to run after the current dispatch finishes propagating
    /// (or on the next [`Document::flush`] if none is in flight).
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().tasks.push_back(Box::new(task));
    }

    /// Drain deferred tasks now. No-op while a dispatch is in flight (the
    /// dispatch epilogue drains instead).
    pub fn flush(&self) {
        if self.inner.borrow().dispatch_depth == 0 {
            self.drain_tasks();
        }
    }

    /// Whether tasks are waiting for the next turn.
    pub fn has_pending_tasks(&self) -> bool {
        !self.inner.borrow().tasks.is_empty()
    }

    fn drain_tasks(&self) {
        loop {
            let task = self.inner.borrow_mut().tasks.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    // --- Dispatch ---

    /// Dispatch a key event to document-level `KeyDown` listeners.
    ///
    /// The active element at dispatch time is reported as the target.
    /// Returns immediately if the host lacks [`Capabilities::EVENTS`].
    pub fn dispatch_key(&self, key: KeyEvent) -> Dispatch {
        if !self.capabilities().contains(Capabilities::EVENTS) {
            return Dispatch::default();
        }
        self.begin_dispatch();
        let mut prevented = false;
        let target = self.active_element();
        self.invoke(
            ListenerTarget::Document,
            EventType::KeyDown,
            target,
            EventPayload::Key(key),
            &mut prevented,
        );
        self.end_dispatch();
        Dispatch {
            default_prevented: prevented,
        }
    }

    /// Dispatch a pointer activation at `target`, bubbling from the target
    /// through its ancestors to the root, then to document-level listeners.
    pub fn dispatch_activate(&self, target: NodeId) -> Result<Dispatch, DomError> {
        if !self.capabilities().contains(Capabilities::EVENTS) {
            return Ok(Dispatch::default());
        }
        let path = self.bubble_path(target)?;
        self.begin_dispatch();
        let mut prevented = false;
        for node in path {
            self.invoke(
                ListenerTarget::Node(node),
                EventType::Activate,
                Some(target),
                EventPayload::Activate,
                &mut prevented,
            );
        }
        self.invoke(
            ListenerTarget::Document,
            EventType::Activate,
            Some(target),
            EventPayload::Activate,
            &mut prevented,
        );
        self.end_dispatch();
        Ok(Dispatch {
            default_prevented: prevented,
        })
    }

    /// Target-to-root chain, erroring if `target` is not attached.
    fn bubble_path(&self, target: NodeId) -> Result<Vec<NodeId>, DomError> {
        let inner = self.inner.borrow();
        let mut path = vec![target];
        let mut cursor = target;
        while let Some(parent) = inner.nodes[cursor.index()].parent {
            path.push(parent);
            cursor = parent;
        }
        if cursor != inner.root {
            return Err(DomError::Detached);
        }
        Ok(path)
    }

    fn invoke(
        &self,
        listener_target: ListenerTarget,
        event_type: EventType,
        target: Option<NodeId>,
        payload: EventPayload,
        prevented: &mut bool,
    ) {
        // Snapshot first so handlers may bind and unbind freely; skip any
        // listener that was removed by an earlier handler of this dispatch.
        let snapshot: Vec<(ListenerId, EventHandler)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.target == listener_target && l.event_type == event_type)
            .map(|l| (l.id, Rc::clone(&l.handler)))
            .collect();
        let current = match listener_target {
            ListenerTarget::Node(node) => Some(node),
            ListenerTarget::Document => None,
        };
        for (id, handler) in snapshot {
            let still_bound = self.inner.borrow().listeners.iter().any(|l| l.id == id);
            if !still_bound {
                continue;
            }
            let mut ctx = EventCtx::new(self, target, current, payload, prevented);
            handler(&mut ctx);
        }
    }

    fn begin_dispatch(&self) {
        self.inner.borrow_mut().dispatch_depth += 1;
    }

    fn end_dispatch(&self) {
        let depth = {
            let mut inner = self.inner.borrow_mut();
            inner.dispatch_depth -= 1;
            inner.dispatch_depth
        };
        if depth == 0 {
            self.drain_tasks();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyCode;
    use std::cell::Cell;

    fn fixture() -> (Document, NodeId, NodeId, NodeId) {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let button = doc.create_element("button");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(inner, button).unwrap();
        (doc, outer, inner, button)
    }

    #[test]
    fn append_rejects_reparenting() {
        let (doc, outer, _, button) = fixture();
        assert_eq!(
            doc.append_child(outer, button),
            Err(DomError::AlreadyAttached)
        );
    }

    #[test]
    fn append_rejects_cycles() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.append_child(a, b).unwrap();
        assert_eq!(doc.append_child(b, a), Err(DomError::CircularAttachment));
        assert_eq!(doc.append_child(a, a), Err(DomError::CircularAttachment));
    }

    #[test]
    fn descendants_preorder() {
        let (doc, outer, inner, button) = fixture();
        let sibling = doc.create_element("p");
        doc.append_child(outer, sibling).unwrap();
        assert_eq!(doc.descendants(doc.root()), vec![outer, inner, button, sibling]);
        assert_eq!(doc.descendants(outer), vec![inner, button, sibling]);
        assert_eq!(doc.descendants(button), vec![]);
    }

    #[test]
    fn id_index_follows_attribute() {
        let (doc, outer, inner, _) = fixture();
        doc.set_attribute(outer, "id", "first");
        assert_eq!(doc.element_by_id("first"), Some(outer));

        doc.set_attribute(outer, "id", "renamed");
        assert_eq!(doc.element_by_id("first"), None);
        assert_eq!(doc.element_by_id("renamed"), Some(outer));

        doc.set_attribute(inner, "id", "second");
        doc.remove_attribute(inner, "id");
        assert_eq!(doc.element_by_id("second"), None);
    }

    #[test]
    fn query_class_scoped_and_ordered() {
        let (doc, outer, inner, button) = fixture();
        doc.add_class(outer, "hit");
        doc.add_class(button, "hit");
        assert_eq!(doc.query_class(None, "hit"), vec![outer, button]);
        assert_eq!(doc.query_class(Some(outer), "hit"), vec![button]);
        assert_eq!(doc.query_class(Some(inner), "miss"), vec![]);
    }

    #[test]
    fn class_tokens_dedupe() {
        let (doc, outer, ..) = fixture();
        doc.add_class(outer, "x");
        doc.add_class(outer, "x");
        doc.remove_class(outer, "x");
        assert!(!doc.has_class(outer, "x"));
    }

    #[test]
    fn activation_bubbles_target_first() {
        let (doc, outer, inner, button) = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        let _g1 = doc.bind(button, EventType::Activate, move |ctx| {
            o.borrow_mut().push(("button", ctx.target()));
        });
        let o = Rc::clone(&order);
        let _g2 = doc.bind(outer, EventType::Activate, move |ctx| {
            o.borrow_mut().push(("outer", ctx.target()));
        });
        let o = Rc::clone(&order);
        let _g3 = doc.bind(inner, EventType::Activate, move |ctx| {
            o.borrow_mut().push(("inner", ctx.target()));
        });

        doc.dispatch_activate(button).unwrap();
        let seen = order.borrow();
        assert_eq!(
            *seen,
            vec![
                ("button", Some(button)),
                ("inner", Some(button)),
                ("outer", Some(button)),
            ]
        );
    }

    #[test]
    fn activation_on_detached_node_errors() {
        let doc = Document::new();
        let stray = doc.create_element("div");
        assert_eq!(doc.dispatch_activate(stray), Err(DomError::Detached));
    }

    #[test]
    fn guard_drop_unbinds() {
        let (doc, _, _, button) = fixture();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let guard = doc.bind(button, EventType::Activate, move |_| {
            h.set(h.get() + 1);
        });
        assert_eq!(doc.listener_count(), 1);

        doc.dispatch_activate(button).unwrap();
        drop(guard);
        assert_eq!(doc.listener_count(), 0);

        doc.dispatch_activate(button).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let (doc, _, _, button) = fixture();
        let second_ran = Rc::new(Cell::new(false));

        let slot: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));
        let slot_in_handler = Rc::clone(&slot);
        let _g1 = doc.bind(button, EventType::Activate, move |_| {
            // Unbind the other listener while the dispatch is running.
            slot_in_handler.borrow_mut().take();
        });
        let flag = Rc::clone(&second_ran);
        let g2 = doc.bind(button, EventType::Activate, move |_| {
            flag.set(true);
        });
        *slot.borrow_mut() = Some(g2);

        doc.dispatch_activate(button).unwrap();
        assert!(!second_ran.get());
    }

    #[test]
    fn prevent_default_reported() {
        let doc = Document::new();
        let _g = doc.bind_document(EventType::KeyDown, |ctx| ctx.prevent_default());
        let outcome = doc.dispatch_key(KeyEvent::new(KeyCode::Tab));
        assert!(outcome.default_prevented);

        let plain = Document::new();
        let _g = plain.bind_document(EventType::KeyDown, |_| {});
        assert!(!plain.dispatch_key(KeyEvent::new(KeyCode::Tab)).default_prevented);
    }

    #[test]
    fn deferred_tasks_run_after_dispatch() {
        let (doc, _, _, button) = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        let doc_in_handler = doc.clone();
        let _g = doc.bind(button, EventType::Activate, move |_| {
            let l2 = Rc::clone(&l);
            doc_in_handler.defer(move || l2.borrow_mut().push("deferred"));
            l.borrow_mut().push("handler");
        });

        doc.dispatch_activate(button).unwrap();
        assert_eq!(*log.borrow(), vec!["handler", "deferred"]);
    }

    #[test]
    fn deferred_tasks_wait_for_outermost_dispatch() {
        let (doc, outer, _, button) = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        let doc2 = doc.clone();
        let _g1 = doc.bind(button, EventType::Activate, move |_| {
            let l2 = Rc::clone(&l);
            doc2.defer(move || l2.borrow_mut().push("deferred"));
            // Nested dispatch must not drain the queue early.
            doc2.dispatch_activate(outer).unwrap();
            l.borrow_mut().push("after-nested");
        });

        doc.dispatch_activate(button).unwrap();
        assert_eq!(*log.borrow(), vec!["after-nested", "deferred"]);
    }

    #[test]
    fn flush_drains_queued_tasks() {
        let doc = Document::new();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        doc.defer(move || r.set(true));
        assert!(doc.has_pending_tasks());
        doc.flush();
        assert!(ran.get());
        assert!(!doc.has_pending_tasks());
    }

    #[test]
    fn tasks_queued_by_tasks_run_in_same_flush() {
        let doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let doc2 = doc.clone();
        doc.defer(move || {
            let l2 = Rc::clone(&l);
            doc2.defer(move || l2.borrow_mut().push("second"));
            l.borrow_mut().push("first");
        });
        doc.flush();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn restricted_capabilities_disable_dispatch() {
        let doc = Document::with_capabilities(Capabilities::QUERY);
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        let _g = doc.bind_document(EventType::KeyDown, move |_| h.set(true));
        doc.dispatch_key(KeyEvent::new(KeyCode::Escape));
        assert!(!hit.get());
    }

    #[test]
    fn focus_and_scroll_state() {
        let (doc, _, inner, button) = fixture();
        assert_eq!(doc.active_element(), None);
        doc.focus(button);
        assert_eq!(doc.active_element(), Some(button));
        doc.blur();
        assert_eq!(doc.active_element(), None);

        doc.set_scroll_top(inner, 42);
        assert_eq!(doc.scroll_top(inner), 42);
    }
}
