#![forbid(unsafe_code)]

//! Registry and bootstrap: discovery, trigger wiring, and teardown.

use std::cell::RefCell;
use std::rc::Rc;

use modalguard_dom::{Capabilities, Document, EventType, ListenerGuard, NodeId};

use crate::a11y;
use crate::config::{DialogOptions, OptionsError};
use crate::controller::{self, ControllerState, DialogInstance, Shared};

/// Accessible modal-dialog controller over a host document.
///
/// Discovers dialog containers by marker class, wires their open triggers,
/// keeps assistive-technology attributes in sync with visibility, traps
/// keyboard focus inside the open dialog, and restores focus to the
/// triggering control on close.
///
/// # Example
///
/// ```
/// use modalguard::{DialogOptions, Dialogs};
/// use modalguard_dom::Document;
///
/// let doc = Document::new();
/// let container = doc.create_element("div");
/// doc.add_class(container, "js-dialogmodal");
/// doc.set_attribute(container, "id", "greeting");
/// let modal = doc.create_element("div");
/// doc.add_class(modal, "js-dialogmodal-modal");
/// let close = doc.create_element("button");
/// doc.add_class(close, "js-dialogmodal-close");
/// let trigger = doc.create_element("button");
/// doc.add_class(trigger, "js-dialogmodal-open");
/// doc.set_attribute(trigger, "aria-controls", "greeting");
/// doc.append_child(doc.root(), container).unwrap();
/// doc.append_child(container, modal).unwrap();
/// doc.append_child(modal, close).unwrap();
/// doc.append_child(doc.root(), trigger).unwrap();
///
/// let dialogs = Dialogs::new(&doc, DialogOptions::default()).unwrap();
/// dialogs.init();
/// doc.dispatch_activate(trigger).unwrap();
/// assert!(dialogs.is_open());
/// ```
pub struct Dialogs {
    shared: Shared,
    inert: bool,
}

impl Dialogs {
    /// Create a controller over `doc`.
    ///
    /// If the host lacks [`Capabilities::QUERY`] or [`Capabilities::EVENTS`]
    /// the controller is inert: every call becomes a no-op and no partial
    /// initialization happens.
    pub fn new(doc: &Document, options: DialogOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let inert = !doc
            .capabilities()
            .contains(Capabilities::QUERY | Capabilities::EVENTS);
        if inert {
            tracing::debug!("host lacks query/event capabilities; controller is inert");
        }
        let state = ControllerState {
            doc: doc.clone(),
            options,
            instances: Vec::new(),
            open: None,
            session: 0,
            trigger_guards: Vec::new(),
            initialized: false,
        };
        Ok(Self {
            shared: Rc::new(RefCell::new(state)),
            inert,
        })
    }

    /// Discover containers and wire their open triggers. Idempotent; a
    /// document without matching containers leaves the controller untouched.
    pub fn init(&self) {
        if self.inert {
            return;
        }
        let (doc, options) = {
            let state = self.shared.borrow();
            if state.initialized {
                tracing::debug!("init ignored: already initialized");
                return;
            }
            (state.doc.clone(), state.options.clone())
        };

        let containers = doc.query_class(None, &options.container_marker);
        if containers.is_empty() {
            tracing::debug!(marker = %options.container_marker, "no dialog containers found");
            return;
        }

        let mut instances = Vec::with_capacity(containers.len());
        let mut trigger_guards = Vec::new();
        for (index, container) in containers.into_iter().enumerate() {
            let instance = discover(&doc, container, &options);
            a11y::bootstrap_hidden(&doc, container);
            doc.add_class(container, &options.ready_class);
            for trigger in &instance.triggers {
                trigger_guards.push(bind_trigger(&doc, &self.shared, *trigger, index));
            }
            instances.push(instance);
        }

        let mut state = self.shared.borrow_mut();
        tracing::debug!(
            containers = instances.len(),
            triggers = trigger_guards.len(),
            "dialog registry initialized"
        );
        state.instances = instances;
        state.trigger_guards = trigger_guards;
        state.initialized = true;
    }

    /// Tear everything down: close an open dialog without returning focus,
    /// strip assistive-technology attributes and style hooks, and unbind
    /// all triggers. The controller can be `init`-ed again afterwards with
    /// no residual listeners.
    pub fn destroy(&self) {
        if self.inert {
            return;
        }
        controller::close(&self.shared, false);

        let (doc, instances, options, guards) = {
            let mut state = self.shared.borrow_mut();
            if !state.initialized {
                return;
            }
            state.initialized = false;
            (
                state.doc.clone(),
                std::mem::take(&mut state.instances),
                state.options.clone(),
                std::mem::take(&mut state.trigger_guards),
            )
        };

        for instance in &instances {
            a11y::strip(&doc, instance.container, instance.root);
            if let Some(root) = instance.root {
                doc.remove_attribute(root, "tabindex");
            }
            doc.remove_class(instance.container, &options.ready_class);
            doc.remove_class(instance.container, &options.active_class);
        }
        drop(guards);
        tracing::debug!(containers = instances.len(), "dialog registry destroyed");
    }

    /// Open the dialog whose container carries the given id, as if a
    /// trigger had been activated. The active element at call time becomes
    /// the focus-return target. Returns whether an open was initiated (an
    /// already-open dialog or unknown id is a no-op).
    pub fn open_by_id(&self, container_id: &str) -> bool {
        if self.inert {
            return false;
        }
        let (index, trigger) = {
            let state = self.shared.borrow();
            let Some(index) = state
                .instances
                .iter()
                .position(|inst| inst.container_id.as_deref() == Some(container_id))
            else {
                tracing::debug!(container_id, "open_by_id: no such container");
                return false;
            };
            if state.open.is_some() {
                return false;
            }
            (index, state.doc.active_element())
        };
        controller::open(&self.shared, trigger, index);
        true
    }

    /// Close the open dialog, optionally returning focus to the control
    /// that opened it. Returns whether a dialog was closed.
    pub fn close(&self, return_focus: bool) -> bool {
        if self.inert {
            return false;
        }
        controller::close(&self.shared, return_focus)
    }

    /// Whether a dialog is currently open.
    pub fn is_open(&self) -> bool {
        !self.inert && self.shared.borrow().open.is_some()
    }

    /// Container id of the open dialog, if one is open and has an id.
    pub fn open_container_id(&self) -> Option<String> {
        if self.inert {
            return None;
        }
        let state = self.shared.borrow();
        let open = state.open.as_ref()?;
        state.instances[open.instance].container_id.clone()
    }
}

/// Build one instance record from a container's markup.
fn discover(doc: &Document, container: NodeId, options: &DialogOptions) -> DialogInstance {
    let container_id = doc.attribute(container, "id");
    let root = doc
        .query_class(Some(container), &options.modal_marker)
        .into_iter()
        .next();
    let interactive = match doc
        .attribute(container, "data-dialog-interactive")
        .as_deref()
    {
        Some("true") => true,
        Some("false") => false,
        _ => options.interactive,
    };
    let triggers = match container_id.as_deref() {
        Some(id) => doc
            .query_class(None, &options.open_marker)
            .into_iter()
            .filter(|n| doc.attribute(*n, "aria-controls").as_deref() == Some(id))
            .collect(),
        None => Vec::new(),
    };
    DialogInstance {
        container,
        root,
        container_id,
        interactive,
        triggers,
    }
}

fn bind_trigger(doc: &Document, shared: &Shared, trigger: NodeId, instance: usize) -> ListenerGuard {
    let weak = Rc::downgrade(shared);
    doc.bind(trigger, EventType::Activate, move |_ctx| {
        if let Some(shared) = weak.upgrade() {
            controller::open(&shared, Some(trigger), instance);
        }
    })
}
