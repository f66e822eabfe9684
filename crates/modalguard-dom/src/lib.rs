#![forbid(unsafe_code)]

//! Minimal retained host-document model for the modalguard controller.
//!
//! This crate stands in for the structured-document query and event APIs a
//! dialog controller needs from its host: a node tree with attributes and
//! class tokens, focus tracking, bubbling event dispatch, a listener
//! registry with RAII unbind guards, and a deferred-task queue that runs
//! once the current dispatch finishes propagating.
//!
//! Everything is single-threaded and cooperative; a [`Document`] handle is a
//! cheap clone over shared state and all transitions execute synchronously
//! inside the dispatch that caused them.

pub mod document;
pub mod event;
pub mod listener;

pub use document::{Capabilities, DomError, Document, NodeId};
pub use event::{Dispatch, EventCtx, EventPayload, EventType, KeyCode, KeyEvent, Modifiers};
pub use listener::{ListenerGuard, ListenerId, ListenerTarget};
