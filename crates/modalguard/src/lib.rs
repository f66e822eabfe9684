#![forbid(unsafe_code)]

//! Accessible modal-dialog controller.
//!
//! Manages independently toggleable dialog containers on a document:
//! trapping keyboard focus inside the open dialog, keeping
//! assistive-technology attributes (`aria-hidden`, `role`) in sync with
//! visibility, and restoring focus to the triggering control on close.
//!
//! The hard part lives in two places: the focus-trap state machine
//! ([`focusable`] + the cyclic tab rule) and the lifecycle of the transient
//! event handlers that must exist only while exactly one dialog is open.
//! Only one dialog may be open at a time — that is a design constraint,
//! held as a single owned record inside the controller.
//!
//! Handlers bind one turn after opening so the activation that opened a
//! dialog cannot bubble into its own just-attached backdrop handler.
//!
//! See [`Dialogs`] for the entry point and a worked example.

pub mod a11y;
pub mod config;
mod controller;
pub mod focusable;
mod registry;
mod transient;

pub use config::{DialogOptions, OptionsError};
pub use focusable::FocusableSet;
pub use registry::Dialogs;

pub use modalguard_dom as dom;
