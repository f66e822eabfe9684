#![forbid(unsafe_code)]

//! Construction-time configuration.

use thiserror::Error;

/// Invalid [`DialogOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// A marker or style-hook token was empty.
    #[error("`{0}` must not be empty")]
    EmptyToken(&'static str),
}

/// Options for a [`Dialogs`](crate::Dialogs) controller.
///
/// Markup roles are identified by class tokens rather than a selector
/// engine: a container carries `container_marker`, the dialog surface
/// inside it carries `modal_marker`, open triggers carry `open_marker`
/// plus an `aria-controls` attribute naming their container's id, and the
/// close control inside the dialog carries `close_marker`.
///
/// `ready_class` and `active_class` are style hooks only; they are added
/// and removed for external styling and have no behavioral effect.
#[derive(Debug, Clone)]
pub struct DialogOptions {
    pub container_marker: String,
    pub modal_marker: String,
    pub open_marker: String,
    pub close_marker: String,
    /// Whether dialog content is operable (role `dialog`) or a pure
    /// announcement (role `alertdialog`, backdrop click closes).
    pub interactive: bool,
    pub ready_class: String,
    pub active_class: String,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            container_marker: "js-dialogmodal".to_owned(),
            modal_marker: "js-dialogmodal-modal".to_owned(),
            open_marker: "js-dialogmodal-open".to_owned(),
            close_marker: "js-dialogmodal-close".to_owned(),
            interactive: false,
            ready_class: "dialogmodal-is-ready".to_owned(),
            active_class: "dialogmodal-is-active".to_owned(),
        }
    }
}

impl DialogOptions {
    /// Set the container marker token.
    pub fn container_marker(mut self, token: impl Into<String>) -> Self {
        self.container_marker = token.into();
        self
    }

    /// Set the dialog-root marker token.
    pub fn modal_marker(mut self, token: impl Into<String>) -> Self {
        self.modal_marker = token.into();
        self
    }

    /// Set the open-trigger marker token.
    pub fn open_marker(mut self, token: impl Into<String>) -> Self {
        self.open_marker = token.into();
        self
    }

    /// Set the close-control marker token.
    pub fn close_marker(mut self, token: impl Into<String>) -> Self {
        self.close_marker = token.into();
        self
    }

    /// Set whether dialog content is interactive.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Set the ready style hook.
    pub fn ready_class(mut self, token: impl Into<String>) -> Self {
        self.ready_class = token.into();
        self
    }

    /// Set the active style hook.
    pub fn active_class(mut self, token: impl Into<String>) -> Self {
        self.active_class = token.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), OptionsError> {
        let fields: [(&'static str, &str); 6] = [
            ("container_marker", &self.container_marker),
            ("modal_marker", &self.modal_marker),
            ("open_marker", &self.open_marker),
            ("close_marker", &self.close_marker),
            ("ready_class", &self.ready_class),
            ("active_class", &self.active_class),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(OptionsError::EmptyToken(name));
            }
        }
        Ok(())
    }
}
