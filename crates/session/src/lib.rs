//! Kform session: the edit-mode state machine and the create-resource modal.
//!
//! An [`EditSession`] owns the authoritative document of one create/edit
//! flow and moves it between the structured view (field bindings into the
//! document) and the textual view (a YAML buffer). Everything here is plain
//! owned state driven by transition functions; hosts call them from their own
//! event loop and render whatever the state says.

#![forbid(unsafe_code)]

mod modal;
mod session;
mod wizard;

pub use modal::{CreateResourceModal, ModalOptions, Notice, NoticeLevel};
pub use session::{EditMode, EditSession, ModePolicy};
pub use wizard::{WizardForm, WizardStep, FIELD_REQUIRED};
