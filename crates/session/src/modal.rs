use std::sync::Arc;

use kform_codec::Codec;
use kform_core::{FormConfig, FormData, FormError, StructuredForm, Translator};
use tracing::{debug, info};

use crate::session::{EditMode, EditSession, ModePolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalOptions {
    /// Explicit title; otherwise "Create {name}".
    pub title: Option<String>,
    /// Locale key of the resource name.
    pub name: String,
    pub no_code_edit: bool,
    pub only_code: bool,
    pub is_submitting: bool,
    pub width: u32,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            title: None,
            name: String::new(),
            no_code_edit: false,
            only_code: false,
            is_submitting: false,
            width: FormConfig::default().modal_width,
        }
    }
}

impl ModalOptions {
    pub fn from_config(name: impl Into<String>, cfg: &FormConfig) -> Self {
        Self { name: name.into(), width: cfg.modal_width, ..Default::default() }
    }

    fn policy(&self) -> ModePolicy {
        if self.only_code {
            ModePolicy::TextualOnly
        } else if self.no_code_edit {
            ModePolicy::StructuredOnly
        } else {
            ModePolicy::Free
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// User-facing message raised by a modal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

type OkCallback = Box<dyn FnMut(FormData) + Send>;
type CancelCallback = Box<dyn FnMut() + Send>;

/// Create-resource modal: wraps an edit session with visibility, title and callbacks.
///
/// The session only exists while the modal is visible; showing the modal
/// starts a fresh one from the template and hiding it throws it away.
pub struct CreateResourceModal {
    options: ModalOptions,
    template: FormData,
    codec: Codec,
    tr: Arc<dyn Translator>,
    session: Option<EditSession>,
    notice: Option<Notice>,
    on_ok: OkCallback,
    on_cancel: CancelCallback,
}

impl std::fmt::Debug for CreateResourceModal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateResourceModal")
            .field("options", &self.options)
            .field("visible", &self.session.is_some())
            .field("notice", &self.notice)
            .finish()
    }
}

impl CreateResourceModal {
    pub fn new(template: FormData, options: ModalOptions, codec: Codec, tr: Arc<dyn Translator>) -> Self {
        Self {
            options,
            template,
            codec,
            tr,
            session: None,
            notice: None,
            on_ok: Box::new(|_| {}),
            on_cancel: Box::new(|| {}),
        }
    }

    pub fn on_ok(mut self, f: impl FnMut(FormData) + Send + 'static) -> Self {
        self.on_ok = Box::new(f);
        self
    }

    pub fn on_cancel(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_cancel = Box::new(f);
        self
    }

    pub fn options(&self) -> &ModalOptions { &self.options }

    pub fn set_submitting(&mut self, submitting: bool) { self.options.is_submitting = submitting; }

    /// Replace the template used by the next show.
    pub fn set_template(&mut self, template: FormData) { self.template = template; }

    pub fn is_visible(&self) -> bool { self.session.is_some() }

    pub fn session(&self) -> Option<&EditSession> { self.session.as_ref() }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> { self.session.as_mut() }

    pub fn notice(&self) -> Option<&Notice> { self.notice.as_ref() }

    pub fn take_notice(&mut self) -> Option<Notice> { self.notice.take() }

    /// Visibility transition. Hidden -> visible starts a fresh session from the template.
    pub fn set_visible(&mut self, visible: bool) -> Result<(), FormError> {
        match (self.session.is_some(), visible) {
            (false, true) => {
                let session = EditSession::new(&self.template, self.codec, self.options.policy())?;
                debug!(session = %session.id(), "modal shown");
                self.session = Some(session);
                self.notice = None;
            }
            (true, false) => {
                self.session = None;
                self.notice = None;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn title(&self) -> String {
        match &self.options.title {
            Some(t) => t.clone(),
            None => {
                let name = self.tr.t(&self.options.name);
                self.tr.t_with("CREATE_NAME", &[("name", name.as_str())])
            }
        }
    }

    pub fn shows_mode_switch(&self) -> bool { !(self.options.no_code_edit || self.options.only_code) }

    fn error_notice(&self, e: &FormError) -> Notice {
        let message = match e {
            FormError::UnsavedSubroute => return Notice { level: NoticeLevel::Warning, message: self.tr.t("SAVE_FORM_TIP") },
            FormError::Decode(d) => {
                let error = d.to_string();
                self.tr.t_with("YAML_DECODE_FAILED", &[("error", error.as_str())])
            }
            FormError::FieldValidation(errors) => {
                errors.iter().map(|fe| format!("{}: {}", fe.path, self.tr.t(&fe.message))).collect::<Vec<_>>().join("\n")
            }
            other => other.to_string(),
        };
        Notice { level: NoticeLevel::Error, message }
    }

    /// Toggle the session's edit mode. Failures leave the session as it was and raise a notice.
    pub fn switch_mode(&mut self, form: &mut dyn StructuredForm) -> Option<EditMode> {
        let session = self.session.as_mut()?;
        match session.toggle_mode(form) {
            Ok(mode) => {
                self.notice = None;
                Some(mode)
            }
            Err(e) => {
                self.notice = Some(self.error_notice(&e));
                None
            }
        }
    }

    /// Confirm. Returns true when the document was handed to `on_ok`.
    pub fn ok(&mut self, form: &dyn StructuredForm) -> bool {
        if self.options.is_submitting {
            debug!("ok ignored while submitting");
            return false;
        }
        let Some(session) = self.session.as_mut() else { return false };
        match session.submit(form) {
            Ok(data) => {
                info!(session = %session.id(), "modal confirmed");
                self.notice = None;
                (self.on_ok)(data);
                true
            }
            Err(e) => {
                self.notice = Some(self.error_notice(&e));
                false
            }
        }
    }

    /// Dismiss: notify the caller and discard the session.
    pub fn cancel(&mut self) {
        (self.on_cancel)();
        self.session = None;
        self.notice = None;
    }
}
