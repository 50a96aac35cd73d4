use kform_codec::{Codec, Decoded};
use kform_core::{
    normalize_kind, DecodeError, DocPath, FormData, FormError, KindMap, ResourceDocument, StructuredForm,
};
use metrics::counter;
use serde_json::Value as Json;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Structured,
    Textual,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::Structured => "structured",
            EditMode::Textual => "textual",
        }
    }
}

/// Which views a session may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModePolicy {
    #[default]
    Free,
    /// Raw editing is not permitted.
    StructuredOnly,
    /// Raw editing is forced.
    TextualOnly,
}

/// One create/edit flow over an authoritative document.
#[derive(Debug, Clone)]
pub struct EditSession {
    id: Uuid,
    codec: Codec,
    policy: ModePolicy,
    module_kind: Option<String>,
    document: FormData,
    mode: EditMode,
    remembered_step: usize,
    code: Option<String>,
    last_error: Option<DecodeError>,
}

impl EditSession {
    /// New session over a copy of `template`.
    pub fn new(template: &FormData, codec: Codec, policy: ModePolicy) -> Result<Self, FormError> {
        let mut s = Self {
            id: Uuid::new_v4(),
            codec,
            policy,
            module_kind: None,
            document: FormData::default(),
            mode: EditMode::Structured,
            remembered_step: 0,
            code: None,
            last_error: None,
        };
        s.reset(template)?;
        Ok(s)
    }

    /// Address field edits at this kind when the document is a kind map.
    pub fn with_module_kind(mut self, kind: impl Into<String>) -> Self {
        self.module_kind = Some(kind.into());
        self
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn mode(&self) -> EditMode { self.mode }
    pub fn policy(&self) -> ModePolicy { self.policy }
    pub fn document(&self) -> &FormData { &self.document }
    pub fn code(&self) -> Option<&str> { self.code.as_deref() }
    pub fn last_error(&self) -> Option<&DecodeError> { self.last_error.as_ref() }
    pub fn remembered_step(&self) -> usize { self.remembered_step }

    fn encode(&self) -> Result<String, FormError> {
        self.codec.encode(&self.document).map_err(|e| FormError::Encode(e.to_string()))
    }

    /// Start over from `template`. Any previous edits are dropped.
    pub fn reset(&mut self, template: &FormData) -> Result<(), FormError> {
        self.document = template.clone();
        self.remembered_step = 0;
        self.last_error = None;
        self.mode = match self.policy {
            ModePolicy::TextualOnly => EditMode::Textual,
            _ => EditMode::Structured,
        };
        self.code = match self.mode {
            EditMode::Textual => Some(self.encode()?),
            EditMode::Structured => None,
        };
        debug!(session = %self.id, mode = ?self.mode, "session reset");
        Ok(())
    }

    /// Flip between the structured and the textual view, flushing the view being left.
    pub fn toggle_mode(&mut self, form: &mut dyn StructuredForm) -> Result<EditMode, FormError> {
        if self.policy != ModePolicy::Free {
            return Err(FormError::ModeLocked);
        }
        match self.mode {
            EditMode::Structured => {
                if form.has_sub_route() {
                    debug!(session = %self.id, "switch blocked by unsaved nested form");
                    return Err(FormError::UnsavedSubroute);
                }
                let code = self.encode()?;
                self.remembered_step = form.current_step();
                self.code = Some(code);
                self.mode = EditMode::Textual;
            }
            EditMode::Textual => {
                let decoded = self.decode_buffer()?;
                self.document = self.absorb(decoded);
                self.code = None;
                self.mode = EditMode::Structured;
                form.resume(self.remembered_step);
            }
        }
        counter!("kform_mode_switch_total", 1u64, "to" => self.mode.as_str());
        info!(session = %self.id, mode = ?self.mode, step = self.remembered_step, "edit mode switched");
        Ok(self.mode)
    }

    fn decode_buffer(&mut self) -> Result<Decoded, FormError> {
        let text = self.code.as_deref().unwrap_or_default();
        match self.codec.decode(text) {
            Ok(d) => {
                self.last_error = None;
                Ok(d)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "code buffer does not decode");
                self.last_error = Some(e.clone());
                Err(FormError::Decode(e))
            }
        }
    }

    /// Turn decoded text into the shape the session currently holds.
    fn absorb(&self, decoded: Decoded) -> FormData {
        match (decoded, &self.document) {
            (Decoded::Single(doc), FormData::Kinds(_)) => match doc.kind().map(|k| normalize_kind(k).to_string()) {
                Some(kind) if !kind.is_empty() => {
                    let mut m = KindMap::default();
                    m.insert(kind, doc);
                    FormData::Kinds(m)
                }
                _ => FormData::Single(doc),
            },
            (decoded, _) => decoded.into_form_data(),
        }
    }

    /// Validate the active view and hand back the document to submit.
    pub fn submit(&mut self, form: &dyn StructuredForm) -> Result<FormData, FormError> {
        match self.mode {
            EditMode::Structured => {
                form.apply_defaults(&mut self.document);
                if let Err(errors) = form.validate(&self.document) {
                    debug!(session = %self.id, errors = errors.len(), "structured validation failed");
                    return Err(FormError::FieldValidation(errors));
                }
            }
            EditMode::Textual => {
                let decoded = self.decode_buffer()?;
                let data = self.absorb(decoded);
                if let Some(index) = data.documents().iter().position(|d| d.kind().map(str::is_empty).unwrap_or(true)) {
                    let e = DecodeError::MissingKind { index };
                    self.last_error = Some(e.clone());
                    return Err(FormError::Decode(e));
                }
                self.document = data;
            }
        }
        info!(session = %self.id, mode = ?self.mode, documents = self.document.documents().len(), "session submitted");
        Ok(self.document.clone())
    }

    fn target(&self) -> Option<&ResourceDocument> {
        match &self.module_kind {
            Some(kind) => self.document.for_kind(kind),
            None => self.document.primary(),
        }
    }

    fn target_mut(&mut self) -> Option<&mut ResourceDocument> {
        match &self.module_kind {
            Some(kind) => self.document.for_kind_mut(kind),
            None => self.document.primary_mut(),
        }
    }

    pub fn field(&self, path: &DocPath) -> Option<&Json> { self.target()?.get(path) }

    /// Structured-view field edit, written straight into the document.
    pub fn set_field(&mut self, path: &DocPath, value: Json) -> Result<(), FormError> {
        if self.mode != EditMode::Structured {
            return Err(FormError::InactiveView);
        }
        let doc = self.target_mut().ok_or(FormError::InactiveView)?;
        doc.set(path, value)?;
        Ok(())
    }

    /// Direct access for views that edit several fields at once.
    pub fn document_mut(&mut self) -> Result<&mut FormData, FormError> {
        match self.mode {
            EditMode::Structured => Ok(&mut self.document),
            EditMode::Textual => Err(FormError::InactiveView),
        }
    }

    pub fn set_code(&mut self, text: impl Into<String>) -> Result<(), FormError> {
        if self.mode != EditMode::Textual {
            return Err(FormError::InactiveView);
        }
        self.code = Some(text.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kform_core::FieldError;
    use serde_json::json;

    #[derive(Default)]
    struct Probe {
        step: usize,
        nested: bool,
    }

    impl StructuredForm for Probe {
        fn current_step(&self) -> usize { self.step }
        fn resume(&mut self, step: usize) { self.step = step; }
        fn has_sub_route(&self) -> bool { self.nested }
        fn validate(&self, _data: &FormData) -> Result<(), Vec<FieldError>> { Ok(()) }
    }

    fn template() -> FormData {
        FormData::Single(ResourceDocument::from_json(json!({"kind": "Secret", "metadata": {"name": "s"}})).unwrap())
    }

    #[test]
    fn textual_only_starts_with_a_buffer() {
        let s = EditSession::new(&template(), Codec::default(), ModePolicy::TextualOnly).unwrap();
        assert_eq!(s.mode(), EditMode::Textual);
        assert!(s.code().unwrap().contains("kind: Secret"));
    }

    #[test]
    fn locked_sessions_refuse_to_toggle() {
        let mut s = EditSession::new(&template(), Codec::default(), ModePolicy::StructuredOnly).unwrap();
        assert_eq!(s.toggle_mode(&mut Probe::default()), Err(FormError::ModeLocked));
        assert_eq!(s.mode(), EditMode::Structured);
    }

    #[test]
    fn edits_are_rejected_in_the_inactive_view() {
        let mut s = EditSession::new(&template(), Codec::default(), ModePolicy::Free).unwrap();
        assert_eq!(s.set_code("kind: Secret"), Err(FormError::InactiveView));
        s.toggle_mode(&mut Probe::default()).unwrap();
        assert_eq!(s.set_field(&DocPath::from_keys(["data"]), json!({})), Err(FormError::InactiveView));
        assert!(s.document_mut().is_err());
    }

    #[test]
    fn single_document_keeps_kind_addressing() {
        let kinds = FormData::Kinds(
            [("Deployment".to_string(), ResourceDocument::from_json(json!({"kind": "FederatedDeployment"})).unwrap())]
                .into_iter()
                .collect(),
        );
        let mut s = EditSession::new(&kinds, Codec::default(), ModePolicy::Free).unwrap();
        let mut form = Probe::default();
        s.toggle_mode(&mut form).unwrap();
        s.set_code("kind: FederatedService\nmetadata:\n  name: web\n").unwrap();
        s.toggle_mode(&mut form).unwrap();
        assert!(s.document().is_multi());
        assert_eq!(s.document().for_kind("Service").and_then(|d| d.name()), Some("web"));
    }

    #[test]
    fn textual_submit_requires_kind() {
        let mut s = EditSession::new(&template(), Codec::default(), ModePolicy::TextualOnly).unwrap();
        s.set_code("metadata:\n  name: x\n").unwrap();
        assert_eq!(s.submit(&Probe::default()), Err(FormError::Decode(DecodeError::MissingKind { index: 0 })));
        assert_eq!(s.document(), &template());
    }
}
