use kform_core::{DocPath, FieldError, FormData, ResourceDocument, StructuredForm};
use serde_json::Value as Json;
use tracing::debug;

pub const FIELD_REQUIRED: &str = "FIELD_REQUIRED";

#[derive(Debug, Clone, PartialEq)]
pub struct WizardStep {
    pub name: String,
    pub required: Vec<DocPath>,
}

impl WizardStep {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), required: Vec::new() } }

    pub fn require(mut self, path: DocPath) -> Self {
        self.required.push(path);
        self
    }
}

/// Multi-step structured form with optional nested sub-forms.
#[derive(Debug, Clone)]
pub struct WizardForm {
    steps: Vec<WizardStep>,
    current: usize,
    sub_route: Option<String>,
    module_kind: Option<String>,
}

fn is_blank(v: Option<&Json>) -> bool {
    match v {
        None | Some(Json::Null) => true,
        Some(Json::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl WizardForm {
    pub fn new(steps: Vec<WizardStep>) -> Self { Self { steps, current: 0, sub_route: None, module_kind: None } }

    pub fn with_module_kind(mut self, kind: impl Into<String>) -> Self {
        self.module_kind = Some(kind.into());
        self
    }

    pub fn steps(&self) -> &[WizardStep] { &self.steps }

    pub fn step(&self) -> Option<&WizardStep> { self.steps.get(self.current) }

    pub fn is_last(&self) -> bool { self.current + 1 >= self.steps.len() }

    fn target<'a>(&self, data: &'a FormData) -> Option<&'a ResourceDocument> {
        match &self.module_kind {
            Some(kind) => data.for_kind(kind),
            None => data.primary(),
        }
    }

    fn check(&self, step: &WizardStep, data: &FormData) -> Vec<FieldError> {
        let doc = self.target(data);
        step.required
            .iter()
            .filter(|p| is_blank(doc.and_then(|d| d.get(p))))
            .map(|p| FieldError::new(p, FIELD_REQUIRED))
            .collect()
    }

    /// Validate the current step and advance. Stays on the last step.
    pub fn next(&mut self, data: &FormData) -> Result<usize, Vec<FieldError>> {
        if let Some(step) = self.step() {
            let errors = self.check(step, data);
            if !errors.is_empty() {
                return Err(errors);
            }
        }
        if !self.is_last() {
            self.current += 1;
        }
        debug!(step = self.current, "wizard advanced");
        Ok(self.current)
    }

    pub fn prev(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    pub fn open_sub_route(&mut self, name: impl Into<String>) { self.sub_route = Some(name.into()); }

    /// Leave the nested form, returning its name.
    pub fn close_sub_route(&mut self) -> Option<String> { self.sub_route.take() }

    pub fn sub_route(&self) -> Option<&str> { self.sub_route.as_deref() }
}

impl StructuredForm for WizardForm {
    fn current_step(&self) -> usize { self.current }

    fn resume(&mut self, step: usize) { self.current = step.min(self.steps.len().saturating_sub(1)); }

    fn has_sub_route(&self) -> bool { self.sub_route.is_some() }

    fn validate(&self, data: &FormData) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = self.steps.iter().flat_map(|s| self.check(s, data)).collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wizard() -> WizardForm {
        WizardForm::new(vec![
            WizardStep::new("basic").require(DocPath::from_keys(["metadata", "name"])),
            WizardStep::new("settings").require(DocPath::from_keys(["provisioner"])),
            WizardStep::new("advanced"),
        ])
    }

    #[test]
    fn next_blocks_on_missing_required_fields() {
        let mut w = wizard();
        let empty = FormData::Single(ResourceDocument::from_json(json!({"metadata": {"name": " "}})).unwrap());
        let errs = w.next(&empty).unwrap_err();
        assert_eq!(errs, vec![FieldError { path: "metadata.name".into(), message: FIELD_REQUIRED.into() }]);
        assert_eq!(w.current_step(), 0);

        let named = FormData::Single(ResourceDocument::from_json(json!({"metadata": {"name": "fast"}})).unwrap());
        assert_eq!(w.next(&named), Ok(1));
        assert_eq!(w.prev(), 0);
        assert_eq!(w.prev(), 0);
    }

    #[test]
    fn resume_is_clamped() {
        let mut w = wizard();
        w.resume(9);
        assert_eq!(w.current_step(), 2);
        assert!(w.is_last());
    }

    #[test]
    fn sub_route_tracks_nested_form() {
        let mut w = wizard();
        assert!(!w.has_sub_route());
        w.open_sub_route("container");
        assert_eq!(w.sub_route(), Some("container"));
        assert!(w.has_sub_route());
        assert_eq!(w.close_sub_route().as_deref(), Some("container"));
        assert!(!w.has_sub_route());
    }
}
