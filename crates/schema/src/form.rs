//! Schema-driven form resolution.
//!
//! The parameter section of a storage class form is not known until the
//! provisioner is: descriptors from the [`ProvisionerTable`] are laid out two
//! per row and each declared input type goes through a [`WidgetRegistry`].
//! Unknown provisioners (or ones without parameters) get a free-form
//! key/value editor instead. Every field binds straight into the document
//! under `parameters.<key>`.

use std::collections::HashMap;
use std::sync::Arc;

use kform_core::{DocPath, FieldError, FormData, PathError, ResourceDocument, StructuredForm, Translator};
use regex::Regex;
use serde_json::Value as Json;
use smallvec::SmallVec;
use tracing::warn;

use crate::{AccessMode, InputKind, ParameterDescriptor, ProvisionerTable};

pub const PROVISIONER_ANNOTATION: &str = "kubesphere.io/provisioner";
pub const ACCESS_MODES_ANNOTATION: &str = "storageclass.kubesphere.io/supported-access-modes";
pub const STORAGE_CLASS_KIND: &str = "StorageClass";

pub const MSG_REQUIRED: &str = "PARAMETER_REQUIRED";
pub const MSG_PATTERN: &str = "FIELD_PATTERN_MISMATCH";

pub fn parameters_path() -> DocPath { DocPath::from_keys(["parameters"]) }

pub fn annotation_path(key: &str) -> DocPath { DocPath::from_keys(["metadata", "annotations", key]) }

/// Provisioner of a document: the console annotation wins over `provisioner`.
pub fn provisioner_of(doc: &ResourceDocument) -> Option<&str> {
    doc.get_str(&annotation_path(PROVISIONER_ANNOTATION))
        .or_else(|| doc.get_str(&DocPath::from_keys(["provisioner"])))
}

/// Text shown in a field for a stored value.
pub fn value_text(v: &Json) -> String {
    match v {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    SingleLine,
    Choice,
    Numeric,
}

/// Input-type tag -> widget lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    by_tag: HashMap<String, WidgetKind>,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::empty()
            .register("text", WidgetKind::SingleLine)
            .register("select", WidgetKind::Choice)
            .register("number", WidgetKind::Numeric)
    }
}

impl WidgetRegistry {
    pub fn empty() -> Self { Self { by_tag: HashMap::new() } }

    pub fn register(mut self, tag: impl Into<String>, kind: WidgetKind) -> Self {
        self.by_tag.insert(tag.into(), kind);
        self
    }

    pub fn resolve(&self, input: &InputKind) -> Option<WidgetKind> { self.by_tag.get(input.tag()).copied() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub label: String,
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    SingleLine { placeholder: Option<String>, disabled: bool },
    Choice { options: Vec<ChoiceOption> },
    Numeric,
    /// Shown when no widget is registered for the declared tag.
    Placeholder { tag: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot {
    pub path: DocPath,
    pub label: String,
    pub description: Option<String>,
    pub widget: Widget,
    pub required: bool,
    pub default: Option<Json>,
}

/// One layout row: a left slot and an optional right slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    slots: SmallVec<[FieldSlot; 2]>,
}

impl FieldRow {
    pub fn new(left: FieldSlot, right: Option<FieldSlot>) -> Self {
        let mut slots = SmallVec::new();
        slots.push(left);
        slots.extend(right);
        Self { slots }
    }

    pub fn left(&self) -> &FieldSlot { &self.slots[0] }
    pub fn right(&self) -> Option<&FieldSlot> { self.slots.get(1) }
    pub fn slots(&self) -> &[FieldSlot] { &self.slots }
}

/// Free-form key/value editor bound to a mapping in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesEditor {
    pub path: DocPath,
    pub label: String,
    pub add_text: String,
}

impl PropertiesEditor {
    pub fn new(tr: &dyn Translator) -> Self {
        Self { path: parameters_path(), label: tr.t("Parameters"), add_text: tr.t("ADD_PARAMETER") }
    }

    pub fn entries(&self, doc: &ResourceDocument) -> Vec<(String, String)> {
        match doc.get(&self.path) {
            Some(Json::Object(map)) => map.iter().map(|(k, v)| (k.clone(), value_text(v))).collect(),
            _ => Vec::new(),
        }
    }

    pub fn set(&self, doc: &mut ResourceDocument, key: &str, value: &str) -> Result<(), PathError> {
        if key.is_empty() {
            return Err(PathError::Empty);
        }
        doc.set(&self.path.clone().key(key), Json::String(value.to_string()))
    }

    /// Rename a key, keeping its value. Renaming onto an existing key replaces it.
    pub fn rename(&self, doc: &mut ResourceDocument, from: &str, to: &str) -> Result<(), PathError> {
        if to.is_empty() {
            return Err(PathError::Empty);
        }
        if from == to {
            return Ok(());
        }
        let value = doc.remove(&self.path.clone().key(from)).unwrap_or(Json::String(String::new()));
        doc.set(&self.path.clone().key(to), value)
    }

    pub fn remove(&self, doc: &mut ResourceDocument, key: &str) -> Option<Json> { doc.remove(&self.path.clone().key(key)) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterForm {
    Rows(Vec<FieldRow>),
    Properties(PropertiesEditor),
}

fn slot_for(d: &ParameterDescriptor, registry: &WidgetRegistry, tr: &dyn Translator) -> FieldSlot {
    let widget = match registry.resolve(&d.input) {
        Some(WidgetKind::SingleLine) => Widget::SingleLine { placeholder: d.placeholder.as_deref().map(|p| tr.t(p)), disabled: false },
        Some(WidgetKind::Choice) => Widget::Choice {
            options: d
                .options
                .iter()
                .map(|o| ChoiceOption { label: tr.t(&o.label), value: Json::String(o.value.clone()) })
                .collect(),
        },
        Some(WidgetKind::Numeric) => Widget::Numeric,
        None => {
            warn!(key = %d.key, tag = %d.input.tag(), "no widget registered for input type; rendering placeholder");
            Widget::Placeholder { tag: d.input.tag().to_string() }
        }
    };
    FieldSlot {
        path: parameters_path().key(&d.key),
        label: tr.t(&d.key.to_uppercase()),
        description: (!d.description.is_empty()).then(|| tr.t(&d.description.to_uppercase())),
        widget,
        required: d.required,
        default: d.default.clone().map(Json::String),
    }
}

/// Resolve the parameter section for `provisioner`.
pub fn resolve_parameter_form(
    provisioner: Option<&str>,
    table: &ProvisionerTable,
    registry: &WidgetRegistry,
    tr: &dyn Translator,
) -> ParameterForm {
    let descriptors = provisioner.and_then(|id| table.find(id)).map(|p| p.params.as_slice()).unwrap_or(&[]);
    if descriptors.is_empty() {
        return ParameterForm::Properties(PropertiesEditor::new(tr));
    }
    let rows = descriptors
        .chunks(2)
        .map(|pair| FieldRow::new(slot_for(&pair[0], registry, tr), pair.get(1).map(|d| slot_for(d, registry, tr))))
        .collect();
    ParameterForm::Rows(rows)
}

/// Access modes a provisioner supports; all of them when it declares none.
pub fn supported_access_modes(provisioner: Option<&str>, table: &ProvisionerTable) -> Vec<AccessMode> {
    match provisioner.and_then(|id| table.find(id)) {
        Some(p) if !p.access_modes.is_empty() => p.access_modes.clone(),
        _ => AccessMode::ALL.to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessModeField {
    pub path: DocPath,
    pub label: String,
    pub description: String,
    pub options: Vec<ChoiceOption>,
    /// Values selected when the document holds none.
    pub default_selected: Vec<String>,
}

pub fn access_mode_options(provisioner: Option<&str>, table: &ProvisionerTable, tr: &dyn Translator) -> AccessModeField {
    let modes = supported_access_modes(provisioner, table);
    AccessModeField {
        path: annotation_path(ACCESS_MODES_ANNOTATION),
        label: tr.t("ACCESS_MODE"),
        description: tr.t("ACCESS_MODES_DESC"),
        options: modes
            .iter()
            .map(|m| ChoiceOption { label: tr.t(m.label_key()), value: Json::String(m.as_str().to_string()) })
            .collect(),
        default_selected: modes.iter().map(|m| m.as_str().to_string()).collect(),
    }
}

/// Access modes stored on the document (comma-separated annotation).
pub fn selected_access_modes(doc: &ResourceDocument) -> Option<Vec<String>> {
    let raw = doc.get_str(&annotation_path(ACCESS_MODES_ANNOTATION))?;
    Some(raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
}

pub fn set_access_modes(doc: &mut ResourceDocument, modes: &[String]) -> Result<(), PathError> {
    doc.set(&annotation_path(ACCESS_MODES_ANNOTATION), Json::String(modes.join(",")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsLayout {
    /// Volume expansion and reclaim policy.
    pub base: FieldRow,
    pub access_modes: AccessModeField,
    pub provisioner: FieldSlot,
    pub parameters: ParameterForm,
    pub customized: bool,
}

/// The storage class settings step: fixed fields plus provisioner parameters.
#[derive(Debug, Clone)]
pub struct StorageClassSettings {
    table: Arc<ProvisionerTable>,
    registry: Arc<WidgetRegistry>,
    module_kind: String,
}

impl StorageClassSettings {
    pub fn new(table: Arc<ProvisionerTable>, registry: Arc<WidgetRegistry>) -> Self {
        Self { table, registry, module_kind: STORAGE_CLASS_KIND.to_string() }
    }

    pub fn module_kind(&self) -> &str { &self.module_kind }

    pub fn table(&self) -> &ProvisionerTable { &self.table }

    pub fn registry(&self) -> &WidgetRegistry { &self.registry }

    pub fn layout(&self, data: &FormData, tr: &dyn Translator) -> SettingsLayout {
        let provisioner = data.for_kind(&self.module_kind).and_then(provisioner_of);
        let base = FieldRow::new(
            FieldSlot {
                path: DocPath::from_keys(["allowVolumeExpansion"]),
                label: tr.t("STORAGE_VOLUME_EXTENSION"),
                description: None,
                widget: Widget::Choice {
                    options: vec![
                        ChoiceOption { label: tr.t("Yes"), value: Json::Bool(true) },
                        ChoiceOption { label: tr.t("No"), value: Json::Bool(false) },
                    ],
                },
                required: false,
                default: None,
            },
            Some(FieldSlot {
                path: DocPath::from_keys(["reclaimPolicy"]),
                label: tr.t("RECLAMATION_POLICY"),
                description: None,
                widget: Widget::SingleLine { placeholder: None, disabled: true },
                required: false,
                default: None,
            }),
        );
        SettingsLayout {
            base,
            access_modes: access_mode_options(provisioner, &self.table, tr),
            provisioner: FieldSlot {
                path: DocPath::from_keys(["provisioner"]),
                label: tr.t("STORAGE_SYSTEM"),
                description: Some(tr.t("PROVISIONER_DESC")),
                widget: Widget::SingleLine { placeholder: None, disabled: false },
                required: true,
                default: None,
            },
            parameters: resolve_parameter_form(provisioner, &self.table, &self.registry, tr),
            customized: provisioner.map(|p| !self.table.is_known(p)).unwrap_or(true),
        }
    }
}

impl StructuredForm for StorageClassSettings {
    fn apply_defaults(&self, data: &mut FormData) {
        let Some(doc) = data.for_kind_mut(&self.module_kind) else { return };
        let provisioner = provisioner_of(doc).map(str::to_string);
        if let Some(p) = provisioner.as_deref().and_then(|id| self.table.find(id)) {
            for d in p.params.iter() {
                let Some(default) = &d.default else { continue };
                let path = parameters_path().key(&d.key);
                if doc.get(&path).is_none() {
                    if let Err(e) = doc.set(&path, Json::String(default.clone())) {
                        warn!(error = %e, path = %path, "cannot fill parameter default");
                    }
                }
            }
        }
        if selected_access_modes(doc).is_none() {
            let modes: Vec<String> = supported_access_modes(provisioner.as_deref(), &self.table)
                .iter()
                .map(|m| m.as_str().to_string())
                .collect();
            if let Err(e) = set_access_modes(doc, &modes) {
                warn!(error = %e, "cannot fill access mode default");
            }
        }
    }

    fn validate(&self, data: &FormData) -> Result<(), Vec<FieldError>> {
        let Some(doc) = data.for_kind(&self.module_kind) else {
            return Err(vec![FieldError { path: self.module_kind.clone(), message: MSG_REQUIRED.to_string() }]);
        };
        let mut errors = Vec::new();
        let prov_path = DocPath::from_keys(["provisioner"]);
        if doc.get_str(&prov_path).map(str::trim).unwrap_or_default().is_empty() {
            errors.push(FieldError::new(&prov_path, MSG_REQUIRED));
        }
        if let Some(p) = provisioner_of(doc).and_then(|id| self.table.find(id)) {
            for d in p.params.iter() {
                let path = parameters_path().key(&d.key);
                let value = doc.get(&path).map(value_text).unwrap_or_default();
                if value.trim().is_empty() {
                    if d.required {
                        errors.push(FieldError::new(&path, MSG_REQUIRED));
                    }
                    continue;
                }
                if let Some(pattern) = &d.pattern {
                    match Regex::new(pattern) {
                        Ok(re) if !re.is_match(&value) => errors.push(FieldError::new(&path, MSG_PATTERN)),
                        Ok(_) => {}
                        Err(e) => warn!(key = %d.key, error = %e, "invalid parameter pattern; skipping check"),
                    }
                }
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
