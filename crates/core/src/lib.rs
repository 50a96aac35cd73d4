//! Kform core types: resource documents, typed paths, errors and the structured-form seam.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub mod config;
pub mod locale;
pub mod path;

pub use config::FormConfig;
pub use locale::{Catalog, Translator};
pub use path::{DocPath, PathError, PathSeg};

/// Kind prefix marking the multi-cluster (federated) variant of a base kind.
pub const FEDERATED_PREFIX: &str = "Federated";

pub mod prelude {
    pub use super::{
        Catalog, DocPath, DocumentSet, FieldError, FormData, FormError, KindMap, ResourceDocument,
        ResourceId, StructuredForm, Translator,
    };
}

pub fn json_type_name(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("resource document must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

/// One manageable resource (StorageClass, Secret, ...) as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Json", into = "Json")]
pub struct ResourceDocument(Json);

impl Default for ResourceDocument {
    fn default() -> Self { Self(Json::Object(serde_json::Map::new())) }
}

impl TryFrom<Json> for ResourceDocument {
    type Error = CoreError;

    fn try_from(v: Json) -> Result<Self, Self::Error> {
        match v {
            Json::Object(_) => Ok(Self(v)),
            other => Err(CoreError::NotAMapping(json_type_name(&other))),
        }
    }
}

impl From<ResourceDocument> for Json {
    fn from(d: ResourceDocument) -> Self { d.0 }
}

impl ResourceDocument {
    pub fn new() -> Self { Self::default() }

    pub fn from_json(v: Json) -> Result<Self, CoreError> { Self::try_from(v) }

    pub fn as_json(&self) -> &Json { &self.0 }

    pub fn into_json(self) -> Json { self.0 }

    pub fn kind(&self) -> Option<&str> { self.0.get("kind").and_then(|v| v.as_str()) }

    pub fn api_version(&self) -> Option<&str> { self.0.get("apiVersion").and_then(|v| v.as_str()) }

    pub fn name(&self) -> Option<&str> {
        self.0.get("metadata").and_then(|m| m.get("name")).and_then(|v| v.as_str())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.get("metadata").and_then(|m| m.get("namespace")).and_then(|v| v.as_str())
    }

    pub fn id(&self) -> ResourceId {
        ResourceId {
            kind: self.kind().unwrap_or_default().to_string(),
            name: self.name().map(str::to_string),
            namespace: self.namespace().map(str::to_string),
        }
    }

    pub fn get(&self, path: &DocPath) -> Option<&Json> { path.get(&self.0) }

    pub fn get_mut(&mut self, path: &DocPath) -> Option<&mut Json> { path.get_mut(&mut self.0) }

    pub fn get_str(&self, path: &DocPath) -> Option<&str> { self.get(path).and_then(|v| v.as_str()) }

    /// Set a value, creating intermediate objects. The root stays a mapping.
    pub fn set(&mut self, path: &DocPath, value: Json) -> Result<(), PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        path.set(&mut self.0, value)
    }

    pub fn remove(&mut self, path: &DocPath) -> Option<Json> { path.remove(&mut self.0) }
}

/// Identity of a document: kind plus optional name/namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: String,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.namespace, &self.name) {
            (Some(ns), Some(n)) => write!(f, "{} {}/{}", self.kind, ns, n),
            (None, Some(n)) => write!(f, "{} {}", self.kind, n),
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Ordered sequence of documents, as decoded from a multi-document stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    docs: Vec<ResourceDocument>,
}

impl DocumentSet {
    pub fn new() -> Self { Self::default() }
    pub fn push(&mut self, d: ResourceDocument) { self.docs.push(d); }
    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDocument> { self.docs.iter() }

    /// Fold into a kind-keyed map, stripping the federation prefix from each kind.
    pub fn fold(self) -> KindMap {
        let mut out = KindMap::default();
        for doc in self.docs {
            let key = normalize_kind(doc.kind().unwrap_or_default()).to_string();
            out.insert(key, doc);
        }
        out
    }
}

impl From<Vec<ResourceDocument>> for DocumentSet {
    fn from(docs: Vec<ResourceDocument>) -> Self { Self { docs } }
}

impl IntoIterator for DocumentSet {
    type Item = ResourceDocument;
    type IntoIter = std::vec::IntoIter<ResourceDocument>;
    fn into_iter(self) -> Self::IntoIter { self.docs.into_iter() }
}

/// `FederatedDeployment` -> `Deployment`; other kinds pass through.
pub fn normalize_kind(kind: &str) -> &str {
    match kind.strip_prefix(FEDERATED_PREFIX) {
        Some(rest) if !rest.is_empty() => rest,
        _ => kind,
    }
}

/// Ordered mapping normalized kind -> document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindMap {
    entries: Vec<(String, ResourceDocument)>,
}

impl KindMap {
    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, kind: impl Into<String>, doc: ResourceDocument) {
        let kind = kind.into();
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = doc,
            None => self.entries.push((kind, doc)),
        }
    }

    pub fn get(&self, kind: &str) -> Option<&ResourceDocument> {
        self.entries.iter().find(|(k, _)| k == kind).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, kind: &str) -> Option<&mut ResourceDocument> {
        self.entries.iter_mut().find(|(k, _)| k == kind).map(|(_, d)| d)
    }

    pub fn first_mut(&mut self) -> Option<&mut ResourceDocument> { self.entries.first_mut().map(|(_, d)| d) }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|(k, _)| k.as_str()) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceDocument)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn to_json(&self) -> Json {
        let mut m = serde_json::Map::new();
        for (k, d) in self.entries.iter() {
            m.insert(k.clone(), d.as_json().clone());
        }
        Json::Object(m)
    }
}

impl FromIterator<(String, ResourceDocument)> for KindMap {
    fn from_iter<T: IntoIterator<Item = (String, ResourceDocument)>>(iter: T) -> Self {
        let mut out = KindMap::default();
        for (k, d) in iter {
            out.insert(k, d);
        }
        out
    }
}

/// The authoritative document of an edit session and the submit payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FormData {
    Single(ResourceDocument),
    Kinds(KindMap),
}

impl Default for FormData {
    fn default() -> Self { FormData::Single(ResourceDocument::default()) }
}

impl From<ResourceDocument> for FormData {
    fn from(d: ResourceDocument) -> Self { FormData::Single(d) }
}

impl From<KindMap> for FormData {
    fn from(m: KindMap) -> Self { FormData::Kinds(m) }
}

impl FormData {
    /// Document addressed by a module kind, falling back to the single document.
    pub fn for_kind(&self, kind: &str) -> Option<&ResourceDocument> {
        match self {
            FormData::Single(d) => Some(d),
            FormData::Kinds(m) => m.get(kind),
        }
    }

    pub fn for_kind_mut(&mut self, kind: &str) -> Option<&mut ResourceDocument> {
        match self {
            FormData::Single(d) => Some(d),
            FormData::Kinds(m) => m.get_mut(kind),
        }
    }

    /// The single document, or the first entry of a kind map.
    pub fn primary(&self) -> Option<&ResourceDocument> {
        match self {
            FormData::Single(d) => Some(d),
            FormData::Kinds(m) => m.iter().next().map(|(_, d)| d),
        }
    }

    pub fn primary_mut(&mut self) -> Option<&mut ResourceDocument> {
        match self {
            FormData::Single(d) => Some(d),
            FormData::Kinds(m) => m.first_mut(),
        }
    }

    /// Documents in serialization order.
    pub fn documents(&self) -> Vec<&ResourceDocument> {
        match self {
            FormData::Single(d) => vec![d],
            FormData::Kinds(m) => m.iter().map(|(_, d)| d).collect(),
        }
    }

    pub fn is_multi(&self) -> bool { matches!(self, FormData::Kinds(_)) }

    pub fn to_json(&self) -> Json {
        match self {
            FormData::Single(d) => d.as_json().clone(),
            FormData::Kinds(m) => m.to_json(),
        }
    }
}

/// Recursive merge with lodash `merge` semantics: objects and arrays merge
/// element-wise, scalars (including null) from `overlay` win.
pub fn deep_merge(base: &mut Json, overlay: &Json) {
    match (base, overlay) {
        (Json::Object(b), Json::Object(o)) => {
            for (k, ov) in o.iter() {
                match b.get_mut(k) {
                    Some(bv) => deep_merge(bv, ov),
                    None => { b.insert(k.clone(), ov.clone()); }
                }
            }
        }
        (Json::Array(b), Json::Array(o)) => {
            for (i, ov) in o.iter().enumerate() {
                if i < b.len() {
                    deep_merge(&mut b[i], ov);
                } else {
                    b.push(ov.clone());
                }
            }
        }
        (b, o) => *b = o.clone(),
    }
}

/// One field-level validation failure raised by a structured view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: &DocPath, message: impl Into<String>) -> Self {
        Self { path: path.to_string(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("YAML syntax error at line {line}, column {column}: {message}")]
    Syntax { line: usize, column: usize, message: String },
    #[error("YAML error: {0}")]
    Invalid(String),
    #[error("YAML is empty")]
    Empty,
    #[error("document #{index} is not a mapping (got {found})")]
    NotAMapping { index: usize, found: &'static str },
    #[error("document #{index} is missing kind")]
    MissingKind { index: usize },
    #[error("YAML payload too large (>{max} bytes)")]
    TooLarge { max: usize },
    #[error("YAML document too complex (>{max} nodes)")]
    TooComplex { max: usize },
}

/// Recoverable failures of an edit session. None of them ends the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("{} field(s) failed validation", .0.len())]
    FieldValidation(Vec<FieldError>),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("a nested form has unsaved changes")]
    UnsavedSubroute,
    #[error("switching edit mode is disabled for this modal")]
    ModeLocked,
    #[error("the edited view is not active")]
    InactiveView,
    #[error("encode: {0}")]
    Encode(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Seam between the edit session and whatever structured view is hosted.
///
/// Implementations edit the session's document in place through field
/// bindings; the session only asks them about step, nested state and validity.
pub trait StructuredForm {
    /// Wizard step currently shown.
    fn current_step(&self) -> usize { 0 }

    /// Restore a previously remembered step.
    fn resume(&mut self, _step: usize) {}

    /// True while a nested sub-form holds uncommitted state.
    fn has_sub_route(&self) -> bool { false }

    fn apply_defaults(&self, _data: &mut FormData) {}

    fn validate(&self, data: &FormData) -> Result<(), Vec<FieldError>>;
}
