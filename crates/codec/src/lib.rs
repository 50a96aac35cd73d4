//! Kform codec: converts resource documents to YAML text and back.
//!
//! Decoding accepts multi-document streams; stray separators (empty
//! documents) are skipped. Oversized or overly complex payloads are refused
//! before they reach the session.

#![forbid(unsafe_code)]

use kform_core::{json_type_name, DecodeError, DocumentSet, FormConfig, FormData, ResourceDocument};
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

/// Result of decoding text: one document, or several in stream order.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Single(ResourceDocument),
    Many(DocumentSet),
}

impl Decoded {
    /// Multi-document results are folded into a kind-keyed map.
    pub fn into_form_data(self) -> FormData {
        match self {
            Decoded::Single(d) => FormData::Single(d),
            Decoded::Many(set) => FormData::Kinds(set.fold()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Decoded::Single(_) => 1,
            Decoded::Many(set) => set.len(),
        }
    }

    /// Every decoded document in stream order, same-kind entries included.
    pub fn documents(&self) -> Vec<&ResourceDocument> {
        match self {
            Decoded::Single(d) => vec![d],
            Decoded::Many(set) => set.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    max_bytes: usize,
    max_nodes: usize,
}

impl Default for Codec {
    fn default() -> Self { Self::from_config(&FormConfig::default()) }
}

/// True when `v` holds more than `max` nodes. The walk stops at `max + 1`.
fn node_budget_exceeded(v: &Json, max: usize) -> bool {
    let limit = max.saturating_add(1);
    fn walk(v: &Json, cur: &mut usize, limit: usize) {
        if *cur >= limit { return; }
        *cur += 1;
        match v {
            Json::Object(map) => {
                for vv in map.values() {
                    if *cur >= limit { break; }
                    walk(vv, cur, limit);
                }
            }
            Json::Array(arr) => {
                for vv in arr.iter() {
                    if *cur >= limit { break; }
                    walk(vv, cur, limit);
                }
            }
            _ => {}
        }
    }
    let mut count = 0usize;
    walk(v, &mut count, limit);
    count > max
}

fn yaml_error(e: serde_yaml::Error) -> DecodeError {
    match e.location() {
        Some(loc) => DecodeError::Syntax { line: loc.line(), column: loc.column(), message: e.to_string() },
        None => DecodeError::Invalid(e.to_string()),
    }
}

impl Codec {
    pub fn new(max_bytes: usize, max_nodes: usize) -> Self {
        Self { max_bytes: max_bytes.max(1), max_nodes: max_nodes.max(1) }
    }

    pub fn from_config(cfg: &FormConfig) -> Self { Self::new(cfg.max_yaml_bytes, cfg.max_yaml_nodes) }

    pub fn encode_document(&self, doc: &ResourceDocument) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(doc.as_json())
    }

    /// Encode form data; kind maps become a `---` separated stream in map order.
    pub fn encode(&self, data: &FormData) -> Result<String, serde_yaml::Error> {
        let docs = data.documents();
        let mut out = String::new();
        for (i, doc) in docs.iter().enumerate() {
            if i > 0 {
                out.push_str("---\n");
            }
            out.push_str(&self.encode_document(doc)?);
        }
        Ok(out)
    }

    pub fn decode(&self, text: &str) -> Result<Decoded, DecodeError> {
        if text.len() > self.max_bytes {
            return Err(DecodeError::TooLarge { max: self.max_bytes });
        }
        let mut docs: Vec<ResourceDocument> = Vec::new();
        for (index, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
            let json = Json::deserialize(de).map_err(yaml_error)?;
            if json.is_null() {
                continue;
            }
            if node_budget_exceeded(&json, self.max_nodes) {
                return Err(DecodeError::TooComplex { max: self.max_nodes });
            }
            let found = json_type_name(&json);
            let doc = ResourceDocument::from_json(json).map_err(|_| DecodeError::NotAMapping { index, found })?;
            docs.push(doc);
        }
        debug!(documents = docs.len(), bytes = text.len(), "decoded yaml");
        match docs.len() {
            0 => Err(DecodeError::Empty),
            1 => Ok(Decoded::Single(docs.remove(0))),
            _ => Ok(Decoded::Many(DocumentSet::from(docs))),
        }
    }

    /// Decode and fold in one step.
    pub fn decode_form_data(&self, text: &str) -> Result<FormData, DecodeError> {
        self.decode(text).map(Decoded::into_form_data)
    }
}
