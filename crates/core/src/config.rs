//! Runtime knobs, read once from `KFORM_*` environment variables and passed down explicitly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Upper bound on YAML text accepted by the codec.
    pub max_yaml_bytes: usize,
    /// Upper bound on decoded JSON nodes.
    pub max_yaml_nodes: usize,
    pub locale: String,
    /// Field manager used for server-side apply.
    pub field_manager: String,
    pub modal_width: u32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            max_yaml_bytes: 1_000_000, // 1 MiB default
            max_yaml_nodes: 100_000,
            locale: "en".to_string(),
            field_manager: "kform".to_string(),
            modal_width: 960,
        }
    }
}

impl FormConfig {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from an arbitrary variable source; unparsable values keep the default.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            max_yaml_bytes: get("KFORM_MAX_YAML_BYTES")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(d.max_yaml_bytes),
            max_yaml_nodes: get("KFORM_MAX_YAML_NODES")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(d.max_yaml_nodes),
            locale: get("KFORM_LOCALE").filter(|s| !s.trim().is_empty()).unwrap_or(d.locale),
            field_manager: get("KFORM_FIELD_MANAGER").filter(|s| !s.trim().is_empty()).unwrap_or(d.field_manager),
            modal_width: get("KFORM_MODAL_WIDTH")
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|w| *w > 0)
                .unwrap_or(d.modal_width),
        }
    }
}
