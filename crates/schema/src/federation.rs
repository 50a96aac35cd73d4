//! Placement and per-cluster overrides of federated documents.
//!
//! A federated document lists its target clusters under
//! `spec.placement.clusters` and keeps per-cluster differences under
//! `spec.overrides` as `{clusterName, clusterOverrides: [{path, value}]}`
//! entries, where `path` is a JSON pointer into `spec.template`.

use kform_core::{DocPath, PathError, ResourceDocument};
use serde_json::{json, Value as Json};

fn placement_path() -> DocPath { DocPath::from_keys(["spec", "placement", "clusters"]) }

fn overrides_path() -> DocPath { DocPath::from_keys(["spec", "overrides"]) }

pub fn placement_clusters(doc: &ResourceDocument) -> Vec<String> {
    match doc.get(&placement_path()) {
        Some(Json::Array(items)) => items
            .iter()
            .filter_map(|c| c.get("name").and_then(Json::as_str))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Replace the placement and drop the overrides of clusters no longer selected.
pub fn select_clusters(doc: &mut ResourceDocument, clusters: &[String]) -> Result<(), PathError> {
    if let Some(Json::Array(overrides)) = doc.get_mut(&overrides_path()) {
        for entry in overrides.iter_mut() {
            let selected = entry
                .get("clusterName")
                .and_then(Json::as_str)
                .map(|name| clusters.iter().any(|c| c == name))
                .unwrap_or(false);
            let has_overrides = entry
                .get("clusterOverrides")
                .and_then(Json::as_array)
                .map(|a| !a.is_empty())
                .unwrap_or(false);
            if !selected && has_overrides {
                entry["clusterOverrides"] = json!([]);
            }
        }
    }
    let placement = clusters.iter().map(|name| json!({ "name": name })).collect();
    doc.set(&placement_path(), Json::Array(placement))
}

fn override_entry<'a>(doc: &'a ResourceDocument, cluster: &str) -> Option<&'a Json> {
    doc.get(&overrides_path())?
        .as_array()?
        .iter()
        .find(|e| e.get("clusterName").and_then(Json::as_str) == Some(cluster))
}

pub fn cluster_override<'a>(doc: &'a ResourceDocument, cluster: &str, pointer: &str) -> Option<&'a Json> {
    override_entry(doc, cluster)?
        .get("clusterOverrides")?
        .as_array()?
        .iter()
        .find(|o| o.get("path").and_then(Json::as_str) == Some(pointer))
        .and_then(|o| o.get("value"))
}

/// Insert or replace the override at `pointer` for `cluster`.
pub fn set_cluster_override(doc: &mut ResourceDocument, cluster: &str, pointer: &str, value: Json) -> Result<(), PathError> {
    let path = overrides_path();
    if doc.get(&path).map(|v| !v.is_array()).unwrap_or(true) {
        doc.set(&path, json!([]))?;
    }
    let Some(Json::Array(entries)) = doc.get_mut(&path) else {
        return Err(PathError::NotAContainer { at: path.to_string(), found: "scalar" });
    };
    let idx = match entries.iter().position(|e| e.get("clusterName").and_then(Json::as_str) == Some(cluster)) {
        Some(i) => i,
        None => {
            entries.push(json!({ "clusterName": cluster, "clusterOverrides": [] }));
            entries.len() - 1
        }
    };
    let entry = &mut entries[idx];
    if !entry.get("clusterOverrides").map(Json::is_array).unwrap_or(false) {
        entry["clusterOverrides"] = json!([]);
    }
    if let Some(Json::Array(list)) = entry.get_mut("clusterOverrides") {
        match list.iter_mut().find(|o| o.get("path").and_then(Json::as_str) == Some(pointer)) {
            Some(o) => o["value"] = value,
            None => list.push(json!({ "path": pointer, "value": value })),
        }
    }
    Ok(())
}

fn unescape_token(t: &str) -> String { t.replace("~1", "/").replace("~0", "~") }

fn apply_pointer(target: &mut Json, pointer: &str, value: Json) -> bool {
    if let Some(slot) = target.pointer_mut(pointer) {
        *slot = value;
        return true;
    }
    let Some((parent, last)) = pointer.rsplit_once('/') else { return false };
    match target.pointer_mut(parent) {
        Some(Json::Object(map)) => {
            map.insert(unescape_token(last), value);
            true
        }
        _ => false,
    }
}

/// `spec.template` as it will be applied on `cluster`. Overrides whose
/// parent does not exist are skipped.
pub fn effective_for_cluster(doc: &ResourceDocument, cluster: &str) -> Option<Json> {
    let mut template = doc.get(&DocPath::from_keys(["spec", "template"]))?.clone();
    let overrides = override_entry(doc, cluster)
        .and_then(|e| e.get("clusterOverrides"))
        .and_then(Json::as_array)
        .cloned()
        .unwrap_or_default();
    for o in overrides {
        let (Some(pointer), Some(value)) = (o.get("path").and_then(Json::as_str), o.get("value")) else { continue };
        if !apply_pointer(&mut template, pointer, value.clone()) {
            tracing::debug!(%cluster, %pointer, "override target missing; skipped");
        }
    }
    Some(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fed() -> ResourceDocument {
        ResourceDocument::from_json(json!({
            "kind": "FederatedDeployment",
            "spec": {
                "placement": {"clusters": [{"name": "host"}, {"name": "edge"}]},
                "template": {"spec": {"replicas": 1, "template": {"spec": {"containers": [{"image": "nginx"}]}}}},
                "overrides": [
                    {"clusterName": "host", "clusterOverrides": []},
                    {"clusterName": "edge", "clusterOverrides": [{"path": "/spec/replicas", "value": 3}]}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn deselecting_a_cluster_clears_its_overrides() {
        let mut d = fed();
        assert_eq!(placement_clusters(&d), vec!["host", "edge"]);
        select_clusters(&mut d, &["host".to_string()]).unwrap();
        assert_eq!(placement_clusters(&d), vec!["host"]);
        assert_eq!(d.as_json()["spec"]["overrides"][1]["clusterOverrides"], json!([]));
        assert_eq!(d.as_json()["spec"]["overrides"][1]["clusterName"], json!("edge"));
    }

    #[test]
    fn overrides_are_upserted_per_path() {
        let mut d = fed();
        set_cluster_override(&mut d, "edge", "/spec/replicas", json!(5)).unwrap();
        set_cluster_override(&mut d, "west", "/spec/template/spec/containers/0/image", json!("nginx:1.25")).unwrap();
        assert_eq!(cluster_override(&d, "edge", "/spec/replicas"), Some(&json!(5)));
        assert_eq!(cluster_override(&d, "host", "/spec/replicas"), None);
        let west = effective_for_cluster(&d, "west").unwrap();
        assert_eq!(west["spec"]["template"]["spec"]["containers"][0]["image"], json!("nginx:1.25"));
        assert_eq!(effective_for_cluster(&d, "edge").unwrap()["spec"]["replicas"], json!(5));
        assert_eq!(effective_for_cluster(&d, "host").unwrap()["spec"]["replicas"], json!(1));
    }

    #[test]
    fn overrides_start_from_nothing() {
        let mut d = ResourceDocument::from_json(json!({"kind": "FederatedService"})).unwrap();
        set_cluster_override(&mut d, "host", "/metadata/labels/tier", json!("edge")).unwrap();
        assert_eq!(cluster_override(&d, "host", "/metadata/labels/tier"), Some(&json!("edge")));
        assert_eq!(effective_for_cluster(&d, "host"), None);
    }
}
