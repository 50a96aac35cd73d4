//! Starting documents for the create modals.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use k8s_openapi::api::autoscaling::v2::{CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kform_core::{deep_merge, DocPath, PathError, ResourceDocument};
use serde_json::{json, Value as Json};

use crate::form::{supported_access_modes, ACCESS_MODES_ANNOTATION, PROVISIONER_ANNOTATION};
use crate::ProvisionerTable;

fn to_document<T: serde::Serialize>(obj: &T) -> Result<ResourceDocument> {
    let v = serde_json::to_value(obj).context("serializing template")?;
    ResourceDocument::from_json(v).context("template is not a mapping")
}

/// New storage class for `provisioner`, with its parameter defaults filled in.
pub fn storage_class_template(name: &str, provisioner: &str, table: &ProvisionerTable) -> Result<ResourceDocument> {
    let modes: Vec<&str> = supported_access_modes(Some(provisioner), table).iter().map(|m| m.as_str()).collect();
    let annotations = BTreeMap::from([
        (PROVISIONER_ANNOTATION.to_string(), provisioner.to_string()),
        (ACCESS_MODES_ANNOTATION.to_string(), modes.join(",")),
    ]);
    let parameters: BTreeMap<String, String> = table
        .find(provisioner)
        .map(|p| p.params.iter().filter_map(|d| d.default.clone().map(|v| (d.key.clone(), v))).collect())
        .unwrap_or_default();
    let sc = StorageClass {
        metadata: ObjectMeta { name: Some(name.to_string()), annotations: Some(annotations), ..Default::default() },
        provisioner: provisioner.to_string(),
        parameters: Some(parameters),
        reclaim_policy: Some("Delete".to_string()),
        allow_volume_expansion: Some(false),
        volume_binding_mode: Some("Immediate".to_string()),
        ..Default::default()
    };
    to_document(&sc)
}

/// Target values the autoscaler form edits through annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HpaTargets {
    pub cpu_target_utilization: Option<String>,
    pub memory_target_value: Option<String>,
}

/// Autoscaler for the deployment `name`.
///
/// Built as `typed defaults <- origin <- form overlay` with object-recursive
/// merging, so an existing autoscaler keeps everything the form does not touch.
pub fn hpa_template(
    name: &str,
    namespace: &str,
    origin: Option<&ResourceDocument>,
    targets: &HpaTargets,
) -> Result<ResourceDocument> {
    let base = HorizontalPodAutoscaler {
        metadata: ObjectMeta::default(),
        spec: Some(HorizontalPodAutoscalerSpec { min_replicas: Some(1), max_replicas: 1, ..Default::default() }),
        status: None,
    };
    let mut out = serde_json::to_value(&base).context("serializing autoscaler defaults")?;
    if let Some(origin) = origin {
        deep_merge(&mut out, origin.as_json());
    }

    let scale_target_ref = CrossVersionObjectReference {
        api_version: Some("apps/v1".to_string()),
        kind: "Deployment".to_string(),
        name: name.to_string(),
    };
    let mut annotations = serde_json::Map::new();
    if let Some(cpu) = &targets.cpu_target_utilization {
        annotations.insert("cpuTargetUtilization".into(), Json::String(cpu.clone()));
    }
    if let Some(mem) = &targets.memory_target_value {
        annotations.insert("memoryTargetValue".into(), Json::String(mem.clone()));
    }
    let overlay = json!({
        "metadata": {"name": name, "namespace": namespace, "annotations": annotations},
        "spec": {"scaleTargetRef": serde_json::to_value(&scale_target_ref)?},
    });
    deep_merge(&mut out, &overlay);
    ResourceDocument::from_json(out).context("autoscaler is not a mapping")
}

/// Clear the resource version so an update is not rejected as stale.
pub fn prepare_update(doc: &mut ResourceDocument) -> Result<(), PathError> {
    doc.set(&DocPath::from_keys(["metadata", "resourceVersion"]), Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{provisioner_of, selected_access_modes};

    #[test]
    fn storage_class_template_carries_defaults() {
        let table = ProvisionerTable::builtin();
        let d = storage_class_template("fast", "disk.csi.qingcloud.com", &table).unwrap();
        assert_eq!(d.kind(), Some("StorageClass"));
        assert_eq!(d.api_version(), Some("storage.k8s.io/v1"));
        assert_eq!(provisioner_of(&d), Some("disk.csi.qingcloud.com"));
        assert_eq!(selected_access_modes(&d), Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(d.as_json()["parameters"]["fsType"], json!("ext4"));
        assert_eq!(d.as_json()["reclaimPolicy"], json!("Delete"));
    }

    #[test]
    fn custom_provisioner_gets_empty_parameters() {
        let d = storage_class_template("nfs", "example.com/nfs", &ProvisionerTable::builtin()).unwrap();
        assert_eq!(d.as_json()["parameters"], json!({}));
        assert_eq!(
            selected_access_modes(&d),
            Some(vec!["ReadWriteOnce".to_string(), "ReadOnlyMany".to_string(), "ReadWriteMany".to_string()])
        );
    }

    #[test]
    fn hpa_overlay_wins_and_origin_survives() {
        let origin = ResourceDocument::from_json(json!({
            "apiVersion": "autoscaling/v2",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "old", "resourceVersion": "42", "labels": {"app": "web"}},
            "spec": {"minReplicas": 2, "maxReplicas": 5}
        }))
        .unwrap();
        let targets = HpaTargets { cpu_target_utilization: Some("60".into()), memory_target_value: None };
        let mut d = hpa_template("web", "demo", Some(&origin), &targets).unwrap();
        let v = d.as_json();
        assert_eq!(v["metadata"]["name"], json!("web"));
        assert_eq!(v["metadata"]["labels"]["app"], json!("web"));
        assert_eq!(v["metadata"]["annotations"], json!({"cpuTargetUtilization": "60"}));
        assert_eq!(v["spec"]["minReplicas"], json!(2));
        assert_eq!(v["spec"]["scaleTargetRef"], json!({"apiVersion": "apps/v1", "kind": "Deployment", "name": "web"}));
        prepare_update(&mut d).unwrap();
        assert_eq!(d.as_json()["metadata"]["resourceVersion"], Json::Null);
    }

    #[test]
    fn hpa_without_origin_uses_replica_defaults() {
        let d = hpa_template("web", "demo", None, &HpaTargets::default()).unwrap();
        assert_eq!(d.kind(), Some("HorizontalPodAutoscaler"));
        assert_eq!(d.as_json()["spec"]["minReplicas"], json!(1));
        assert_eq!(d.as_json()["spec"]["maxReplicas"], json!(1));
    }
}
