//! Kform apply: hands edited documents to a cluster.
//!
//! Submission is fire-and-forget from the session's point of view: the host
//! passes the confirmed [`FormData`] to [`spawn_submit`] and reads
//! [`SubmitUpdate`]s back on its own thread.

#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use kform_core::{FormConfig, FormData, ResourceDocument, ResourceId};
use kube::{
    api::{Api, Patch, PatchParams},
    core::{DynamicObject, GroupVersionKind},
    discovery::{Discovery, Scope},
    Client,
};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitMode {
    /// Refuses to touch an existing object.
    Create,
    Update,
    /// Server-side validation only; nothing is persisted.
    DryRun,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub id: ResourceId,
    pub dry_run: bool,
    pub applied: bool,
    pub new_rv: Option<String>,
    pub summary: DiffSummary,
}

/// Where a submitted document goes.
#[async_trait::async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, doc: &ResourceDocument, mode: SubmitMode) -> Result<SubmitOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    gvk: GroupVersionKind,
    name: String,
    ns: Option<String>,
}

fn target_of(doc: &ResourceDocument) -> Result<Target> {
    let api_version = doc.api_version().ok_or_else(|| anyhow!("document missing apiVersion"))?;
    let kind = doc.kind().filter(|k| !k.is_empty()).ok_or_else(|| anyhow!("document missing kind"))?;
    let (group, version) = match api_version.split_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    let name = doc.name().ok_or_else(|| anyhow!("document missing metadata.name"))?.to_string();
    Ok(Target {
        gvk: GroupVersionKind { group, version, kind: kind.to_string() },
        name,
        ns: doc.namespace().map(str::to_string),
    })
}

/// Drop server-populated fields so diffs and patches only carry user intent.
fn strip_noisy(mut v: Json) -> Json {
    if let Some(obj) = v.get_mut("metadata").and_then(Json::as_object_mut) {
        obj.remove("managedFields");
        obj.remove("resourceVersion");
        obj.remove("generation");
        obj.remove("creationTimestamp");
        obj.remove("uid");
    }
    if let Some(obj) = v.as_object_mut() {
        obj.remove("status");
    }
    v
}

pub fn diff_summary(target: &Json, base: &Json) -> DiffSummary {
    fn walk(a: &Json, b: &Json, out: &mut DiffSummary) {
        match (a, b) {
            (Json::Object(ao), Json::Object(bo)) => {
                for (k, av) in ao.iter() {
                    match bo.get(k) {
                        Some(bv) if av == bv => {}
                        Some(bv) => walk(av, bv, out),
                        None => out.adds += 1,
                    }
                }
                out.removes += bo.keys().filter(|k| !ao.contains_key(*k)).count();
            }
            (Json::Array(aa), Json::Array(bb)) => {
                out.updates += aa.iter().zip(bb.iter()).filter(|(x, y)| x != y).count();
                out.adds += aa.len().saturating_sub(bb.len());
                out.removes += bb.len().saturating_sub(aa.len());
            }
            (av, bv) => {
                if av != bv {
                    out.updates += 1;
                }
            }
        }
    }
    let mut out = DiffSummary::default();
    walk(target, base, &mut out);
    out
}

async fn find_api_resource(client: Client, gvk: &GroupVersionKind) -> Result<(kube::core::ApiResource, bool)> {
    let discovery = Discovery::new(client).run().await.context("running API discovery")?;
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            if ar.group == gvk.group && ar.version == gvk.version && ar.kind == gvk.kind {
                return Ok((ar.clone(), matches!(caps.scope, Scope::Namespaced)));
            }
        }
    }
    Err(anyhow!("GVK not found: {}/{}/{}", gvk.group, gvk.version, gvk.kind))
}

/// Server-side apply against the current kube context.
#[derive(Clone)]
pub struct KubeSubmitter {
    client: Client,
    field_manager: String,
}

impl KubeSubmitter {
    pub fn new(client: Client, cfg: &FormConfig) -> Self { Self { client, field_manager: cfg.field_manager.clone() } }

    /// Client from the local kubeconfig or in-cluster environment.
    pub async fn try_default(cfg: &FormConfig) -> Result<Self> {
        let client = Client::try_default().await.context("building kube client")?;
        Ok(Self::new(client, cfg))
    }
}

impl KubeSubmitter {
    async fn apply_one(&self, doc: &ResourceDocument, mode: SubmitMode) -> Result<SubmitOutcome> {
        let target = target_of(doc)?;
        let (ar, namespaced) = find_api_resource(self.client.clone(), &target.gvk).await?;
        let api: Api<DynamicObject> = if namespaced {
            match target.ns.as_deref() {
                Some(n) => Api::namespaced_with(self.client.clone(), n, &ar),
                None => bail!("namespace required for namespaced kind {}", target.gvk.kind),
            }
        } else {
            Api::all_with(self.client.clone(), &ar)
        };

        let live = match api.get_opt(&target.name).await? {
            Some(obj) => Some(strip_noisy(serde_json::to_value(&obj)?)),
            None => None,
        };
        if mode == SubmitMode::Create && live.is_some() {
            bail!("{} already exists", doc.id());
        }
        let payload = strip_noisy(doc.as_json().clone());
        let summary = diff_summary(&payload, live.as_ref().unwrap_or(&Json::Null));

        let mut pp = PatchParams::apply(&self.field_manager);
        if mode == SubmitMode::DryRun {
            pp = pp.dry_run();
        }
        let obj = api
            .patch(&target.name, &pp, &Patch::Apply(&payload))
            .await
            .map_err(|e| anyhow!("server-side apply of {} failed: {}", doc.id(), e))?;
        let dry_run = mode == SubmitMode::DryRun;
        info!(id = %doc.id(), ?mode, adds = summary.adds, updates = summary.updates, removes = summary.removes, "submitted");
        Ok(SubmitOutcome {
            id: doc.id(),
            dry_run,
            applied: !dry_run,
            new_rv: if dry_run { None } else { obj.metadata.resource_version.clone() },
            summary,
        })
    }
}

/// Count an attempt and its outcome, whichever step failed.
async fn metered<F>(submit: F) -> Result<SubmitOutcome>
where
    F: std::future::Future<Output = Result<SubmitOutcome>>,
{
    let t0 = std::time::Instant::now();
    counter!("kform_submit_attempts", 1u64);
    let res = submit.await;
    match &res {
        Ok(_) => {
            histogram!("kform_submit_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
            counter!("kform_submit_ok", 1u64);
        }
        Err(_) => {
            counter!("kform_submit_err", 1u64);
        }
    }
    res
}

#[async_trait::async_trait]
impl Submitter for KubeSubmitter {
    async fn submit(&self, doc: &ResourceDocument, mode: SubmitMode) -> Result<SubmitOutcome> {
        metered(self.apply_one(doc, mode)).await
    }
}

/// In-memory submitter for tests and offline runs.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    records: Mutex<Vec<(ResourceDocument, SubmitMode)>>,
    reject_kinds: Vec<String>,
}

impl RecordingSubmitter {
    pub fn new() -> Self { Self::default() }

    /// Fail every document of `kind`.
    pub fn rejecting(mut self, kind: impl Into<String>) -> Self {
        self.reject_kinds.push(kind.into());
        self
    }

    pub fn records(&self) -> Vec<(ResourceDocument, SubmitMode)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(&self, doc: &ResourceDocument, mode: SubmitMode) -> Result<SubmitOutcome> {
        let id = doc.id();
        if self.reject_kinds.iter().any(|k| *k == id.kind) {
            bail!("{} rejected", id);
        }
        let summary = diff_summary(&strip_noisy(doc.as_json().clone()), &Json::Null);
        self.records
            .lock()
            .map_err(|_| anyhow!("recording submitter poisoned"))?
            .push((doc.clone(), mode));
        Ok(SubmitOutcome { id, dry_run: mode == SubmitMode::DryRun, applied: mode != SubmitMode::DryRun, new_rv: None, summary })
    }
}

/// Submit `docs` in order, stopping at the first failure.
///
/// Takes documents as they appeared in a manifest stream, so several of one
/// kind are all submitted.
pub async fn submit_documents(submitter: &dyn Submitter, docs: &[&ResourceDocument], mode: SubmitMode) -> Result<Vec<SubmitOutcome>> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        let outcome = submitter.submit(doc, mode).await.with_context(|| format!("submitting {}", doc.id()))?;
        out.push(outcome);
    }
    Ok(out)
}

/// Submit the documents of a confirmed form, stopping at the first failure.
pub async fn submit_form_data(submitter: &dyn Submitter, data: &FormData, mode: SubmitMode) -> Result<Vec<SubmitOutcome>> {
    submit_documents(submitter, &data.documents(), mode).await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitUpdate {
    Started { total: usize },
    Applied(SubmitOutcome),
    Failed { id: ResourceId, error: String },
    Finished { ok: usize, failed: usize },
}

/// Submit on a background task, reporting each document through `tx`.
///
/// Every document is attempted even if an earlier one fails.
pub fn spawn_submit(
    submitter: Arc<dyn Submitter>,
    data: FormData,
    mode: SubmitMode,
    tx: mpsc::Sender<SubmitUpdate>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let docs = data.documents();
        let _ = tx.send(SubmitUpdate::Started { total: docs.len() });
        let (mut ok, mut failed) = (0usize, 0usize);
        for doc in docs {
            match submitter.submit(doc, mode).await {
                Ok(outcome) => {
                    ok += 1;
                    let _ = tx.send(SubmitUpdate::Applied(outcome));
                }
                Err(e) => {
                    failed += 1;
                    warn!(id = %doc.id(), error = %e, "submit failed");
                    let _ = tx.send(SubmitUpdate::Failed { id: doc.id(), error: format!("{:#}", e) });
                }
            }
        }
        let _ = tx.send(SubmitUpdate::Finished { ok, failed });
        debug!(ok, failed, "submit task ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Json) -> ResourceDocument { ResourceDocument::from_json(v).unwrap() }

    #[test]
    fn strip_noisy_prunes_server_fields() {
        let pruned = strip_noisy(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "x",
                "managedFields": [{"foo": "bar"}],
                "resourceVersion": null,
                "generation": 5,
                "uid": "0b6f",
                "creationTimestamp": "2020-01-01T00:00:00Z"
            },
            "status": {"obs": true},
            "data": {"k": "v"}
        }));
        assert_eq!(pruned, json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "x"}, "data": {"k": "v"}}));
    }

    #[test]
    fn diff_summary_counts_adds_updates_removes() {
        let base = json!({"a": 1, "b": {"x": 1}, "c": [1, 2, 3]});
        let target = json!({"a": 2, "b": {"x": 1, "y": 2}, "c": [1, 9], "d": true});
        assert_eq!(diff_summary(&target, &base), DiffSummary { adds: 2, updates: 2, removes: 1 });
    }

    #[test]
    fn target_errors_are_friendly() {
        let e1 = target_of(&doc(json!({"kind": "Foo", "metadata": {"name": "x"}}))).unwrap_err().to_string();
        assert!(e1.contains("missing apiVersion"), "e1={}", e1);
        let e2 = target_of(&doc(json!({"apiVersion": "v1", "metadata": {"name": "x"}}))).unwrap_err().to_string();
        assert!(e2.contains("missing kind"), "e2={}", e2);
        let e3 = target_of(&doc(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {}}))).unwrap_err().to_string();
        assert!(e3.contains("missing metadata.name"), "e3={}", e3);

        let t = target_of(&doc(json!({"apiVersion": "storage.k8s.io/v1", "kind": "StorageClass", "metadata": {"name": "fast"}})))
            .unwrap();
        assert_eq!(t.gvk.group, "storage.k8s.io");
        assert_eq!(t.gvk.version, "v1");
        assert_eq!(t.ns, None);
    }

    #[tokio::test]
    async fn metered_counts_every_failure() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder.install().unwrap();

        let id = doc(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "x"}})).id();
        let ok = SubmitOutcome { id, dry_run: true, applied: false, new_rv: None, summary: DiffSummary::default() };
        assert!(metered(async { Ok(ok) }).await.is_ok());
        // a failure before the patch call, e.g. an unresolvable kind
        assert!(metered(async { Err(anyhow!("GVK not found")) }).await.is_err());

        let snapshot = snapshotter.snapshot().into_vec();
        let counter = |name: &str| -> u64 {
            snapshot
                .iter()
                .filter(|(k, _, _, _)| k.key().name() == name)
                .map(|(_, _, _, v)| match v {
                    DebugValue::Counter(n) => *n,
                    _ => 0,
                })
                .sum()
        };
        assert_eq!(counter("kform_submit_attempts"), 2);
        assert_eq!(counter("kform_submit_ok"), 1);
        assert_eq!(counter("kform_submit_err"), 1);
    }
}
