use std::sync::{mpsc, Arc};

use kform_apply::{spawn_submit, submit_documents, submit_form_data, RecordingSubmitter, SubmitMode, SubmitUpdate, Submitter};
use kform_codec::Codec;
use kform_core::FormData;

const STREAM: &str = "\
apiVersion: types.kubefed.io/v1beta1
kind: FederatedDeployment
metadata:
  name: web
  namespace: demo
---
apiVersion: types.kubefed.io/v1beta1
kind: FederatedService
metadata:
  name: web
  namespace: demo
";

fn kinds() -> FormData { Codec::default().decode_form_data(STREAM).unwrap() }

#[tokio::test]
async fn every_document_is_reported() {
    let submitter = Arc::new(RecordingSubmitter::new());
    let (tx, rx) = mpsc::channel();
    spawn_submit(submitter.clone(), kinds(), SubmitMode::Create, tx).await.unwrap();

    let updates: Vec<SubmitUpdate> = rx.try_iter().collect();
    assert_eq!(updates.first(), Some(&SubmitUpdate::Started { total: 2 }));
    let applied: Vec<_> = updates
        .iter()
        .filter_map(|u| match u {
            SubmitUpdate::Applied(o) => Some(o.id.kind.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(applied, vec!["FederatedDeployment", "FederatedService"]);
    assert_eq!(updates.last(), Some(&SubmitUpdate::Finished { ok: 2, failed: 0 }));
    assert_eq!(submitter.records().len(), 2);
}

#[tokio::test]
async fn failures_do_not_stop_the_task() {
    let submitter = Arc::new(RecordingSubmitter::new().rejecting("FederatedDeployment"));
    let (tx, rx) = mpsc::channel();
    spawn_submit(submitter.clone(), kinds(), SubmitMode::Update, tx).await.unwrap();

    let updates: Vec<SubmitUpdate> = rx.try_iter().collect();
    assert!(matches!(&updates[1], SubmitUpdate::Failed { id, error } if id.kind == "FederatedDeployment" && error.contains("rejected")));
    assert_eq!(updates.last(), Some(&SubmitUpdate::Finished { ok: 1, failed: 1 }));
    assert_eq!(submitter.records()[0].1, SubmitMode::Update);
}

#[tokio::test]
async fn sequential_submit_stops_at_first_error() {
    let submitter = RecordingSubmitter::new().rejecting("FederatedDeployment");
    let err = submit_form_data(&submitter, &kinds(), SubmitMode::Create).await.unwrap_err();
    assert!(format!("{:#}", err).contains("submitting FederatedDeployment demo/web"));
    assert!(submitter.records().is_empty());
}

#[tokio::test]
async fn dry_run_is_not_applied() {
    let submitter = RecordingSubmitter::new();
    let doc = kinds().primary().cloned().unwrap();
    let out = submitter.submit(&doc, SubmitMode::DryRun).await.unwrap();
    assert!(out.dry_run);
    assert!(!out.applied);
}

#[tokio::test]
async fn manifest_streams_submit_every_same_kind_document() {
    let text = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: b
";
    let decoded = Codec::default().decode(text).unwrap();
    let submitter = RecordingSubmitter::new();
    let outcomes = submit_documents(&submitter, &decoded.documents(), SubmitMode::DryRun).await.unwrap();

    let names: Vec<_> = outcomes.iter().filter_map(|o| o.id.name.clone()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(submitter.records().len(), 2);
    assert!(outcomes.iter().all(|o| o.dry_run));
}
