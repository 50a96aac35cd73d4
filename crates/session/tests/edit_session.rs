use std::sync::{Arc, Mutex};

use kform_codec::Codec;
use kform_core::{Catalog, DecodeError, DocPath, FormData, FormError, ResourceDocument, StructuredForm};
use kform_schema::templates::storage_class_template;
use kform_schema::{ProvisionerTable, StorageClassSettings, WidgetRegistry};
use kform_session::{
    CreateResourceModal, EditMode, EditSession, ModalOptions, ModePolicy, NoticeLevel, WizardForm, WizardStep,
};
use serde_json::json;

fn settings() -> StorageClassSettings {
    StorageClassSettings::new(Arc::new(ProvisionerTable::builtin()), Arc::new(WidgetRegistry::default()))
}

fn qingcloud() -> FormData {
    FormData::Single(storage_class_template("fast", "disk.csi.qingcloud.com", &ProvisionerTable::builtin()).unwrap())
}

fn fs_type() -> DocPath { DocPath::parse("parameters.fsType").unwrap() }

#[test]
fn untouched_template_submits_unchanged() {
    let template = qingcloud();
    let mut session = EditSession::new(&template, Codec::default(), ModePolicy::Free).unwrap();
    assert_eq!(session.submit(&settings()).unwrap(), template);
}

#[test]
fn defaults_are_filled_on_submit() {
    let bare = FormData::Single(
        ResourceDocument::from_json(json!({
            "apiVersion": "storage.k8s.io/v1",
            "kind": "StorageClass",
            "metadata": {"name": "rbd"},
            "provisioner": "kubernetes.io/rbd",
            "parameters": {"monitors": "10.0.0.1:6789", "adminSecretName": "ceph"}
        }))
        .unwrap(),
    );
    let mut session = EditSession::new(&bare, Codec::default(), ModePolicy::Free).unwrap();
    let out = session.submit(&settings()).unwrap();
    let doc = out.primary().unwrap();
    assert_eq!(doc.as_json()["parameters"]["pool"], json!("rbd"));
    assert_eq!(
        doc.as_json()["metadata"]["annotations"]["storageclass.kubesphere.io/supported-access-modes"],
        json!("ReadWriteOnce,ReadOnlyMany")
    );
}

#[test]
fn structured_edits_survive_a_round_trip_through_code() {
    let mut form = settings();
    let mut session = EditSession::new(&qingcloud(), Codec::default(), ModePolicy::Free).unwrap();
    session.set_field(&fs_type(), json!("xfs")).unwrap();

    assert_eq!(session.toggle_mode(&mut form).unwrap(), EditMode::Textual);
    assert!(session.code().unwrap().contains("fsType: xfs"));
    assert_eq!(session.toggle_mode(&mut form).unwrap(), EditMode::Structured);
    assert_eq!(session.field(&fs_type()), Some(&json!("xfs")));
}

#[test]
fn code_edits_become_the_document() {
    let mut form = settings();
    let mut session = EditSession::new(&qingcloud(), Codec::default(), ModePolicy::Free).unwrap();
    session.toggle_mode(&mut form).unwrap();
    let edited = session.code().unwrap().replace("fsType: ext4", "fsType: ext3");
    session.set_code(edited).unwrap();
    session.toggle_mode(&mut form).unwrap();
    assert_eq!(session.field(&fs_type()), Some(&json!("ext3")));
}

#[test]
fn wizard_resumes_at_the_remembered_step() {
    let mut wizard = WizardForm::new(vec![
        WizardStep::new("basic").require(DocPath::from_keys(["metadata", "name"])),
        WizardStep::new("settings"),
        WizardStep::new("advanced"),
    ]);
    let template = qingcloud();
    let mut session = EditSession::new(&template, Codec::default(), ModePolicy::Free).unwrap();
    wizard.next(session.document()).unwrap();
    wizard.next(session.document()).unwrap();
    assert_eq!(wizard.current_step(), 2);

    session.toggle_mode(&mut wizard).unwrap();
    wizard.resume(0);
    session.toggle_mode(&mut wizard).unwrap();
    assert_eq!(wizard.current_step(), 2);
}

#[test]
fn invalid_code_leaves_the_document_alone() {
    let mut form = settings();
    let mut session = EditSession::new(&qingcloud(), Codec::default(), ModePolicy::Free).unwrap();
    session.toggle_mode(&mut form).unwrap();
    let before = session.document().clone();

    session.set_code("kind: StorageClass\nparameters: [unclosed\n").unwrap();
    let err = session.toggle_mode(&mut form).unwrap_err();
    assert!(matches!(err, FormError::Decode(DecodeError::Syntax { .. })), "got {:?}", err);
    assert_eq!(session.mode(), EditMode::Textual);
    assert_eq!(session.document(), &before);
    assert!(session.last_error().is_some());
}

#[test]
fn federated_stream_folds_to_base_kinds() {
    let mut form = WizardForm::new(vec![WizardStep::new("basic")]);
    let mut session = EditSession::new(&FormData::default(), Codec::default(), ModePolicy::Free).unwrap();
    session.toggle_mode(&mut form).unwrap();
    session
        .set_code("kind: FederatedDeployment\nmetadata:\n  name: web\n---\nkind: Service\nmetadata:\n  name: web\n")
        .unwrap();
    session.toggle_mode(&mut form).unwrap();
    match session.document() {
        FormData::Kinds(m) => assert_eq!(m.keys().collect::<Vec<_>>(), vec!["Deployment", "Service"]),
        other => panic!("expected kind map, got {:?}", other),
    }
}

#[test]
fn module_kind_addresses_one_entry_of_a_kind_map() {
    let stream = "kind: FederatedDeployment\nmetadata:\n  name: web\n---\nkind: HorizontalPodAutoscaler\nmetadata:\n  name: web\n";
    let template = Codec::default().decode_form_data(stream).unwrap();
    let mut session =
        EditSession::new(&template, Codec::default(), ModePolicy::Free).unwrap().with_module_kind("HorizontalPodAutoscaler");
    let mut wizard = WizardForm::new(vec![WizardStep::new("scaling").require(DocPath::from_keys(["spec", "maxReplicas"]))])
        .with_module_kind("HorizontalPodAutoscaler");
    let max = DocPath::from_keys(["spec", "maxReplicas"]);

    assert!(wizard.next(session.document()).is_err());
    session.set_field(&max, json!(4)).unwrap();
    assert_eq!(session.field(&max), Some(&json!(4)));
    assert_eq!(session.document().for_kind("Deployment").and_then(|d| d.get(&max)), None);
    assert!(wizard.next(session.document()).is_ok());

    let data = session.submit(&wizard).unwrap();
    assert_eq!(data.for_kind("HorizontalPodAutoscaler").and_then(|d| d.get(&max)), Some(&json!(4)));
}

#[test]
fn nested_form_blocks_leaving_structured_mode() {
    let mut wizard = WizardForm::new(vec![WizardStep::new("containers")]);
    wizard.open_sub_route("container");
    let mut session = EditSession::new(&qingcloud(), Codec::default(), ModePolicy::Free).unwrap();
    assert_eq!(session.toggle_mode(&mut wizard), Err(FormError::UnsavedSubroute));
    assert_eq!(session.mode(), EditMode::Structured);
}

#[test]
fn structured_validation_errors_are_reported() {
    let template = FormData::Single(ResourceDocument::from_json(json!({"kind": "StorageClass"})).unwrap());
    let mut session = EditSession::new(&template, Codec::default(), ModePolicy::Free).unwrap();
    match session.submit(&settings()) {
        Err(FormError::FieldValidation(errors)) => assert_eq!(errors[0].path, "provisioner"),
        other => panic!("expected field errors, got {:?}", other),
    }
}

fn modal(options: ModalOptions) -> (CreateResourceModal, Arc<Mutex<Vec<FormData>>>, Arc<Mutex<usize>>) {
    let submitted = Arc::new(Mutex::new(Vec::new()));
    let cancelled = Arc::new(Mutex::new(0usize));
    let (s, c) = (submitted.clone(), cancelled.clone());
    let m = CreateResourceModal::new(qingcloud(), options, Codec::default(), Arc::new(Catalog::default()))
        .on_ok(move |data| s.lock().unwrap().push(data))
        .on_cancel(move || *c.lock().unwrap() += 1);
    (m, submitted, cancelled)
}

#[test]
fn modal_shows_a_fresh_session_each_time() {
    let (mut m, _, _) = modal(ModalOptions { name: "Storage Class".into(), ..Default::default() });
    assert!(!m.is_visible());
    m.set_visible(true).unwrap();
    m.session_mut().unwrap().set_field(&fs_type(), json!("xfs")).unwrap();
    m.set_visible(false).unwrap();
    m.set_visible(true).unwrap();
    assert_eq!(m.session().unwrap().field(&fs_type()), Some(&json!("ext4")));
    assert_eq!(m.title(), "Create Storage Class");
    assert!(m.shows_mode_switch());
}

#[test]
fn modal_ok_hands_off_exactly_once_and_respects_submitting() {
    let (mut m, submitted, _) = modal(ModalOptions::default());
    m.set_visible(true).unwrap();
    m.set_submitting(true);
    assert!(!m.ok(&settings()));
    assert!(submitted.lock().unwrap().is_empty());

    m.set_submitting(false);
    assert!(m.ok(&settings()));
    assert_eq!(submitted.lock().unwrap().as_slice(), &[qingcloud()]);
}

#[test]
fn modal_cancel_discards_the_session() {
    let (mut m, submitted, cancelled) = modal(ModalOptions::default());
    m.set_visible(true).unwrap();
    m.cancel();
    assert!(!m.is_visible());
    assert_eq!(*cancelled.lock().unwrap(), 1);
    assert!(!m.ok(&settings()));
    assert!(submitted.lock().unwrap().is_empty());
}

#[test]
fn modal_surfaces_notices() {
    let (mut m, _, _) = modal(ModalOptions::default());
    m.set_visible(true).unwrap();

    let mut wizard = WizardForm::new(vec![WizardStep::new("containers")]);
    wizard.open_sub_route("container");
    assert_eq!(m.switch_mode(&mut wizard), None);
    let notice = m.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Please save the current settings first.");

    wizard.close_sub_route();
    assert_eq!(m.switch_mode(&mut wizard), Some(EditMode::Textual));
    m.session_mut().unwrap().set_code("kind: [unclosed\n").unwrap();
    assert_eq!(m.switch_mode(&mut wizard), None);
    assert_eq!(m.notice().map(|n| n.level), Some(NoticeLevel::Error));
}

#[test]
fn locked_modals_hide_the_switch() {
    let (mut m, _, _) = modal(ModalOptions { only_code: true, title: Some("Raw".into()), ..Default::default() });
    assert!(!m.shows_mode_switch());
    assert_eq!(m.title(), "Raw");
    m.set_visible(true).unwrap();
    assert_eq!(m.session().unwrap().mode(), EditMode::Textual);
    let mut wizard = WizardForm::new(vec![WizardStep::new("basic")]);
    assert_eq!(m.switch_mode(&mut wizard), None);
}
