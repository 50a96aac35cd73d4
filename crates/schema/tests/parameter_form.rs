use kform_core::{Catalog, ResourceDocument};
use kform_schema::form::{selected_access_modes, supported_access_modes};
use kform_schema::{
    access_mode_options, resolve_parameter_form, AccessMode, InputKind, ParameterForm, Provisioner, ProvisionerTable,
    Widget, WidgetKind, WidgetRegistry,
};
use serde_json::json;

fn table_with(params: &str) -> ProvisionerTable {
    let yaml = format!("- name: Test\n  value: example.com/test\n  params:\n{}", params);
    ProvisionerTable::from_yaml(&yaml).unwrap()
}

#[test]
fn unknown_provisioner_falls_back_to_key_value_editor() {
    let tr = Catalog::default();
    let form = resolve_parameter_form(Some("example.com/unknown"), &ProvisionerTable::builtin(), &WidgetRegistry::default(), &tr);
    let ParameterForm::Properties(editor) = form else { panic!("expected properties editor") };

    let mut doc = ResourceDocument::from_json(json!({"kind": "StorageClass", "provisioner": "example.com/unknown"})).unwrap();
    editor.set(&mut doc, "anything", "goes").unwrap();
    editor.set(&mut doc, "server", "10.0.0.5").unwrap();
    assert_eq!(doc.as_json()["parameters"], json!({"anything": "goes", "server": "10.0.0.5"}));
    assert_eq!(editor.entries(&doc).len(), 2);
}

#[test]
fn missing_provisioner_also_falls_back() {
    let tr = Catalog::default();
    let form = resolve_parameter_form(None, &ProvisionerTable::builtin(), &WidgetRegistry::default(), &tr);
    assert!(matches!(form, ParameterForm::Properties(_)));
}

#[test]
fn empty_access_modes_offer_the_universal_set_preselected() {
    let table = ProvisionerTable::new(vec![Provisioner {
        name: "Bare".into(),
        value: "example.com/bare".into(),
        access_modes: Vec::new(),
        params: Vec::new(),
    }]);
    let field = access_mode_options(Some("example.com/bare"), &table, &Catalog::default());
    let values: Vec<_> = field.options.iter().map(|o| o.value.clone()).collect();
    assert_eq!(values, vec![json!("ReadWriteOnce"), json!("ReadOnlyMany"), json!("ReadWriteMany")]);
    assert_eq!(field.default_selected, vec!["ReadWriteOnce", "ReadOnlyMany", "ReadWriteMany"]);
    assert_eq!(supported_access_modes(Some("example.com/bare"), &table), AccessMode::ALL.to_vec());
}

#[test]
fn declared_access_modes_are_kept() {
    let field = access_mode_options(Some("kubernetes.io/rbd"), &ProvisionerTable::builtin(), &Catalog::default());
    assert_eq!(field.default_selected, vec!["ReadWriteOnce", "ReadOnlyMany"]);
}

#[test]
fn rows_hold_two_slots_and_an_odd_tail() {
    let table = table_with(
        "    - {key: a, type: text}\n    - {key: b, type: number}\n    - {key: c, type: select, options: [{label: One, value: '1'}]}\n",
    );
    let form = resolve_parameter_form(Some("example.com/test"), &table, &WidgetRegistry::default(), &Catalog::default());
    let ParameterForm::Rows(rows) = form else { panic!("expected rows") };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].left().path.to_string(), "parameters.a");
    assert_eq!(rows[0].right().map(|s| s.widget.clone()), Some(Widget::Numeric));
    assert!(rows[1].right().is_none());
    match &rows[1].left().widget {
        Widget::Choice { options } => {
            assert_eq!(options[0].value, json!("1"));
        }
        other => panic!("expected choice, got {:?}", other),
    }
}

#[test]
fn unknown_widget_tag_renders_a_placeholder() {
    let table = table_with("    - {key: level, type: slider}\n");
    let form = resolve_parameter_form(Some("example.com/test"), &table, &WidgetRegistry::default(), &Catalog::default());
    let ParameterForm::Rows(rows) = form else { panic!("expected rows") };
    assert_eq!(rows[0].left().widget, Widget::Placeholder { tag: "slider".into() });

    let registry = WidgetRegistry::default().register("slider", WidgetKind::Numeric);
    assert_eq!(registry.resolve(&InputKind::from("slider")), Some(WidgetKind::Numeric));
}

#[test]
fn labels_and_placeholders_are_translated() {
    let tr = Catalog::builtin("en");
    let form = resolve_parameter_form(Some("kubernetes.io/glusterfs"), &ProvisionerTable::builtin(), &WidgetRegistry::default(), &tr);
    let ParameterForm::Rows(rows) = form else { panic!("expected rows") };
    let resturl = rows[0].left();
    assert!(resturl.required);
    assert_ne!(resturl.label, "RESTURL");
    match &resturl.widget {
        Widget::SingleLine { placeholder: Some(p), disabled: false } => assert_ne!(p, "REST_URL_EXAMPLE"),
        other => panic!("unexpected widget {:?}", other),
    }
}

#[test]
fn access_modes_annotation_is_comma_separated() {
    let doc = ResourceDocument::from_json(json!({
        "metadata": {"annotations": {"storageclass.kubesphere.io/supported-access-modes": "ReadWriteOnce, ReadOnlyMany"}}
    }))
    .unwrap();
    assert_eq!(selected_access_modes(&doc), Some(vec!["ReadWriteOnce".to_string(), "ReadOnlyMany".to_string()]));
}
