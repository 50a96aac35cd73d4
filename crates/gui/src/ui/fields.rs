#![forbid(unsafe_code)]

use eframe::egui;
use kform_core::{PathError, ResourceDocument, Translator};
use kform_schema::form::{
    selected_access_modes, set_access_modes, value_text, AccessModeField, FieldRow, FieldSlot, PropertiesEditor, Widget,
};
use serde_json::Value as Json;

use crate::model::NewParam;

fn slot_header(ui: &mut egui::Ui, slot: &FieldSlot) {
    let label = if slot.required { format!("{} *", slot.label) } else { slot.label.clone() };
    ui.label(egui::RichText::new(label).strong());
}

/// One field slot bound to `slot.path` in `doc`.
pub(crate) fn slot_ui(
    ui: &mut egui::Ui,
    slot: &FieldSlot,
    doc: &mut ResourceDocument,
    tr: &dyn Translator,
) -> Result<(), PathError> {
    slot_header(ui, slot);
    let current = doc.get(&slot.path).cloned().or_else(|| slot.default.clone()).unwrap_or(Json::Null);
    let id = slot.path.to_string();
    match &slot.widget {
        Widget::SingleLine { placeholder, disabled } => {
            let mut text = value_text(&current);
            let mut edit = egui::TextEdit::singleline(&mut text).desired_width(f32::INFINITY);
            if let Some(p) = placeholder {
                edit = edit.hint_text(p.as_str());
            }
            if ui.add_enabled(!*disabled, edit).changed() {
                doc.set(&slot.path, Json::String(text))?;
            }
        }
        Widget::Choice { options } => {
            let selected = options.iter().find(|o| o.value == current).map(|o| o.label.clone()).unwrap_or_default();
            let mut picked = None;
            egui::ComboBox::from_id_salt(id.as_str()).selected_text(selected).show_ui(ui, |ui| {
                for o in options {
                    if ui.selectable_label(o.value == current, o.label.as_str()).clicked() {
                        picked = Some(o.value.clone());
                    }
                }
            });
            if let Some(v) = picked {
                doc.set(&slot.path, v)?;
            }
        }
        Widget::Numeric => {
            let mut n: i64 = match &current {
                Json::Number(n) => n.as_i64().unwrap_or_default(),
                Json::String(s) => s.trim().parse().unwrap_or_default(),
                _ => 0,
            };
            if ui.add(egui::DragValue::new(&mut n)).changed() {
                // parameters are string-typed on the wire
                let v = if current.is_number() { Json::from(n) } else { Json::String(n.to_string()) };
                doc.set(&slot.path, v)?;
            }
        }
        Widget::Placeholder { tag } => {
            ui.colored_label(ui.visuals().warn_fg_color, tr.t_with("UNSUPPORTED_FIELD_TYPE", &[("tag", tag.as_str())]));
        }
    }
    if let Some(desc) = &slot.description {
        ui.small(desc.as_str());
    }
    Ok(())
}

pub(crate) fn row_ui(
    ui: &mut egui::Ui,
    row: &FieldRow,
    doc: &mut ResourceDocument,
    tr: &dyn Translator,
) -> Result<(), PathError> {
    let mut result = Ok(());
    ui.columns(2, |cols| {
        for (col, slot) in cols.iter_mut().zip(row.slots()) {
            if let Err(e) = slot_ui(col, slot, doc, tr) {
                result = Err(e);
            }
        }
    });
    result
}

pub(crate) fn access_modes_ui(ui: &mut egui::Ui, field: &AccessModeField, doc: &mut ResourceDocument) -> Result<(), PathError> {
    ui.label(egui::RichText::new(&field.label).strong());
    let selected = selected_access_modes(doc).unwrap_or_else(|| field.default_selected.clone());
    let mut next: Option<Vec<String>> = None;
    ui.horizontal_wrapped(|ui| {
        for o in field.options.iter() {
            let value = value_text(&o.value);
            let mut on = selected.contains(&value);
            if ui.checkbox(&mut on, o.label.as_str()).changed() {
                // keep option order in the stored list
                let modes = field
                    .options
                    .iter()
                    .map(|x| value_text(&x.value))
                    .filter(|v| if *v == value { on } else { selected.contains(v) })
                    .collect();
                next = Some(modes);
            }
        }
    });
    ui.small(field.description.as_str());
    match next {
        Some(modes) => set_access_modes(doc, &modes),
        None => Ok(()),
    }
}

/// Free-form key/value rows for provisioners without a parameter table.
pub(crate) fn properties_ui(
    ui: &mut egui::Ui,
    editor: &PropertiesEditor,
    doc: &mut ResourceDocument,
    scratch: &mut NewParam,
) -> Result<(), PathError> {
    ui.label(egui::RichText::new(&editor.label).strong());
    let mut removed = None;
    egui::Grid::new("properties_grid").num_columns(3).striped(true).show(ui, |ui| -> Result<(), PathError> {
        for (key, mut value) in editor.entries(doc) {
            ui.monospace(key.as_str());
            if ui.text_edit_singleline(&mut value).changed() {
                editor.set(doc, &key, &value)?;
            }
            if ui.small_button("✕").clicked() {
                removed = Some(key);
            }
            ui.end_row();
        }
        Ok(())
    }).inner?;
    if let Some(key) = removed {
        editor.remove(doc, &key);
    }
    ui.horizontal(|ui| -> Result<(), PathError> {
        ui.add(egui::TextEdit::singleline(&mut scratch.key).hint_text("key").desired_width(140.0));
        ui.add(egui::TextEdit::singleline(&mut scratch.value).hint_text("value").desired_width(180.0));
        let ready = !scratch.key.trim().is_empty();
        if ui.add_enabled(ready, egui::Button::new(editor.add_text.as_str())).clicked() {
            editor.set(doc, scratch.key.trim(), &scratch.value)?;
            *scratch = NewParam::default();
        }
        Ok(())
    })
    .inner
}
