#![forbid(unsafe_code)]

use eframe::egui;
use kform_core::{DocPath, FormData, PathError, Translator};
use kform_schema::{ParameterForm, StorageClassSettings};
use kform_session::{EditMode, EditSession};
use serde_json::Value as Json;
use tracing::debug;

use crate::model::{NewParam, ToastKind};
use crate::ui::fields::{access_modes_ui, properties_ui, row_ui, slot_ui};
use crate::KformGuiApp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ModalAction {
    Switch,
    Ok,
    Cancel,
}

fn structured_body(
    ui: &mut egui::Ui,
    session: &mut EditSession,
    settings: &StorageClassSettings,
    tr: &dyn Translator,
    scratch: &mut NewParam,
) -> Result<(), PathError> {
    let layout = settings.layout(session.document(), tr);
    let Ok(data) = session.document_mut() else { return Ok(()) };
    let Some(doc) = data.for_kind_mut(settings.module_kind()) else {
        ui.weak(format!("no {} in this document", settings.module_kind()));
        return Ok(());
    };

    let name_path = DocPath::from_keys(["metadata", "name"]);
    let mut name = doc.get_str(&name_path).unwrap_or_default().to_string();
    ui.label(egui::RichText::new("Name *").strong());
    if ui.add(egui::TextEdit::singleline(&mut name).desired_width(f32::INFINITY)).changed() {
        doc.set(&name_path, Json::String(name))?;
    }
    ui.add_space(6.0);

    row_ui(ui, &layout.base, doc, tr)?;
    ui.add_space(6.0);
    access_modes_ui(ui, &layout.access_modes, doc)?;
    ui.add_space(6.0);
    slot_ui(ui, &layout.provisioner, doc, tr)?;
    if layout.customized {
        ui.weak(tr.t("Custom Provisioner"));
    }
    ui.separator();

    match &layout.parameters {
        ParameterForm::Rows(rows) => {
            ui.label(egui::RichText::new(tr.t("Parameters")).strong());
            for row in rows {
                row_ui(ui, row, doc, tr)?;
            }
        }
        ParameterForm::Properties(editor) => properties_ui(ui, editor, doc, scratch)?,
    }
    Ok(())
}

fn code_body(ui: &mut egui::Ui, session: &mut EditSession, tr: &dyn Translator) {
    let mut text = session.code().unwrap_or_default().to_string();
    let edit = egui::TextEdit::multiline(&mut text).code_editor().desired_rows(24).desired_width(f32::INFINITY);
    if ui.add(edit).changed() {
        if let Err(e) = session.set_code(text) {
            debug!(error = %e, "code edit dropped");
        }
    }
    if let Some(err) = session.last_error() {
        let error = err.to_string();
        ui.colored_label(ui.visuals().error_fg_color, tr.t_with("YAML_DECODE_FAILED", &[("error", error.as_str())]));
    }
}

/// Create modal: mode switch, the active view, and the footer.
pub(crate) fn draw_modal(app: &mut KformGuiApp, ctx: &egui::Context) {
    if !app.modal.is_visible() {
        return;
    }
    let title = app.modal.title();
    let width = app.modal.options().width as f32;
    let submitting = app.modal.options().is_submitting;
    let shows_switch = app.modal.shows_mode_switch();
    let tr = app.tr.clone();
    let mut open = true;
    let mut action: Option<ModalAction> = None;
    let mut edit_error: Option<PathError> = None;

    egui::Window::new(title)
        .id(egui::Id::new("create_modal"))
        .collapsible(false)
        .default_width(width)
        .open(&mut open)
        .show(ctx, |ui| {
            let Some(session) = app.modal.session_mut() else { return };
            if shows_switch {
                let mut textual = session.mode() == EditMode::Textual;
                if ui.checkbox(&mut textual, tr.t("EDIT_YAML")).changed() {
                    action = Some(ModalAction::Switch);
                }
                ui.separator();
            }
            egui::ScrollArea::vertical().max_height(520.0).show(ui, |ui| match session.mode() {
                EditMode::Structured => {
                    if let Err(e) = structured_body(ui, session, &app.settings, tr.as_ref(), &mut app.new_param) {
                        edit_error = Some(e);
                    }
                }
                EditMode::Textual => code_body(ui, session, tr.as_ref()),
            });
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button(tr.t("Cancel")).clicked() {
                    action = Some(ModalAction::Cancel);
                }
                if ui.add_enabled(!submitting, egui::Button::new(tr.t("OK"))).clicked() {
                    action = Some(ModalAction::Ok);
                }
                if submitting {
                    ui.spinner();
                }
            });
        });

    if !open && action.is_none() {
        action = Some(ModalAction::Cancel);
    }
    match action {
        Some(ModalAction::Switch) => {
            if let Some(mode) = app.modal.switch_mode(&mut app.settings) {
                debug!(mode = mode.as_str(), "edit mode switched");
            }
        }
        Some(ModalAction::Ok) => {
            app.modal.ok(&app.settings);
        }
        Some(ModalAction::Cancel) => app.modal.cancel(),
        None => {}
    }
    if let Some(notice) = app.modal.take_notice() {
        app.notice_toast(notice);
    }
    if let Some(e) = edit_error {
        app.toast(e.to_string(), ToastKind::Error);
    }
}

/// Documents shown in the kept list after an offline confirm.
pub(crate) fn describe(data: &FormData) -> String {
    data.documents().iter().map(|d| d.id().to_string()).collect::<Vec<_>>().join(", ")
}
