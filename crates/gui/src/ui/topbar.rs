#![forbid(unsafe_code)]

use eframe::egui;

use crate::KformGuiApp;

pub(crate) fn draw_topbar(app: &mut KformGuiApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(app.tr.t("Storage Class")).strong());
            let selected = app
                .table
                .find(&app.provisioner)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| app.tr.t("Custom Provisioner"));
            egui::ComboBox::from_id_salt("provisioner_pick").selected_text(selected).show_ui(ui, |ui| {
                for p in app.table.iter() {
                    ui.selectable_value(&mut app.provisioner, p.value.clone(), p.name.as_str());
                }
            });
            ui.add_enabled_ui(!app.modal.is_visible(), |ui| {
                if ui.button(app.tr.t("Create")).clicked() {
                    app.open_create();
                }
            });
            ui.separator();
            ui.checkbox(&mut app.submit.dry_run, "dry-run");
            if app.submitter.is_none() {
                ui.weak("offline");
            }
        });
    });
}
