#![forbid(unsafe_code)]

use eframe::egui;

use crate::KformGuiApp;

pub mod fields;
pub mod modal;
pub mod toasts;
pub mod topbar;
pub mod updates;

/// Central panel: submission status and documents kept while offline.
pub(crate) fn draw_kept(app: &mut KformGuiApp, ui: &mut egui::Ui) {
    if !app.submit.status.is_empty() {
        ui.horizontal(|ui| {
            if app.submit.running {
                ui.spinner();
            }
            ui.label(app.submit.status.as_str());
        });
        ui.separator();
    }
    if app.kept.is_empty() {
        ui.weak("No documents yet.");
        return;
    }
    egui::ScrollArea::vertical().show(ui, |ui| {
        for (i, yaml) in app.kept.iter().enumerate().rev() {
            egui::CollapsingHeader::new(format!("document #{}", i + 1))
                .default_open(i + 1 == app.kept.len())
                .show(ui, |ui| {
                    ui.monospace(yaml.as_str());
                });
        }
    });
}
