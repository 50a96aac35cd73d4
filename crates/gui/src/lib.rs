#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc};

use eframe::egui;
use kform_apply::Submitter;
use kform_codec::Codec;
use kform_core::{Catalog, FormConfig, FormData, Translator};
use kform_schema::templates::storage_class_template;
use kform_schema::{ProvisionerTable, StorageClassSettings, WidgetRegistry};
use kform_session::{CreateResourceModal, ModalOptions};
use tracing::{info, warn};

mod model;
mod tasks;
mod ui;
pub use model::{ToastKind, UiUpdate};
use model::{NewParam, SubmitState, Toast};

/// Entry point used by the app binary to launch the GUI.
///
/// With a `template` the create modal opens on it right away.
pub fn run_native(cfg: FormConfig, template: Option<FormData>, submitter: Option<Arc<dyn Submitter>>) -> eframe::Result<()> {
    let options = eframe::NativeOptions::default();
    let app = KformGuiApp::new(cfg, template, submitter);
    eframe::run_native("Kform", options, Box::new(|_cc| Ok(Box::new(app))))
}

pub struct KformGuiApp {
    tr: Arc<dyn Translator>,
    codec: Codec,
    table: Arc<ProvisionerTable>,
    settings: StorageClassSettings,
    modal: CreateResourceModal,
    updates_rx: mpsc::Receiver<UiUpdate>,
    submitter: Option<Arc<dyn Submitter>>,
    submit: SubmitState,
    // provisioner picked in the top bar for the next create
    provisioner: String,
    new_param: NewParam,
    toasts: Vec<Toast>,
    // documents kept when no cluster is reachable
    kept: Vec<String>,
}

impl KformGuiApp {
    pub fn new(cfg: FormConfig, template: Option<FormData>, submitter: Option<Arc<dyn Submitter>>) -> Self {
        info!(locale = %cfg.locale, online = submitter.is_some(), "kform gui starting");
        let tr: Arc<dyn Translator> = Arc::new(Catalog::builtin(&cfg.locale));
        let codec = Codec::from_config(&cfg);
        let table = Arc::new(ProvisionerTable::builtin());
        let settings = StorageClassSettings::new(table.clone(), Arc::new(WidgetRegistry::default()));
        let provisioner = table.iter().next().map(|p| p.value.clone()).unwrap_or_default();
        let (updates_tx, updates_rx) = mpsc::channel::<UiUpdate>();

        let open_now = template.is_some();
        let (ok_tx, cancel_tx) = (updates_tx.clone(), updates_tx);
        let modal = CreateResourceModal::new(
            template.unwrap_or_default(),
            ModalOptions::from_config("Storage Class", &cfg),
            codec,
            tr.clone(),
        )
        .on_ok(move |data| {
            let _ = ok_tx.send(UiUpdate::Confirmed(data));
        })
        .on_cancel(move || {
            let _ = cancel_tx.send(UiUpdate::Cancelled);
        });

        let mut app = Self {
            tr,
            codec,
            table,
            settings,
            modal,
            updates_rx,
            submitter,
            submit: SubmitState::default(),
            provisioner,
            new_param: NewParam::default(),
            toasts: Vec::new(),
            kept: Vec::new(),
        };
        if open_now {
            if let Err(e) = app.modal.set_visible(true) {
                app.toast(e.to_string(), ToastKind::Error);
            }
        }
        app
    }

    /// Open the create modal on a fresh storage class for the picked provisioner.
    pub(crate) fn open_create(&mut self) {
        match storage_class_template("", &self.provisioner, &self.table) {
            Ok(doc) => {
                self.modal.set_template(FormData::Single(doc));
                if let Err(e) = self.modal.set_visible(true) {
                    self.toast(e.to_string(), ToastKind::Error);
                }
            }
            Err(e) => {
                warn!(error = %e, "template build failed");
                self.toast(format!("{:#}", e), ToastKind::Error);
            }
        }
    }
}

impl eframe::App for KformGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        crate::ui::updates::process_updates(self);
        crate::ui::topbar::draw_topbar(self, ctx);
        egui::CentralPanel::default().show(ctx, |ui| crate::ui::draw_kept(self, ui));
        crate::ui::modal::draw_modal(self, ctx);
        crate::ui::toasts::draw_toasts(self, ctx);
        if self.submit.running || !self.toasts.is_empty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
