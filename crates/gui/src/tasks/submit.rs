#![forbid(unsafe_code)]

use std::sync::mpsc;

use kform_apply::{spawn_submit, SubmitMode, SubmitUpdate};
use kform_core::FormData;
use tracing::{info, warn};

use crate::model::ToastKind;
use crate::ui::modal::describe;
use crate::KformGuiApp;

impl KformGuiApp {
    /// Hand a confirmed document to the submitter on a background task.
    ///
    /// Offline, the encoded YAML is kept in the central panel instead.
    pub(crate) fn start_submit_task(&mut self, data: FormData) {
        // cancel previous
        if let Some(task) = self.submit.task.take() {
            task.abort();
        }
        let Some(submitter) = self.submitter.clone() else {
            match self.codec.encode(&data) {
                Ok(yaml) => {
                    info!(docs = %describe(&data), "no cluster; keeping document");
                    self.kept.push(yaml);
                    self.toast(format!("kept {}", describe(&data)), ToastKind::Info);
                    if let Err(e) = self.modal.set_visible(false) {
                        self.toast(e.to_string(), ToastKind::Error);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "encode failed");
                    self.toast(format!("encode failed: {}", e), ToastKind::Error);
                }
            }
            return;
        };
        let mode = if self.submit.dry_run { SubmitMode::DryRun } else { SubmitMode::Create };
        let (tx, rx) = mpsc::channel::<SubmitUpdate>();
        self.submit.running = true;
        self.submit.status = "submitting…".into();
        self.submit.rx = Some(rx);
        self.modal.set_submitting(true);
        info!(docs = %describe(&data), ?mode, "submit started");
        self.submit.task = Some(spawn_submit(submitter, data, mode, tx));
    }
}
