#![forbid(unsafe_code)]

use std::sync::mpsc::TryRecvError;

use kform_apply::SubmitUpdate;
use tracing::{debug, info};

use crate::model::{ToastKind, UiUpdate};
use crate::KformGuiApp;

pub(crate) fn process_updates(app: &mut KformGuiApp) {
    let mut confirmed = Vec::new();
    while let Ok(msg) = app.updates_rx.try_recv() {
        match msg {
            UiUpdate::Confirmed(data) => confirmed.push(data),
            UiUpdate::Cancelled => info!("create cancelled"),
        }
    }
    for data in confirmed {
        app.start_submit_task(data);
    }

    let mut drained = Vec::new();
    let mut disconnected = false;
    if let Some(rx) = &app.submit.rx {
        loop {
            match rx.try_recv() {
                Ok(u) => drained.push(u),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
    }
    for u in drained {
        match u {
            SubmitUpdate::Started { total } => {
                app.submit.status = format!("submitting {} document(s)", total);
            }
            SubmitUpdate::Applied(outcome) => {
                let name = outcome.id.to_string();
                let mut text = app.tr.t_with("SUBMIT_OK", &[("name", name.as_str())]);
                if outcome.dry_run {
                    text.push_str(" (dry-run)");
                }
                app.toast(text, ToastKind::Success);
            }
            SubmitUpdate::Failed { id, error } => {
                debug!(%id, "submit failed");
                let text = app.tr.t_with("SUBMIT_FAILED", &[("error", error.as_str())]);
                app.toast(text, ToastKind::Error);
            }
            SubmitUpdate::Finished { ok, failed } => {
                app.submit.running = false;
                app.submit.rx = None;
                app.submit.task = None;
                app.submit.status = format!("{} applied, {} failed", ok, failed);
                app.modal.set_submitting(false);
                if failed == 0 {
                    if let Err(e) = app.modal.set_visible(false) {
                        app.toast(e.to_string(), ToastKind::Error);
                    }
                }
            }
        }
    }
    // task aborted or panicked before reporting
    if disconnected && app.submit.running {
        app.submit.running = false;
        app.submit.rx = None;
        app.submit.task = None;
        app.modal.set_submitting(false);
        app.toast("submission interrupted", ToastKind::Warn);
    }
}
