#![forbid(unsafe_code)]

use std::sync::mpsc;
use std::time::Instant;

use kform_apply::SubmitUpdate;
use kform_core::FormData;
use tokio::task::JoinHandle;

/// Messages from modal callbacks to the app loop.
#[derive(Debug)]
pub enum UiUpdate {
    Confirmed(FormData),
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind { Info, Success, Warn, Error }

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub created: Instant,
    pub duration_ms: u64,
}

#[derive(Default)]
pub struct SubmitState {
    pub running: bool,
    pub task: Option<JoinHandle<()>>,
    pub rx: Option<mpsc::Receiver<SubmitUpdate>>,
    pub status: String,
    pub dry_run: bool,
}

/// Scratch row of the free-form parameter editor.
#[derive(Debug, Default, Clone)]
pub struct NewParam {
    pub key: String,
    pub value: String,
}
