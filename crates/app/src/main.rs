use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use kform_apply::{KubeSubmitter, Submitter};
use kform_codec::Codec;
use kform_core::{FormConfig, FormData};
use tracing::{info, warn};

fn init_tracing() {
    let env = std::env::var("KFORM_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_template(path: &str, codec: &Codec) -> anyhow::Result<FormData> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    codec.decode_form_data(&text).with_context(|| format!("decoding {}", path))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();
    let cfg = FormConfig::from_env();
    let codec = Codec::from_config(&cfg);

    let template = match std::env::args().nth(1) {
        Some(path) => match load_template(&path, &codec) {
            Ok(data) => Some(data),
            Err(e) => {
                eprintln!("{:#}", e);
                std::process::exit(2);
            }
        },
        None => None,
    };

    let submitter: Option<Arc<dyn Submitter>> = match KubeSubmitter::try_default(&cfg).await {
        Ok(s) => {
            info!("cluster connection ready");
            Some(Arc::new(s))
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "no cluster; documents will be kept locally");
            None
        }
    };

    if let Err(e) = kform_gui::run_native(cfg, template, submitter) {
        eprintln!("GUI error: {}", e);
        std::process::exit(1);
    }
}
