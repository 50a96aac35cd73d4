use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kform_apply::{submit_documents, KubeSubmitter, SubmitMode};
use kform_codec::Codec;
use kform_core::{normalize_kind, Catalog, FormConfig, FormData, StructuredForm, Translator};
use kform_schema::form::STORAGE_CLASS_KIND;
use kform_schema::templates::storage_class_template;
use kform_schema::{resolve_parameter_form, ParameterForm, ProvisionerTable, StorageClassSettings, Widget, WidgetRegistry};
use serde_json::json;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "kformctl", version, about = "Kform CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Locale for labels and messages (en, es, zh, tc)
    #[arg(long = "locale", global = true)]
    locale: Option<String>,

    /// Provisioner table to use instead of the built-in one (YAML list)
    #[arg(long = "table", global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List known storage provisioners
    Provisioners,
    /// Show the parameter form resolved for a provisioner
    Params {
        /// Provisioner identifier, e.g. "kubernetes.io/rbd"
        provisioner: String,
    },
    /// Decode a manifest stream and print its kind-keyed fold
    Fold {
        /// Path to a YAML file, or "-" for stdin
        file: String,
    },
    /// Decode and validate a manifest stream
    Check {
        /// Path to a YAML file, or "-" for stdin
        file: String,
    },
    /// Print a new storage class for a provisioner
    Template {
        name: String,
        #[arg(long = "provisioner")]
        provisioner: String,
    },
    /// Submit every document of a manifest stream with server-side apply
    Apply {
        /// Path to a YAML file, or "-" for stdin
        file: String,
        /// Ask the server to validate only
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
        /// Allow updating existing objects
        #[arg(long = "update", action = ArgAction::SetTrue)]
        update: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("KFORM_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        return std::io::read_to_string(std::io::stdin()).context("reading stdin");
    }
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file))
}

fn load_table(path: Option<&str>) -> Result<ProvisionerTable> {
    match path {
        Some(p) => ProvisionerTable::from_yaml(&read_input(p)?).with_context(|| format!("loading table {}", p)),
        None => Ok(ProvisionerTable::builtin()),
    }
}

fn widget_name(w: &Widget) -> String {
    match w {
        Widget::SingleLine { disabled: true, .. } => "text (read-only)".into(),
        Widget::SingleLine { .. } => "text".into(),
        Widget::Choice { options, .. } => {
            let values: Vec<String> = options.iter().map(|o| kform_schema::form::value_text(&o.value)).collect();
            format!("select [{}]", values.join("|"))
        }
        Widget::Numeric => "number".into(),
        Widget::Placeholder { tag } => format!("unsupported ({})", tag),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = FormConfig::from_env();
    if let Some(l) = &cli.locale {
        cfg.locale = l.clone();
    }
    let tr = Catalog::builtin(&cfg.locale);
    let table = load_table(cli.table.as_deref())?;
    let codec = Codec::from_config(&cfg);

    match cli.command {
        Commands::Provisioners => match cli.output {
            Output::Human => {
                for p in table.iter() {
                    let modes: Vec<&str> = p.access_modes.iter().map(|m| m.as_str()).collect();
                    println!("{} • {} • {} params • {}", p.value, p.name, p.params.len(), modes.join(","));
                }
            }
            Output::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        },
        Commands::Params { provisioner } => {
            let form = resolve_parameter_form(Some(&provisioner), &table, &WidgetRegistry::default(), &tr);
            match (form, cli.output) {
                (ParameterForm::Properties(editor), Output::Human) => {
                    println!("{} (free-form key/value under {})", editor.label, editor.path);
                }
                (ParameterForm::Properties(editor), Output::Json) => {
                    println!("{}", serde_json::to_string_pretty(&json!({"properties": editor.path.to_string()}))?);
                }
                (ParameterForm::Rows(rows), Output::Human) => {
                    for (i, row) in rows.iter().enumerate() {
                        for slot in row.slots() {
                            let req = if slot.required { " *" } else { "" };
                            let default = slot.default.as_ref().map(|d| format!(" = {}", kform_schema::form::value_text(d))).unwrap_or_default();
                            println!("{:>2} {}{} • {} • {}{}", i, slot.label, req, slot.path, widget_name(&slot.widget), default);
                        }
                    }
                }
                (ParameterForm::Rows(rows), Output::Json) => {
                    let out: Vec<_> = rows
                        .iter()
                        .map(|row| {
                            row.slots()
                                .iter()
                                .map(|s| {
                                    json!({
                                        "path": s.path.to_string(),
                                        "label": s.label,
                                        "widget": widget_name(&s.widget),
                                        "required": s.required,
                                        "default": s.default,
                                    })
                                })
                                .collect::<Vec<_>>()
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Commands::Fold { file } => {
            let data = codec.decode_form_data(&read_input(&file)?).map_err(|e| anyhow!("{}", e))?;
            match (cli.output, &data) {
                (Output::Json, _) => println!("{}", serde_json::to_string_pretty(&data.to_json())?),
                (Output::Human, FormData::Single(d)) => println!("single • {}", d.id()),
                (Output::Human, FormData::Kinds(m)) => {
                    for (k, d) in m.iter() {
                        println!("{} • {}", k, d.id());
                    }
                }
            }
        }
        Commands::Check { file } => {
            let decoded = codec.decode(&read_input(&file)?).map_err(|e| anyhow!("{}", tr.t_with("YAML_DECODE_FAILED", &[("error", e.to_string().as_str())])))?;
            let settings = StorageClassSettings::new(Arc::new(table.clone()), Arc::new(WidgetRegistry::default()));
            let mut problems = 0usize;
            for doc in decoded.documents() {
                let id = doc.id();
                let mut messages: Vec<String> = Vec::new();
                if id.kind.is_empty() {
                    messages.push("missing kind".into());
                } else if normalize_kind(&id.kind) == STORAGE_CLASS_KIND {
                    if let Err(errors) = settings.validate(&FormData::Single(doc.clone())) {
                        messages.extend(errors.iter().map(|e| format!("{}: {}", e.path, tr.t(&e.message))));
                    }
                }
                problems += messages.len();
                match cli.output {
                    Output::Human if messages.is_empty() => println!("ok • {}", id),
                    Output::Human => {
                        for m in &messages {
                            println!("error • {} • {}", id, m);
                        }
                    }
                    Output::Json => println!("{}", json!({"id": id.to_string(), "errors": messages})),
                }
            }
            if problems > 0 {
                error!(problems, "check failed");
                return Err(anyhow!("{} problem(s) found", problems));
            }
        }
        Commands::Template { name, provisioner } => {
            let doc = storage_class_template(&name, &provisioner, &table)?;
            match cli.output {
                Output::Human => print!("{}", codec.encode_document(&doc)?),
                Output::Json => println!("{}", serde_json::to_string_pretty(doc.as_json())?),
            }
        }
        Commands::Apply { file, dry_run, update } => {
            let decoded = codec.decode(&read_input(&file)?).map_err(|e| anyhow!("{}", e))?;
            let docs = decoded.documents();
            let mode = match (dry_run, update) {
                (true, _) => SubmitMode::DryRun,
                (false, true) => SubmitMode::Update,
                (false, false) => SubmitMode::Create,
            };
            info!(documents = docs.len(), ?mode, "apply invoked");
            let submitter = KubeSubmitter::try_default(&cfg).await?;
            let outcomes = submit_documents(&submitter, &docs, mode).await?;
            match cli.output {
                Output::Human => {
                    for o in &outcomes {
                        let verb = if o.dry_run { "dry-run ok" } else { "applied" };
                        println!(
                            "{} • {} • adds={} updates={} removes={} • rv={}",
                            verb,
                            o.id,
                            o.summary.adds,
                            o.summary.updates,
                            o.summary.removes,
                            o.new_rv.as_deref().unwrap_or("-")
                        );
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
            }
        }
    }

    Ok(())
}
