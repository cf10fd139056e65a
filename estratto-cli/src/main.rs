//! estratto-cli: run the extraction pipeline on a message JSON document.
//!
//! Reads a message from a file or stdin (or wraps a bare `--text` string),
//! builds the configuration from `NER_*` environment variables, runs the
//! pipeline and prints the envelope to stdout as JSON.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use estratto::config::LoggingConfig;
use estratto::prelude::*;
use estratto::{EstrattoError, logging};

#[derive(Parser)]
#[command(name = "estratto-cli")]
#[command(about = "Email entity extraction pipeline", long_about = None)]
#[command(version = estratto::VERSION)]
struct Cli {
    /// Path to the message JSON document (stdin when omitted)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Extract from a bare text string instead of a message document
    #[arg(long, short, conflicts_with = "input")]
    text: Option<String>,

    /// Pretty-print the envelope
    #[arg(long)]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> estratto::Result<()> {
    let cli = Cli::parse();

    let level = logging::parse_log_level(&cli.log_level)?;
    let _log_guard = logging::init(&LoggingConfig {
        level,
        ..Default::default()
    })?;

    let config = PipelineConfig::from_env()?;
    tracing::debug!(
        event = "config_loaded",
        model = %config.ner_model_name,
        max_text_length = config.max_text_length,
    );

    if let Some(text) = &cli.text {
        let entities = extract_all_entities(text, Some(config)).await;
        print_json(&entities, cli.pretty)?;
        return Ok(());
    }

    let raw = read_message(cli.input.as_deref())?;
    let output = run_pipeline(&raw, Some(config)).await;
    print_json(&output, cli.pretty)?;

    if output.meta.status == PipelineStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn read_message(path: Option<&std::path::Path>) -> estratto::Result<serde_json::Value> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| EstrattoError::Other(format!("cannot read {}: {e}", path.display())))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| EstrattoError::Other(format!("cannot read stdin: {e}")))?;
            buffer
        }
    };

    serde_json::from_str(&content)
        .map_err(|e| EstrattoError::Other(format!("input is not valid JSON: {e}")))
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> estratto::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| EstrattoError::Other(format!("cannot serialize output: {e}")))?;
    println!("{rendered}");
    Ok(())
}
