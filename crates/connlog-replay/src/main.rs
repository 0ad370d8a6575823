//! Connectivity Log Replay - Main Entry Point
//!
//! Usage: `connlog-replay [--format=json|postcard] [trace.jsonl|-] [config.toml]`

use anyhow::{Context, Result};
use connlog::ConnLogConfig;
use connlog_replay::{init_logging, run_replay, OutputFormat, RecordWriter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let mut format = OutputFormat::Json;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.strip_prefix("--format=") {
            Some(name) => format = name.parse().map_err(anyhow::Error::msg)?,
            None => positional.push(arg),
        }
    }

    let trace = positional.first().filter(|p| p.as_str() != "-").map(PathBuf::from);
    let config_path = positional.get(1).map(PathBuf::from);

    let config = ConnLogConfig::load(config_path.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Connectivity Log Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &trace {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open trace {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let sink = Arc::new(RecordWriter::new(std::io::stdout(), format));
    let summary = run_replay(input, config, sink).await?;

    eprintln!(
        "connlog-replay: {} events, {} records dropped",
        summary.events, summary.dropped
    );
    Ok(())
}
