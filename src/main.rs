use anyhow::{bail, Context, Result};
use clap::Parser;
use pipecov::{
    build_report,
    config::PipelineConfig,
    fetch::{self, Source},
};
use std::{path::PathBuf, process::ExitCode};
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pipeline coverage report from an opportunity export"
)]
struct Args {
    /// YAML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Export URL or file path; overrides the configured source
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(src) = &args.source {
        cfg.source.set(Source::parse(src));
    }
    cfg.validate().context("invalid configuration")?;

    let Some(source) = cfg.source()? else {
        bail!("no export source configured; pass a URL or path, or set PIPECOV_SOURCE");
    };

    // ─── 3) ingest ───────────────────────────────────────────────────
    let client = fetch::build_client(&cfg.source.fetch)?;
    let start = Instant::now();
    let snapshot = match fetch::load_snapshot(
        &client,
        &source,
        &cfg.source.fetch,
        &cfg.columns,
        &cfg.owner_keys(),
    )
    .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(source = %source, error = %err, "data unavailable");
            let body = fetch::unavailable_body(&source, &err);
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(ExitCode::from(2));
        }
    };
    info!(
        rows = snapshot.row_count,
        groups = snapshot.groups.len(),
        elapsed = ?start.elapsed(),
        "ingested"
    );

    // ─── 4) report ───────────────────────────────────────────────────
    let report = build_report(&cfg, &snapshot).context("computing coverage")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("all done");
    Ok(ExitCode::SUCCESS)
}
