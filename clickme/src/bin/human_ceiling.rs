//! Computes the ClickMe human ceiling for a CSV of click annotations.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin human_ceiling -- \
//!     --csv clickme_data.csv --config ceiling.yaml --output results.json
//! ```
//!
//! Without `--config` the defaults of [`CeilingConfig`] are used. Command
//! line flags override the corresponding config fields.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::file_format::{read_file, write_file};
use common::log_setup::setup_logging;

use clickme::{group_by_image, read_csv, CeilingConfig, CeilingRunner};

#[derive(Debug, Parser)]
#[command(name = "human_ceiling", about = "Inter-subject agreement ceiling for ClickMe maps")]
struct Args {
    /// YAML or JSON run configuration
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Click data with `image_path` and `clicks` columns
    #[arg(long = "csv")]
    csv: PathBuf,

    /// Report destination; `.json` or `.yaml`
    #[arg(short = 'o', long = "output", default_value = "human_ceiling_results.json")]
    output: PathBuf,

    /// Prefix stripped from image paths before grouping
    #[arg(long = "image-prefix")]
    image_prefix: Option<String>,

    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Overrides the configured metric
    #[arg(short = 'm', long = "metric")]
    metric: Option<String>,

    /// Base level when RUST_LOG is unset
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,

    #[arg(long = "log-dir", default_value = "logs")]
    log_dir: PathBuf,
}

fn load_config(args: &Args) -> Result<CeilingConfig> {
    let mut config = match &args.config {
        Some(path) => read_file::<CeilingConfig>(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CeilingConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(metric) = &args.metric {
        config.metric = metric.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level, &args.log_dir);

    let config = load_config(&args)?;
    let rows = read_csv(&args.csv)?;
    let images = group_by_image(rows, args.image_prefix.as_deref());
    tracing::info!(images = images.len(), "Loaded click data");

    let report = CeilingRunner::run(config, images)?;
    write_file(&report, &args.output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    let summary = &report.summary;
    tracing::info!(
        output = %args.output.display(),
        images = summary.images_scored,
        thresholded = summary.images_thresholded,
        ceiling = summary.mean_ceiling_full,
        null = summary.mean_null_full,
        "Wrote human ceiling report"
    );
    Ok(())
}
