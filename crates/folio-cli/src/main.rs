// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — bind a batch of images into one PDF, one image per page.
//
// Entry point. Initialises logging, resolves configuration, reads the input
// files and runs the conversion.

mod input;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use folio_core::ConvertConfig;
use folio_core::human_errors::{describe_failure, humanize_error};
use folio_document::{CancelToken, ConcurrentConverter, PageAccumulator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use report::BatchReport;

/// Bind JPEG, PNG and WebP images into a single PDF, one image per page.
#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Bind JPEG, PNG and WebP images into a single PDF, one image per page",
    arg_required_else_help = true
)]
struct Cli {
    /// Image files, in page order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the PDF.
    #[arg(short, long, env = "FOLIO_OUTPUT", default_value = "converted.pdf")]
    output: PathBuf,

    /// JSON settings file. Command-line flags override its values.
    #[arg(long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Number of images decoded at once.
    #[arg(short, long, env = "FOLIO_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-image decode budget in milliseconds.
    #[arg(long, env = "FOLIO_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Title stored in the PDF metadata.
    #[arg(long)]
    title: Option<String>,

    /// Resample images wider than the page down to the page width.
    #[arg(long)]
    downscale: bool,

    /// Largest batch accepted.
    #[arg(long, env = "FOLIO_MAX_ITEMS", default_value_t = 10)]
    max_items: usize,

    /// Write a JSON report of placed and skipped images to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit with an error if no image could be converted.
    #[arg(long)]
    fail_on_empty: bool,

    /// Decode images one at a time on a single worker thread.
    #[arg(long)]
    sequential: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn resolve_config(&self) -> Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ConvertConfig::default(),
        };

        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.item_timeout_ms = timeout_ms;
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if self.downscale {
            config.downscale_to_page = true;
        }
        if self.fail_on_empty {
            config.fail_on_empty_result = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Folio starting");

    let config = cli.resolve_config()?;
    let images = input::read_images(&cli.inputs, cli.max_items)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling conversion");
            on_interrupt.cancel();
        }
    });

    let result = if cli.sequential {
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || {
            PageAccumulator::new(config).convert_with_cancel(&images, &token)
        })
        .await
        .context("sequential conversion task failed")?
    } else {
        ConcurrentConverter::new(config)
            .convert(images, &cancel)
            .await
    };

    let conversion = match result {
        Ok(conversion) => conversion,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{}\n  {}", human.message, human.suggestion);
            return Err(err.into());
        }
    };

    for failure in &conversion.failures {
        eprintln!("{}", describe_failure(failure));
    }

    std::fs::write(&cli.output, &conversion.bytes)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    if let Some(path) = &cli.report {
        BatchReport::new(&conversion, &cli.inputs, &cli.output).write_to(path)?;
    }

    println!(
        "{} page(s) written to {} ({} skipped, sha256 {})",
        conversion.page_count(),
        cli.output.display(),
        conversion.failures.len(),
        conversion.sha256
    );
    Ok(())
}
