//! CLI entry point for the padron tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use padron_core::{AssembledFile, ImportSummary, Importer, SegmentedDownloader};
use serde::Serialize;
use tracing::{debug, info, warn};

mod cli;
mod console;

use cli::Args;
use console::ConsoleProgress;

/// Printed with `--json`.
#[derive(Debug, Serialize)]
struct RunSummary {
    download: Option<AssembledFile>,
    import: ImportSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    let config = args.to_config();
    let download_options = config.download_options().context("download")?;
    let import_options = config.import_options().context("import")?;
    let progress = Arc::new(ConsoleProgress::new(config.show_progress));

    let download = if config.skip_download {
        info!(archive = %config.archive.display(), "skipping download");
        None
    } else {
        info!(url = %config.url, parts = config.parts, "downloading archive");
        let downloader = SegmentedDownloader::new(config.http_client(), download_options)
            .context("download")?;

        let cancel = downloader.cancellation_token();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; cancelling download");
                cancel.cancel();
            }
        });

        let result = downloader
            .download(&config.url, &config.archive, progress.clone())
            .await;
        interrupt.abort();
        progress.finish();

        let assembled = result.context("download")?;
        info!(
            path = %assembled.path.display(),
            bytes = assembled.bytes,
            "download complete"
        );
        Some(assembled)
    };

    info!(
        archive = %config.archive.display(),
        database = %config.database.display(),
        "importing archive"
    );
    progress.start_import();
    let importer = Importer::new(import_options).context("import")?;
    let result = importer
        .import(&config.archive, &config.database, progress.clone())
        .await;
    progress.finish();
    let summary = result.context("import")?;

    if args.json {
        let report = RunSummary {
            download,
            import: summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        println!(
            "Imported {} rows from {} into {} ({} batches, {:.1}s)",
            summary.rows,
            summary.member,
            config.database.display(),
            summary.batches,
            summary.elapsed.as_secs_f64()
        );
    }

    Ok(())
}
