//! Sync command - bring every declared target to its manifest version.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::ProgressBar;

use haul_sync::{
    ConsumerManifest, FetcherConfig, HttpFetcher, SyncConfig, Syncer, TargetStatus, DEFAULT_JOBS,
};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the consumer manifest
    #[arg(long, default_value = "haul.json")]
    pub manifest: PathBuf,

    /// Workspace directory receiving synced targets
    #[arg(long, default_value = "Haul")]
    pub root: PathBuf,

    /// Maximum number of targets synced in parallel
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,
}

pub async fn execute(args: SyncArgs) -> Result<i32> {
    let manifest = ConsumerManifest::load(&args.manifest)
        .with_context(|| format!("failed to load {}", args.manifest.display()))?;
    log::debug!(
        "loaded {} targets from {}",
        manifest.len(),
        args.manifest.display()
    );

    if manifest.is_empty() {
        println!(
            "{} {} declares no targets, nothing to sync",
            style("Info:").cyan(),
            args.manifest.display()
        );
        return Ok(0);
    }

    let fetcher = HttpFetcher::with_config(
        FetcherConfig::new().with_timeout(Duration::from_secs(args.timeout)),
    )
    .context("failed to build HTTP client")?;

    let syncer = Syncer::new(
        Arc::new(fetcher),
        SyncConfig::new(&args.root).with_jobs(args.jobs),
    );

    // Ctrl-C asks the run to stop: in-flight placements finish, everything
    // else reports as cancelled.
    let cancel = syncer.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, stopping after in-flight placements...");
            cancel.cancel();
        }
    });

    let spinner = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_message(format!(
        "Syncing {} targets into {}...",
        manifest.len(),
        args.root.display()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let report = syncer.sync(&manifest).await?;
    spinner.finish_and_clear();

    for outcome in report.outcomes() {
        match &outcome.status {
            TargetStatus::Synced => {
                println!(
                    "  {} {} {}",
                    style(&outcome.target).bold(),
                    outcome.version,
                    style("synced").green()
                );
            }
            TargetStatus::Failed(e) => {
                println!(
                    "  {} {} {}: {}",
                    style(&outcome.target).bold(),
                    outcome.version,
                    style("failed").red(),
                    e
                );
            }
            TargetStatus::Cancelled => {
                println!(
                    "  {} {} {}",
                    style(&outcome.target).bold(),
                    outcome.version,
                    style("cancelled").yellow()
                );
            }
        }
    }

    if report.succeeded() {
        println!(
            "{} {} targets synced into {}",
            style("Done:").green(),
            report.len(),
            args.root.display()
        );
        Ok(0)
    } else {
        println!(
            "{} {} of {} targets did not sync",
            style("Warning:").yellow(),
            report.len() - report.synced_count(),
            report.len()
        );
        Ok(1)
    }
}
