//! Status command - compare synced versions against the manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use haul_sync::{ConsumerManifest, SyncWorkspace, TargetReference};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the consumer manifest
    #[arg(long, default_value = "haul.json")]
    pub manifest: PathBuf,

    /// Workspace directory holding synced targets
    #[arg(long, default_value = "Haul")]
    pub root: PathBuf,

    /// Return a non-zero exit code when any target needs syncing
    #[arg(long)]
    pub strict: bool,
}

/// Local state of one target, read from its pin file and final directory.
/// Nothing here touches the network.
#[derive(Debug, PartialEq, Eq)]
enum TargetState {
    /// Pin matches the manifest and the directory is present.
    UpToDate,
    /// Synced before, but at a different version.
    Outdated { have: String },
    /// Pin matches but the directory is gone.
    Missing,
    /// Never synced.
    NotSynced,
}

fn classify(workspace: &SyncWorkspace, target: &TargetReference) -> TargetState {
    match workspace.pinned_version(&target.name) {
        Some(pinned) if pinned == target.version => {
            if workspace.target_dir(&target.name).is_dir() {
                TargetState::UpToDate
            } else {
                TargetState::Missing
            }
        }
        Some(pinned) => TargetState::Outdated { have: pinned },
        None => TargetState::NotSynced,
    }
}

pub fn execute(args: StatusArgs) -> Result<i32> {
    let manifest = ConsumerManifest::load(&args.manifest)
        .with_context(|| format!("failed to load {}", args.manifest.display()))?;
    let workspace = SyncWorkspace::new(&args.root);

    let mut stale = 0;
    for target in manifest.targets() {
        let line = match classify(&workspace, target) {
            TargetState::UpToDate => {
                format!("{} ({})", style("up to date").green(), target.version)
            }
            TargetState::Outdated { have } => {
                stale += 1;
                format!(
                    "{} (have {}, want {})",
                    style("outdated").yellow(),
                    have,
                    target.version
                )
            }
            TargetState::Missing => {
                stale += 1;
                format!(
                    "{} (pinned {}, directory removed)",
                    style("missing").red(),
                    target.version
                )
            }
            TargetState::NotSynced => {
                stale += 1;
                style("not synced").red().to_string()
            }
        };
        println!("  {:<28} {}", target.name, line);
    }

    if stale == 0 {
        println!(
            "{} all {} targets match {}",
            style("Ok:").green(),
            manifest.len(),
            args.manifest.display()
        );
        Ok(0)
    } else {
        println!(
            "{} {} of {} targets need `haul sync`",
            style("Info:").cyan(),
            stale,
            manifest.len()
        );
        Ok(if args.strict { 1 } else { 0 })
    }
}
