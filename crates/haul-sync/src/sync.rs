//! Sync orchestration: drive every declared target through resolve,
//! download, extract, and atomic placement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};

use crate::archive;
use crate::cancel::CancelToken;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::http::Fetcher;
use crate::manifest::{ConsumerManifest, ResolvedArtifact, TargetReference};
use crate::resolver::Resolver;
use crate::workspace::SyncWorkspace;

/// Final state of one target after a sync run.
#[derive(Debug)]
pub enum TargetStatus {
    /// Resolved, downloaded, and placed.
    Synced,
    /// The pipeline failed. The target's previous contents are untouched.
    Failed(SyncError),
    /// The run was cancelled before this target completed.
    Cancelled,
}

/// Per-target outcome, reported in declaration order.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,
    pub version: String,
    pub status: TargetStatus,
}

impl TargetOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self.status, TargetStatus::Synced)
    }
}

/// Aggregate result of a sync run: exactly one outcome per declared target,
/// in declaration order regardless of completion order.
#[derive(Debug)]
pub struct SyncReport {
    outcomes: Vec<TargetOutcome>,
}

impl SyncReport {
    pub fn outcomes(&self) -> &[TargetOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn synced_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_synced()).count()
    }

    /// True when every declared target synced.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::is_synced)
    }
}

/// Drives the full sync cycle for every target in a consumer manifest.
pub struct Syncer {
    fetcher: Arc<dyn Fetcher>,
    config: SyncConfig,
    cancel: CancelToken,
}

impl Syncer {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: SyncConfig) -> Self {
        Self {
            fetcher,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for cancelling this syncer's runs from another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the resolve, download, extract, place pipeline for every
    /// declared target, at most `jobs` targets in flight at once.
    ///
    /// Target failures land in the report and never abort sibling targets.
    /// Only workspace-level failures, where the root or staging area cannot
    /// be set up at all, fail the run itself.
    ///
    /// Every run performs the full cycle for every target. There is no
    /// up-to-date check; syncing twice converges on the same on-disk state.
    pub async fn sync(&self, manifest: &ConsumerManifest) -> Result<SyncReport> {
        let workspace = SyncWorkspace::new(&self.config.root);
        workspace.prepare()?;

        let jobs = self.config.jobs.max(1);
        log::info!(
            "syncing {} targets into {} ({} at a time)",
            manifest.len(),
            workspace.root().display(),
            jobs
        );

        let mut pending: Vec<(usize, TargetReference)> =
            manifest.targets().iter().cloned().enumerate().collect();
        // pop() then hands targets out in declaration order.
        pending.reverse();

        let mut slots: Vec<Option<TargetStatus>> = Vec::new();
        slots.resize_with(manifest.len(), || None);

        let mut tasks = JoinSet::new();
        let mut slot_by_task: HashMap<Id, usize> = HashMap::new();
        loop {
            while tasks.len() < jobs && !self.cancel.is_cancelled() {
                let Some((index, target)) = pending.pop() else {
                    break;
                };
                let fetcher = Arc::clone(&self.fetcher);
                let workspace = workspace.clone();
                let cancel = self.cancel.clone();
                let handle = tasks.spawn(async move {
                    let status = sync_target(fetcher, &workspace, &target, &cancel).await;
                    (index, status)
                });
                slot_by_task.insert(handle.id(), index);
            }

            if tasks.is_empty() {
                break;
            }

            if let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, status)) => slots[index] = Some(status),
                    Err(e) => {
                        // A panicked pipeline still owes its target an outcome.
                        log::warn!("sync task aborted: {}", e);
                        if let Some(index) = slot_by_task.remove(&e.id()) {
                            slots[index] = Some(TargetStatus::Failed(
                                SyncError::PipelineAborted(e.to_string()),
                            ));
                        }
                    }
                }
            }
        }

        // Targets without a recorded status never started; that only
        // happens when the run was cancelled before they were picked up.
        let outcomes = manifest
            .targets()
            .iter()
            .zip(slots)
            .map(|(target, slot)| TargetOutcome {
                target: target.name.clone(),
                version: target.version.clone(),
                status: slot.unwrap_or(TargetStatus::Cancelled),
            })
            .collect();

        let report = SyncReport { outcomes };
        log::info!(
            "sync finished: {}/{} targets synced",
            report.synced_count(),
            report.len()
        );
        Ok(report)
    }
}

/// One target's pipeline. Every failure is caught here and becomes the
/// target's status; nothing escapes to abort sibling pipelines.
async fn sync_target(
    fetcher: Arc<dyn Fetcher>,
    workspace: &SyncWorkspace,
    target: &TargetReference,
    cancel: &CancelToken,
) -> TargetStatus {
    if cancel.is_cancelled() {
        return TargetStatus::Cancelled;
    }

    let resolver = Resolver::new(Arc::clone(&fetcher));
    let archive_url = tokio::select! {
        resolved = resolver.resolve(target) => match resolved {
            Ok(url) => url,
            Err(e) => return TargetStatus::Failed(e),
        },
        _ = cancel.cancelled() => return TargetStatus::Cancelled,
    };

    log::debug!("downloading {} from {}", target.name, archive_url);
    let bytes = tokio::select! {
        fetched = fetcher.fetch(&archive_url) => match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                return TargetStatus::Failed(SyncError::TargetUnreachable {
                    url: archive_url,
                    source: e,
                })
            }
        },
        _ = cancel.cancelled() => return TargetStatus::Cancelled,
    };

    let artifact = ResolvedArtifact {
        target: target.name.clone(),
        version: target.version.clone(),
        archive_url,
        bytes,
    };

    // Placement is local and quick; it always runs to completion so a
    // cancel can never leave a half-replaced target directory.
    match place(workspace, &artifact) {
        Ok(()) => TargetStatus::Synced,
        Err(e) => TargetStatus::Failed(e),
    }
}

/// Extract into staging, promote, and record the pin.
fn place(workspace: &SyncWorkspace, artifact: &ResolvedArtifact) -> Result<()> {
    let staging = workspace.begin_staging(&artifact.target)?;
    archive::extract(&artifact.bytes, &staging)?;
    workspace.promote(&artifact.target)?;
    workspace.pin_version(&artifact.target, &artifact.version)?;

    log::info!(
        "synced {} {} ({} bytes)",
        artifact.target,
        artifact.version,
        artifact.bytes.len()
    );
    Ok(())
}
