//! Sync run configuration.

use std::path::PathBuf;

/// Default cap on simultaneously running target pipelines.
pub const DEFAULT_JOBS: usize = 8;

/// Settings for one [`Syncer`](crate::sync::Syncer). Everything is passed
/// explicitly; nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Workspace root receiving final target directories.
    pub root: PathBuf,
    /// Maximum number of target pipelines in flight at once.
    pub jobs: usize,
}

impl SyncConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: DEFAULT_JOBS,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}
