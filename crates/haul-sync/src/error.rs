//! Error types for the sync engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::FetchError;

/// Every failure a sync pipeline can produce for a target, plus the
/// workspace-level failures that abort a run outright.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A consumer or version manifest failed parsing or shape validation.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// A version manifest or archive URL could not be fetched.
    #[error("cannot reach {url}: {source}")]
    TargetUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The requested version is not published in the target's version
    /// manifest.
    #[error("version {requested} of {target} not found (available: {})", format_versions(.available))]
    VersionNotFound {
        target: String,
        requested: String,
        available: Vec<String>,
    },

    /// The downloaded bytes are not a readable zip archive.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// An archive entry would resolve outside the extraction directory.
    #[error("unsafe archive entry: {0}")]
    UnsafeArchiveEntry(String),

    /// Local filesystem failure during staging or placement.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A target's pipeline task ended without producing a status, e.g. it
    /// panicked.
    #[error("sync pipeline aborted: {0}")]
    PipelineAborted(String),
}

impl SyncError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

fn format_versions(versions: &[String]) -> String {
    if versions.is_empty() {
        "none".to_string()
    } else {
        versions.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
