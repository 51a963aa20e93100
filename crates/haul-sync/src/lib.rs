pub mod archive;
pub mod cancel;
pub mod config;
pub mod error;
pub mod http;
pub mod manifest;
pub mod resolver;
pub mod sync;
pub mod workspace;

pub use error::{Result, SyncError};
pub use cancel::CancelToken;
pub use config::{SyncConfig, DEFAULT_JOBS};
pub use http::{FetchError, Fetcher, FetcherConfig, HttpFetcher};
pub use manifest::{ConsumerManifest, ResolvedArtifact, TargetReference, VersionManifest};
pub use resolver::Resolver;
pub use sync::{SyncReport, Syncer, TargetOutcome, TargetStatus};
pub use workspace::SyncWorkspace;
