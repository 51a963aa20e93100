//! Manifest model: what a consumer declares and what publishers serve.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{Result, SyncError};
use crate::workspace::{PIN_SUFFIX, RETIRED_SUFFIX, STAGING_DIR};

/// One dependency line in the consumer manifest: where the target's version
/// manifest lives and which exact version to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReference {
    /// Directory-safe name derived from the manifest URL.
    pub name: String,
    /// HTTP(S) location of the target's version manifest.
    pub url: String,
    /// Requested version. Compared by string equality only, no range or
    /// semver interpretation.
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct RawTargetEntry {
    url: String,
    version: String,
}

impl TargetReference {
    /// Build a reference from raw manifest fields, deriving the target name
    /// from the URL.
    pub fn new(url: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let version = version.into();

        if version.is_empty() {
            return Err(SyncError::MalformedManifest(format!(
                "entry for {url} has an empty version"
            )));
        }
        let name = derive_target_name(&url)?;

        Ok(Self { name, url, version })
    }
}

/// Derive the local target name from a version-manifest URL: the final path
/// segment with its extension dropped (`.../zendesk-sdk.json` becomes
/// `zendesk-sdk`). Query and fragment parts, as used by pre-signed URLs,
/// never leak into the name.
fn derive_target_name(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| SyncError::MalformedManifest(format!("invalid url {raw}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SyncError::MalformedManifest(format!(
            "unsupported scheme {} in {raw}",
            url.scheme()
        )));
    }

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");
    let name = strip_extension(segment);

    if name.is_empty() || name == "." || name == ".." {
        return Err(SyncError::MalformedManifest(format!(
            "cannot derive a target name from {raw}"
        )));
    }
    if name == STAGING_DIR {
        return Err(SyncError::MalformedManifest(format!(
            "target name {name} is reserved"
        )));
    }

    Ok(name.to_string())
}

/// Drop the final `.ext` of a path segment, keeping dotfile-style names
/// intact (`.profile` stays `.profile`).
fn strip_extension(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    }
}

/// The ordered list of targets a project depends on, read from `haul.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerManifest {
    targets: Vec<TargetReference>,
}

impl ConsumerManifest {
    /// Read and parse the consumer manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| SyncError::filesystem(path, e))?;
        Self::from_slice(&bytes)
    }

    /// Parse consumer manifest bytes: a JSON list of `{url, version}`
    /// objects. Declaration order is preserved; duplicate derived names are
    /// rejected because both entries would claim the same directory, and so
    /// are names that land on a sibling's version pin or retirement path.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Vec<RawTargetEntry> = serde_json::from_slice(bytes)
            .map_err(|e| SyncError::MalformedManifest(format!("consumer manifest: {e}")))?;

        let mut targets = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();
        for entry in raw {
            let target = TargetReference::new(entry.url, entry.version)?;
            if !seen.insert(target.name.clone()) {
                return Err(SyncError::MalformedManifest(format!(
                    "duplicate target name {}",
                    target.name
                )));
            }
            targets.push(target);
        }

        // A name spelling out a sibling's pin file or retirement path would
        // fight that sibling over the same location under the root.
        for target in &targets {
            for suffix in [PIN_SUFFIX, RETIRED_SUFFIX] {
                if let Some(stem) = target.name.strip_suffix(suffix) {
                    if seen.contains(stem) {
                        return Err(SyncError::MalformedManifest(format!(
                            "target name {} collides with a path reserved for {}",
                            target.name, stem
                        )));
                    }
                }
            }
        }

        Ok(Self { targets })
    }

    /// Declared targets, in declaration order.
    pub fn targets(&self) -> &[TargetReference] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Per-target mapping of published versions to archive URLs, fetched fresh
/// from the publishing side on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionManifest {
    /// Target this manifest describes.
    pub target: String,
    entries: BTreeMap<String, String>,
}

impl VersionManifest {
    /// Parse version-manifest bytes: a JSON object mapping version strings
    /// to archive URLs.
    pub fn from_slice(target: &str, bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
            SyncError::MalformedManifest(format!("version manifest for {target}: {e}"))
        })?;

        let map = value.as_object().ok_or_else(|| {
            SyncError::MalformedManifest(format!(
                "version manifest for {target} must be a JSON object of version to archive url"
            ))
        })?;

        let mut entries = BTreeMap::new();
        for (version, archive) in map {
            let archive = archive.as_str().ok_or_else(|| {
                SyncError::MalformedManifest(format!(
                    "version manifest for {target}: entry {version} is not a string url"
                ))
            })?;
            entries.insert(version.clone(), archive.to_string());
        }

        Ok(Self {
            target: target.to_string(),
            entries,
        })
    }

    /// Archive URL published for `version`, if any. Exact match only.
    pub fn archive_url(&self, version: &str) -> Option<&str> {
        self.entries.get(version).map(String::as_str)
    }

    /// All published versions, sorted.
    pub fn versions(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A resolved, downloaded artifact awaiting extraction. Lives only for the
/// duration of one target pipeline; nothing is cached across runs.
#[derive(Debug)]
pub struct ResolvedArtifact {
    pub target: String,
    pub version: String,
    pub archive_url: String,
    pub bytes: Vec<u8>,
}
