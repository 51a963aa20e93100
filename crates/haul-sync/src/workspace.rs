//! On-disk layout: final target directories, staging area, version pins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

/// Staging subdirectory kept under the workspace root. Everything inside is
/// owned by in-flight runs and may be discarded at any time.
pub(crate) const STAGING_DIR: &str = ".staging";

/// Suffix of the version pin kept beside each final directory.
pub(crate) const PIN_SUFFIX: &str = ".version";

/// Suffix of the staging path a previous tree is parked at mid-promote.
pub(crate) const RETIRED_SUFFIX: &str = ".old";

/// The sync workspace: one root directory holding a final subdirectory per
/// target, a `<name>.version` pin beside each, and a private staging area
/// for in-flight extractions.
#[derive(Debug, Clone)]
pub struct SyncWorkspace {
    root: PathBuf,
}

impl SyncWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final directory for `name`: `<root>/<name>/`.
    pub fn target_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Staging directory for `name`: `<root>/.staging/<name>/`.
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(STAGING_DIR).join(name)
    }

    /// Pin file for `name`: `<root>/<name>.version`.
    pub fn version_file(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{PIN_SUFFIX}"))
    }

    /// Create the root and a clean staging area. Stale staging content left
    /// behind by an interrupted run is discarded here.
    pub fn prepare(&self) -> Result<()> {
        let staging = self.root.join(STAGING_DIR);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| SyncError::filesystem(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| SyncError::filesystem(&staging, e))?;
        Ok(())
    }

    /// Make a fresh, empty staging directory for `name` and return its
    /// path.
    pub fn begin_staging(&self, name: &str) -> Result<PathBuf> {
        let dir = self.staging_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| SyncError::filesystem(&dir, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| SyncError::filesystem(&dir, e))?;
        Ok(dir)
    }

    /// Move the staged tree for `name` into its final directory.
    ///
    /// The previous final directory, if any, is renamed aside before the
    /// staged tree is renamed into place. Observers see the old tree or the
    /// new tree, never a half-populated directory.
    pub fn promote(&self, name: &str) -> Result<()> {
        let staging = self.staging_dir(name);
        let final_dir = self.target_dir(name);
        let retired = self
            .root
            .join(STAGING_DIR)
            .join(format!("{name}{RETIRED_SUFFIX}"));

        if !staging.is_dir() {
            return Err(SyncError::filesystem(
                &staging,
                io::Error::other("nothing staged to promote"),
            ));
        }
        if retired.exists() {
            fs::remove_dir_all(&retired).map_err(|e| SyncError::filesystem(&retired, e))?;
        }

        let had_previous = final_dir.exists();
        if had_previous {
            fs::rename(&final_dir, &retired).map_err(|e| SyncError::filesystem(&final_dir, e))?;
        }

        if let Err(e) = fs::rename(&staging, &final_dir) {
            // Swap failed; put the previous tree back.
            if had_previous {
                if let Err(restore) = fs::rename(&retired, &final_dir) {
                    log::warn!(
                        "could not restore previous contents of {}: {}",
                        final_dir.display(),
                        restore
                    );
                }
            }
            return Err(SyncError::filesystem(&final_dir, e));
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&retired) {
                log::warn!("stale copy left at {}: {}", retired.display(), e);
            }
        }

        Ok(())
    }

    /// Record `version` as the currently synced version of `name`.
    pub fn pin_version(&self, name: &str, version: &str) -> Result<()> {
        let path = self.version_file(name);
        fs::write(&path, version).map_err(|e| SyncError::filesystem(&path, e))
    }

    /// Version recorded by the last successful sync of `name`, if any.
    pub fn pinned_version(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.version_file(name))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn workspace(temp: &TempDir) -> SyncWorkspace {
        SyncWorkspace::new(temp.path().join("Haul"))
    }

    #[test]
    fn test_layout_paths() {
        let ws = SyncWorkspace::new("/opt/project/Haul");

        assert_eq!(ws.target_dir("tool"), Path::new("/opt/project/Haul/tool"));
        assert_eq!(
            ws.staging_dir("tool"),
            Path::new("/opt/project/Haul/.staging/tool")
        );
        assert_eq!(
            ws.version_file("tool"),
            Path::new("/opt/project/Haul/tool.version")
        );
    }

    #[test]
    fn test_prepare_creates_root_and_staging() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        ws.prepare().unwrap();

        assert!(ws.root().is_dir());
        assert!(ws.root().join(".staging").is_dir());
    }

    #[test]
    fn test_prepare_discards_stale_staging() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();
        fs::create_dir_all(ws.staging_dir("tool")).unwrap();
        fs::write(ws.staging_dir("tool").join("half-written"), b"junk").unwrap();

        ws.prepare().unwrap();

        assert!(!ws.staging_dir("tool").exists());
    }

    #[test]
    fn test_begin_staging_wipes_leftovers() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();
        fs::create_dir_all(ws.staging_dir("tool")).unwrap();
        fs::write(ws.staging_dir("tool").join("old"), b"old").unwrap();

        let dir = ws.begin_staging("tool").unwrap();

        assert_eq!(dir, ws.staging_dir("tool"));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_promote_fresh_target() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();
        let staging = ws.begin_staging("tool").unwrap();
        fs::write(staging.join("tool.bin"), b"v1").unwrap();

        ws.promote("tool").unwrap();

        assert_eq!(fs::read(ws.target_dir("tool").join("tool.bin")).unwrap(), b"v1");
        assert!(!ws.staging_dir("tool").exists());
    }

    #[test]
    fn test_promote_replaces_previous_contents() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();

        let staging = ws.begin_staging("tool").unwrap();
        fs::write(staging.join("v1-only.txt"), b"v1").unwrap();
        ws.promote("tool").unwrap();

        let staging = ws.begin_staging("tool").unwrap();
        fs::write(staging.join("v2-only.txt"), b"v2").unwrap();
        ws.promote("tool").unwrap();

        let final_dir = ws.target_dir("tool");
        assert!(final_dir.join("v2-only.txt").exists());
        assert!(!final_dir.join("v1-only.txt").exists());
        assert!(!ws.root().join(".staging").join("tool.old").exists());
    }

    #[test]
    fn test_promote_without_staging_fails() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();

        let result = ws.promote("tool");

        assert!(matches!(result, Err(SyncError::Filesystem { .. })));
        assert!(!ws.target_dir("tool").exists());
    }

    #[test]
    fn test_pin_and_read_version() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();

        assert_eq!(ws.pinned_version("tool"), None);

        ws.pin_version("tool", "3.0.2").unwrap();
        assert_eq!(ws.pinned_version("tool"), Some("3.0.2".to_string()));

        ws.pin_version("tool", "3.1.0").unwrap();
        assert_eq!(ws.pinned_version("tool"), Some("3.1.0".to_string()));
    }

    #[test]
    fn test_pinned_version_trims_whitespace() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        ws.prepare().unwrap();
        fs::write(ws.version_file("tool"), "2.0.0\n").unwrap();

        assert_eq!(ws.pinned_version("tool"), Some("2.0.0".to_string()));
    }
}
