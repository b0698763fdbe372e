//! Age-based retention sweep
//!
//! Removes regular files older than a retention window from a directory.
//! Built for the temp-upload tree but usable against any flat directory of
//! generated files. Subdirectories are left alone.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
}

/// Remove files under `directory` whose modification time is at or past the
/// retention cutoff of `max_age_days`. A missing directory is a no-op.
/// Per-file failures are logged and skipped; the sweep keeps going.
///
/// Blocking; run it in `spawn_blocking` from async contexts.
pub fn sweep(directory: &Path, max_age_days: u64) -> Result<SweepStats, SweepError> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                directory = %directory.display(),
                "Retention sweep target does not exist, nothing to do"
            );
            return Ok(SweepStats::default());
        }
        Err(source) => {
            return Err(SweepError::ReadDir {
                path: directory.to_path_buf(),
                source,
            });
        }
    };

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(max_age_days * 86_400))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut stats = SweepStats::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    directory = %directory.display(),
                    "Failed to read directory entry during retention sweep"
                );
                continue;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to stat file during retention sweep");
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }
        stats.scanned += 1;

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "File has no modification time, skipping");
                continue;
            }
        };

        // <= so a zero-day window sweeps everything, including files created
        // within the current second.
        if modified <= cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    stats.removed += 1;
                    tracing::info!(path = %path.display(), "Removed expired file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to remove expired file");
                }
            }
        }
    }

    tracing::debug!(
        directory = %directory.display(),
        scanned = stats.scanned,
        removed = stats.removed,
        max_age_days,
        "Retention sweep finished"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sweep_missing_directory_is_noop() {
        let dir = tempdir().unwrap();
        let stats = sweep(&dir.path().join("nope"), 30).unwrap();
        assert_eq!(stats, SweepStats::default());
    }

    #[test]
    fn test_sweep_zero_days_removes_fresh_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"b").unwrap();

        let stats = sweep(dir.path(), 0).unwrap();
        assert_eq!(stats.scanned, 2);
        assert_eq!(stats.removed, 2);
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_sweep_keeps_files_inside_window() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.jpg"), b"x").unwrap();

        let stats = sweep(dir.path(), 1).unwrap();
        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.removed, 0);
        assert!(dir.path().join("fresh.jpg").exists());
    }

    #[test]
    fn test_sweep_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/deep.jpg"), b"x").unwrap();

        let stats = sweep(dir.path(), 0).unwrap();
        assert_eq!(stats.scanned, 0);
        assert!(dir.path().join("nested/deep.jpg").exists());
    }
}
