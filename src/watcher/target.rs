//! The watched root and how its existence is observed.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::event::EntryKind;

/// Kind of the watched root as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    File,
    Directory,
    Unknown,
}

impl From<EntryKind> for TargetKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => TargetKind::File,
            EntryKind::Directory => TargetKind::Directory,
        }
    }
}

/// Kind a waiter should hold out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredKind {
    File,
    Directory,
    /// Whatever exists first.
    Any,
}

impl DesiredKind {
    pub fn accepts(self, kind: EntryKind) -> bool {
        matches!(
            (self, kind),
            (DesiredKind::Any, _)
                | (DesiredKind::File, EntryKind::File)
                | (DesiredKind::Directory, EntryKind::Directory)
        )
    }
}

/// Watch a single file or a whole directory tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    File,
    #[default]
    Dir,
}

impl WatchMode {
    pub fn desired_kind(self) -> DesiredKind {
        match self {
            WatchMode::File => DesiredKind::File,
            WatchMode::Dir => DesiredKind::Directory,
        }
    }
}

/// The root a watcher owns. `kind` is fixed from the moment existence is
/// detected until the root disappears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
    pub exists: bool,
}

impl WatchTarget {
    pub fn present(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
            exists: true,
        }
    }
}

/// Authoritative view of what is on disk right now.
///
/// Native sources lie about ordering and kind under load, so every ambiguous
/// decision in the normalizer is settled by asking a probe.
pub trait ExistenceProbe: Send + Sync {
    /// Current kind of the entry at `path`, or `None` if nothing is there.
    fn probe(&self, path: &Path) -> Option<EntryKind>;
}

/// Probe backed by the real filesystem.
///
/// I/O errors other than "not found" are logged and reported as absence, so
/// the caller falls back toward re-waiting instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl ExistenceProbe for DiskProbe {
    fn probe(&self, path: &Path) -> Option<EntryKind> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Some(EntryKind::Directory),
            Ok(_) => Some(EntryKind::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // A dangling symlink still occupies the path.
                std::fs::symlink_metadata(path)
                    .ok()
                    .map(|_| EntryKind::File)
            }
            Err(e) => {
                tracing::warn!("[probe] cannot stat {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_disk_probe_reports_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"x").unwrap();

        assert_eq!(DiskProbe.probe(temp_dir.path()), Some(EntryKind::Directory));
        assert_eq!(DiskProbe.probe(&file), Some(EntryKind::File));
        assert_eq!(DiskProbe.probe(&temp_dir.path().join("missing")), None);
    }

    #[test]
    fn test_desired_kind_accepts() {
        assert!(DesiredKind::Any.accepts(EntryKind::File));
        assert!(DesiredKind::Any.accepts(EntryKind::Directory));
        assert!(DesiredKind::File.accepts(EntryKind::File));
        assert!(!DesiredKind::File.accepts(EntryKind::Directory));
        assert!(!DesiredKind::Directory.accepts(EntryKind::File));
    }

    #[test]
    fn test_watch_mode_desired_kind() {
        assert_eq!(WatchMode::File.desired_kind(), DesiredKind::File);
        assert_eq!(WatchMode::Dir.desired_kind(), DesiredKind::Directory);
        assert_eq!(WatchMode::default(), WatchMode::Dir);
    }
}
