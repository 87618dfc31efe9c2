//! Translation of raw native notifications into semantic events.
//!
//! Every decision that depends on a native tag (created / modified / deleted,
//! file / directory) is settled against the disk first. The tag is a hint.
//!
//! | raw event            | on disk now | emitted                                   |
//! |----------------------|-------------|-------------------------------------------|
//! | `Created`            | present     | `Created*` unless already reported         |
//! | `Created`            | absent      | nothing (zombie)                           |
//! | `Modified` file      | present     | `UpdatedDir(parent)`, `UpdatedFile`        |
//! | `Modified` file      | present, reported deleted | `CreatedFile`                 |
//! | `Modified`           | absent      | `UpdatedDir(parent)`, `Deleted*` once      |
//! | `Moved`              | -           | `MovedFile` / `MovedDir`                   |
//! | `Deleted`            | present     | nothing (spurious)                         |
//! | `Deleted`            | absent      | `UpdatedDir(parent)`, `Deleted*` once      |
//!
//! `Deleted*` is `DeletedDir` when the path is a cached directory, whatever
//! the native tag said.

use std::path::{Path, PathBuf};

use super::dir_cache::DirectoryCache;
use super::event::{EntryKind, RawEvent, RawKind, SemanticEvent};
use super::signal_cache::PendingSignalCache;
use super::target::{DiskProbe, ExistenceProbe, TargetKind, WatchMode};

/// Stateful normalizer for one watcher.
///
/// Owns the directory cache and the pending-signal cache; both live and die
/// with a single watch session (see [`EventNormalizer::reset`]).
pub struct EventNormalizer {
    root: PathBuf,
    mode: WatchMode,
    dirs: DirectoryCache,
    signals: PendingSignalCache,
    probe: Box<dyn ExistenceProbe>,
    root_lost: bool,
}

impl EventNormalizer {
    /// Create a normalizer that checks reality on the real filesystem.
    pub fn new(root: impl Into<PathBuf>, mode: WatchMode) -> Self {
        Self::with_probe(root, mode, DiskProbe)
    }

    /// Create a normalizer with a custom existence probe.
    pub fn with_probe(
        root: impl Into<PathBuf>,
        mode: WatchMode,
        probe: impl ExistenceProbe + 'static,
    ) -> Self {
        Self {
            root: root.into(),
            mode,
            dirs: DirectoryCache::new(),
            signals: PendingSignalCache::new(),
            probe: Box::new(probe),
            root_lost: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directories(&self) -> &DirectoryCache {
        &self.dirs
    }

    pub fn signals(&self) -> &PendingSignalCache {
        &self.signals
    }

    /// True once the root has been reported gone for the current session.
    pub fn root_lost(&self) -> bool {
        self.root_lost
    }

    /// Start a fresh session: rebuild the directory cache (directory mode
    /// only) and forget every pending signal.
    pub fn reset(&mut self) {
        self.signals.clear();
        self.root_lost = false;
        match self.mode {
            WatchMode::Dir => self.dirs.rebuild(&self.root),
            WatchMode::File => self.dirs.clear(),
        }
    }

    /// Rebuild the directory cache after the native source lost track
    /// (queue overflow, rescan request).
    pub fn rescan(&mut self) {
        if self.mode == WatchMode::Dir {
            crate::log_event!("normalizer", "rescan", "{}", self.root.display());
            self.dirs.rebuild(&self.root);
        }
    }

    /// Drop all session state. Called when the root goes away.
    pub fn discard(&mut self) {
        self.dirs.clear();
        self.signals.clear();
    }

    /// Event announcing the root, emitted when a session starts.
    pub fn root_appeared(&mut self) -> SemanticEvent {
        match self.mode {
            WatchMode::File => {
                self.signals.mark_created(&self.root);
                SemanticEvent::CreatedFile {
                    path: self.root.clone(),
                }
            }
            WatchMode::Dir => SemanticEvent::RootAppeared {
                path: self.root.clone(),
                kind: TargetKind::Directory,
            },
        }
    }

    /// Event announcing the loss of the root. Returns `None` if the loss was
    /// already reported in this session.
    pub fn root_disappeared(&mut self) -> Option<SemanticEvent> {
        if self.root_lost {
            return None;
        }
        self.root_lost = true;

        Some(match self.mode {
            WatchMode::File => SemanticEvent::DeletedFile {
                path: self.root.clone(),
            },
            WatchMode::Dir => SemanticEvent::RootDisappeared {
                path: self.root.clone(),
                kind: TargetKind::Directory,
            },
        })
    }

    /// Convert one raw event into zero or more semantic events.
    pub fn process(&mut self, raw: RawEvent) -> Vec<SemanticEvent> {
        if self.root_lost {
            return Vec::new();
        }

        tracing::trace!("[normalizer] raw {raw:?}");

        match self.mode {
            WatchMode::File => self.process_file_root(raw),
            WatchMode::Dir => self.process_tree(raw),
        }
    }

    // -- file mode -----------------------------------------------------------

    fn process_file_root(&mut self, raw: RawEvent) -> Vec<SemanticEvent> {
        if !raw.touches(&self.root) {
            return Vec::new();
        }

        if self.probe.probe(&self.root) != Some(EntryKind::File) {
            return self.root_disappeared().into_iter().collect();
        }

        match raw.kind {
            RawKind::Created if self.signals.was_created(&self.root) => {
                crate::debug_event!("normalizer", "dropped echo of root creation");
                Vec::new()
            }
            // Deleted while a file is still there: replaced before we looked.
            RawKind::Deleted => Vec::new(),
            RawKind::Created | RawKind::Modified | RawKind::Moved => {
                self.signals.mark_created(&self.root);
                vec![SemanticEvent::UpdatedFile {
                    path: self.root.clone(),
                }]
            }
        }
    }

    // -- directory mode ------------------------------------------------------

    fn process_tree(&mut self, raw: RawEvent) -> Vec<SemanticEvent> {
        if raw.src == self.root || raw.dest.as_deref() == Some(self.root.as_path()) {
            return self.root_level(raw.kind);
        }

        let src_inside = raw.src.starts_with(&self.root);

        match raw.kind {
            _ if !src_inside && raw.kind != RawKind::Moved => Vec::new(),
            RawKind::Created => self.created(&raw.src),
            RawKind::Modified => self.modified(&raw.src, raw.entry),
            RawKind::Deleted => self.deleted(&raw.src, raw.entry),
            RawKind::Moved => match raw.dest {
                Some(dest) => {
                    let dest_inside = dest.starts_with(&self.root);
                    match (src_inside, dest_inside) {
                        (true, true) => self.moved(&raw.src, &dest, raw.entry),
                        (true, false) => self.deleted(&raw.src, raw.entry),
                        (false, true) => self.created(&dest),
                        (false, false) => Vec::new(),
                    }
                }
                None if src_inside => self.deleted(&raw.src, raw.entry),
                None => Vec::new(),
            },
        }
    }

    fn root_level(&mut self, kind: RawKind) -> Vec<SemanticEvent> {
        match self.probe.probe(&self.root) {
            Some(EntryKind::Directory) if kind == RawKind::Modified => {
                vec![SemanticEvent::UpdatedDir {
                    path: self.root.clone(),
                }]
            }
            Some(EntryKind::Directory) => Vec::new(),
            _ => self.root_disappeared().into_iter().collect(),
        }
    }

    fn created(&mut self, path: &Path) -> Vec<SemanticEvent> {
        let Some(actual) = self.probe.probe(path) else {
            crate::debug_event!("normalizer", "dropped zombie create", "{}", path.display());
            return Vec::new();
        };

        if actual == EntryKind::Directory {
            // Keep the cache current even for duplicate notifications
            self.dirs.insert_tree(path);
        }

        if self.signals.was_created(path) {
            crate::debug_event!("normalizer", "dropped repeat create", "{}", path.display());
            return Vec::new();
        }

        self.signals.mark_created(path);
        let path = path.to_path_buf();
        match actual {
            EntryKind::File => vec![SemanticEvent::CreatedFile { path }],
            EntryKind::Directory => vec![SemanticEvent::CreatedDir { path }],
        }
    }

    fn modified(&mut self, path: &Path, claimed: EntryKind) -> Vec<SemanticEvent> {
        match self.probe.probe(path) {
            Some(actual) if self.signals.was_deleted(path) => {
                // Came back after we reported it gone: that is a creation
                self.signals.mark_created(path);
                let path = path.to_path_buf();
                match actual {
                    EntryKind::File => vec![SemanticEvent::CreatedFile { path }],
                    EntryKind::Directory => {
                        self.dirs.insert_tree(&path);
                        vec![SemanticEvent::CreatedDir { path }]
                    }
                }
            }
            Some(EntryKind::File) => vec![
                SemanticEvent::UpdatedDir {
                    path: self.parent_of(path),
                },
                SemanticEvent::UpdatedFile {
                    path: path.to_path_buf(),
                },
            ],
            Some(EntryKind::Directory) => vec![SemanticEvent::UpdatedDir {
                path: path.to_path_buf(),
            }],
            None => self.vanished(path, claimed),
        }
    }

    fn deleted(&mut self, path: &Path, claimed: EntryKind) -> Vec<SemanticEvent> {
        if self.signals.was_deleted(path) {
            crate::debug_event!("normalizer", "absorbed follow-up delete", "{}", path.display());
            return Vec::new();
        }

        if self.probe.probe(path).is_some() {
            crate::debug_event!("normalizer", "dropped spurious delete", "{}", path.display());
            return Vec::new();
        }

        self.vanished(path, claimed)
    }

    /// `path` is confirmed absent. Report it once, as a directory if it was one.
    fn vanished(&mut self, path: &Path, claimed: EntryKind) -> Vec<SemanticEvent> {
        if self.signals.was_deleted(path) {
            crate::debug_event!("normalizer", "dropped stale event", "{}", path.display());
            return Vec::new();
        }

        let was_dir = self.dirs.remove_tree(path) || claimed == EntryKind::Directory;
        self.signals.mark_deleted(path);
        // Anything recreated under this name later is new
        self.signals.forget_tree(path);

        let parent = SemanticEvent::UpdatedDir {
            path: self.parent_of(path),
        };
        let path = path.to_path_buf();
        if was_dir {
            vec![parent, SemanticEvent::DeletedDir { path }]
        } else {
            vec![parent, SemanticEvent::DeletedFile { path }]
        }
    }

    fn moved(&mut self, src: &Path, dest: &Path, claimed: EntryKind) -> Vec<SemanticEvent> {
        if src == dest {
            return Vec::new();
        }

        let is_dir = self.dirs.contains(src)
            || claimed == EntryKind::Directory
            || self.probe.probe(dest) == Some(EntryKind::Directory);

        self.signals.mark_deleted(src);
        self.signals.mark_created(dest);

        let from = src.to_path_buf();
        let to = dest.to_path_buf();
        if is_dir {
            self.dirs.rename_tree(src, dest);
            self.dirs.insert_tree(dest);
            self.signals.rename_tree(src, dest);
            vec![SemanticEvent::MovedDir { from, to }]
        } else {
            vec![SemanticEvent::MovedFile { from, to }]
        }
    }

    fn parent_of(&self, path: &Path) -> PathBuf {
        path.parent()
            .filter(|p| p.starts_with(&self.root))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }
}

impl std::fmt::Debug for EventNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNormalizer")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("dirs", &self.dirs.len())
            .field("root_lost", &self.root_lost)
            .finish()
    }
}
