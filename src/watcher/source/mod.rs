//! Native event source.
//!
//! Wraps a `notify` watcher. The notify callback runs on the backend's own
//! thread and only forwards results into an unbounded channel; translation to
//! [`RawEvent`]s happens on the watcher task, through a [`PlatformStrategy`]
//! chosen for the backend's dialect.

mod coalesce;
mod posix;
mod rename;
mod windows;

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::WatchError;
use super::event::{EntryKind, RawEvent};
use super::target::{DiskProbe, ExistenceProbe, WatchMode};

pub use coalesce::{CREATION_SETTLE, WriteCoalescer};
pub use posix::PosixStrategy;
pub use rename::{RENAME_GRACE, RenameTracker};
pub use windows::WindowsStrategy;

/// Native notification dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// inotify, FSEvents, kqueue: reliable kinds, rename trackers.
    Posix,
    /// ReadDirectoryChangesW: no kinds on removal, ghost modifies.
    Windows,
}

impl Platform {
    /// Dialect of the backend compiled into this build.
    pub fn native() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Build the translation strategy for this dialect.
    pub fn strategy(self, probe: Box<dyn ExistenceProbe>) -> Box<dyn PlatformStrategy> {
        match self {
            Platform::Posix => Box::new(PosixStrategy::new(probe)),
            Platform::Windows => Box::new(WindowsStrategy::new(probe)),
        }
    }
}

/// Platform selection as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformChoice {
    #[default]
    Auto,
    Posix,
    Windows,
}

impl PlatformChoice {
    pub fn resolve(self) -> Platform {
        match self {
            PlatformChoice::Auto => Platform::native(),
            PlatformChoice::Posix => Platform::Posix,
            PlatformChoice::Windows => Platform::Windows,
        }
    }
}

/// Translates native notifications of one dialect into raw events.
///
/// Implementations may hold state across calls (rename halves).
pub trait PlatformStrategy: Send {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Decode one native notification. Irrelevant notifications yield nothing.
    fn translate(&mut self, event: Event) -> Vec<RawEvent>;

    /// Release anything held back for longer than it is worth waiting.
    /// Called on every poll tick.
    fn flush(&mut self) -> Vec<RawEvent>;
}

/// What the source hands to the watcher loop.
#[derive(Debug)]
pub enum SourceSignal {
    /// Decoded raw events, in arrival order.
    Events(Vec<RawEvent>),
    /// The backend dropped events; caches must be rebuilt from disk.
    Rescan,
    /// The backend reported an error. The session continues.
    Error(notify::Error),
}

/// A running native watch on one root.
pub struct NativeEventSource {
    watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    strategy: Box<dyn PlatformStrategy>,
    coalescer: WriteCoalescer,
    watched: PathBuf,
}

impl NativeEventSource {
    /// Start watching `root`.
    ///
    /// Directory mode watches the tree recursively. File mode watches the
    /// parent directory non-recursively, so replacement of the file by
    /// rename is seen.
    pub fn start(
        root: &Path,
        mode: WatchMode,
        platform: Platform,
        coalesce_window_ms: u64,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Runs on the backend thread; the receiver outlives the watcher
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let (watched, recursive) = match mode {
            WatchMode::Dir => (root.to_path_buf(), RecursiveMode::Recursive),
            WatchMode::File => (
                root.parent().unwrap_or(root).to_path_buf(),
                RecursiveMode::NonRecursive,
            ),
        };

        watcher
            .watch(&watched, recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: watched.clone(),
                reason: e.to_string(),
            })?;

        let strategy = platform.strategy(Box::new(DiskProbe));
        crate::debug_event!(
            "source",
            "started",
            "{} ({}, {recursive:?})",
            watched.display(),
            strategy.name()
        );

        Ok(Self {
            watcher,
            rx,
            strategy,
            coalescer: WriteCoalescer::new(coalesce_window_ms),
            watched,
        })
    }

    /// Directory handed to the native backend.
    pub fn watched_path(&self) -> &Path {
        &self.watched
    }

    /// Wait for the next non-empty batch.
    ///
    /// Returns `None` when the backend has gone away. Cancel-safe: nothing is
    /// held across the only await point.
    pub async fn recv(&mut self) -> Option<SourceSignal> {
        loop {
            let event = match self.rx.recv().await? {
                Ok(event) => event,
                Err(e) => return Some(SourceSignal::Error(e)),
            };

            if event.need_rescan() {
                return Some(SourceSignal::Rescan);
            }

            if let EventKind::Access(AccessKind::Close(AccessMode::Write)) = event.kind {
                for path in &event.paths {
                    self.coalescer.release(path);
                }
                continue;
            }

            let raws = self.strategy.translate(event);
            let batch = self.admit(raws);
            if !batch.is_empty() {
                return Some(SourceSignal::Events(batch));
            }
        }
    }

    /// Raw events held back by the strategy or the coalescer that should not
    /// be held any longer.
    pub fn flush(&mut self) -> Vec<RawEvent> {
        let held = self.strategy.flush();
        let mut out = self.admit(held);
        out.extend(self.coalescer.take_ready());
        out
    }

    /// Tear down the native watch, waiting at most `timeout` for the backend
    /// thread to let go.
    pub async fn stop(self, timeout: Duration) {
        let Self {
            watcher, watched, ..
        } = self;

        let teardown = tokio::task::spawn_blocking(move || drop(watcher));
        match tokio::time::timeout(timeout, teardown).await {
            Ok(Ok(())) => {
                crate::debug_event!("source", "stopped", "{}", watched.display());
            }
            Ok(Err(e)) => {
                tracing::warn!("[source] teardown of {} failed: {e}", watched.display());
            }
            Err(_) => {
                tracing::warn!(
                    "[source] teardown of {} did not finish within {timeout:?}",
                    watched.display()
                );
            }
        }
    }

    fn admit(&mut self, raws: Vec<RawEvent>) -> Vec<RawEvent> {
        raws.into_iter()
            .filter(|raw| self.coalescer.admit(raw))
            .collect()
    }
}

impl std::fmt::Debug for NativeEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEventSource")
            .field("watched", &self.watched)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// Decode a rename notification. Shared by both dialects; they differ only
/// in whether trackers are present.
pub(crate) fn translate_rename(
    renames: &mut RenameTracker,
    probe: &dyn ExistenceProbe,
    mode: RenameMode,
    paths: Vec<PathBuf>,
    tracker: Option<usize>,
) -> Vec<RawEvent> {
    let mut out = Vec::new();
    match mode {
        RenameMode::From => {
            for path in paths {
                // Already gone; the normalizer's directory cache knows better
                out.extend(renames.from(path, EntryKind::File, tracker));
            }
        }
        RenameMode::To => {
            for path in paths {
                let entry = probe.probe(&path).unwrap_or(EntryKind::File);
                out.extend(renames.to(path, entry, tracker));
            }
        }
        RenameMode::Both => {
            let mut paths = paths.into_iter();
            if let (Some(src), Some(dest)) = (paths.next(), paths.next()) {
                let entry = probe.probe(&dest).unwrap_or(EntryKind::File);
                out.extend(renames.both(src, dest, entry));
            }
        }
        // FSEvents reports each side of a rename without saying which it is
        RenameMode::Any | RenameMode::Other => {
            out.extend(renames.take_unmatched());
            for path in paths {
                match probe.probe(&path) {
                    Some(entry) => out.push(RawEvent::created(entry, path)),
                    None => out.push(RawEvent::deleted(EntryKind::File, path)),
                }
            }
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_choice_resolves() {
        assert_eq!(PlatformChoice::Posix.resolve(), Platform::Posix);
        assert_eq!(PlatformChoice::Windows.resolve(), Platform::Windows);
        assert_eq!(PlatformChoice::Auto.resolve(), Platform::native());
        assert_eq!(PlatformChoice::default(), PlatformChoice::Auto);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Platform::Posix.strategy(Box::new(DiskProbe)).name(), "posix");
        assert_eq!(
            Platform::Windows.strategy(Box::new(DiskProbe)).name(),
            "windows"
        );
    }

    #[tokio::test]
    async fn test_start_on_missing_path_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = NativeEventSource::start(&missing, WatchMode::Dir, Platform::native(), 0);
        assert!(matches!(result, Err(WatchError::PathWatchFailed { .. })));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let source =
            NativeEventSource::start(temp_dir.path(), WatchMode::Dir, Platform::native(), 100)
                .unwrap();
        assert_eq!(source.watched_path(), temp_dir.path());
        source.stop(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_file_mode_watches_parent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        let source =
            NativeEventSource::start(&file, WatchMode::File, Platform::native(), 100).unwrap();
        assert_eq!(source.watched_path(), temp_dir.path());
        source.stop(Duration::from_secs(5)).await;
    }
}
