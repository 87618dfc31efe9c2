//! Raw and semantic event types.
//!
//! [`RawEvent`] is what a platform strategy decodes out of a native notification.
//! [`SemanticEvent`] is the closed set of facts delivered to consumers.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::target::TargetKind;

/// Sending half of the consumer's output channel.
pub type EventSender = mpsc::UnboundedSender<SemanticEvent>;

/// Receiving half of the consumer's output channel.
pub type EventReceiver = mpsc::UnboundedReceiver<SemanticEvent>;

/// Create an ordered, unbounded output channel for semantic events.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Whether a raw notification claims to concern a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// What happened, according to the native source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    Created,
    Modified,
    Moved,
    Deleted,
}

/// A decoded native notification. Consumed exactly once by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawKind,
    pub entry: EntryKind,
    pub src: PathBuf,
    /// Destination of a move. `None` for every other kind.
    pub dest: Option<PathBuf>,
}

impl RawEvent {
    pub fn created(entry: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self::single(RawKind::Created, entry, path)
    }

    pub fn modified(entry: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self::single(RawKind::Modified, entry, path)
    }

    pub fn deleted(entry: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self::single(RawKind::Deleted, entry, path)
    }

    pub fn moved(entry: EntryKind, src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            kind: RawKind::Moved,
            entry,
            src: src.into(),
            dest: Some(dest.into()),
        }
    }

    fn single(kind: RawKind, entry: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            entry,
            src: path.into(),
            dest: None,
        }
    }

    /// True if either end of the event is `path`.
    pub fn touches(&self, path: &Path) -> bool {
        self.src == path || self.dest.as_deref() == Some(path)
    }
}

/// A normalized, deduplicated change delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SemanticEvent {
    CreatedFile { path: PathBuf },
    UpdatedFile { path: PathBuf },
    MovedFile { from: PathBuf, to: PathBuf },
    DeletedFile { path: PathBuf },
    CreatedDir { path: PathBuf },
    UpdatedDir { path: PathBuf },
    MovedDir { from: PathBuf, to: PathBuf },
    DeletedDir { path: PathBuf },
    /// The watched root itself came into existence.
    RootAppeared { path: PathBuf, kind: TargetKind },
    /// The watched root itself went away.
    RootDisappeared { path: PathBuf, kind: TargetKind },
}

/// Fieldless discriminant of [`SemanticEvent`], used to advertise what a
/// watcher configuration can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticEventKind {
    CreatedFile,
    UpdatedFile,
    MovedFile,
    DeletedFile,
    CreatedDir,
    UpdatedDir,
    MovedDir,
    DeletedDir,
    RootAppeared,
    RootDisappeared,
}

impl SemanticEvent {
    pub fn kind(&self) -> SemanticEventKind {
        match self {
            Self::CreatedFile { .. } => SemanticEventKind::CreatedFile,
            Self::UpdatedFile { .. } => SemanticEventKind::UpdatedFile,
            Self::MovedFile { .. } => SemanticEventKind::MovedFile,
            Self::DeletedFile { .. } => SemanticEventKind::DeletedFile,
            Self::CreatedDir { .. } => SemanticEventKind::CreatedDir,
            Self::UpdatedDir { .. } => SemanticEventKind::UpdatedDir,
            Self::MovedDir { .. } => SemanticEventKind::MovedDir,
            Self::DeletedDir { .. } => SemanticEventKind::DeletedDir,
            Self::RootAppeared { .. } => SemanticEventKind::RootAppeared,
            Self::RootDisappeared { .. } => SemanticEventKind::RootDisappeared,
        }
    }

    /// The affected path. For moves this is the destination.
    pub fn path(&self) -> &Path {
        match self {
            Self::CreatedFile { path }
            | Self::UpdatedFile { path }
            | Self::DeletedFile { path }
            | Self::CreatedDir { path }
            | Self::UpdatedDir { path }
            | Self::DeletedDir { path }
            | Self::RootAppeared { path, .. }
            | Self::RootDisappeared { path, .. } => path,
            Self::MovedFile { to, .. } | Self::MovedDir { to, .. } => to,
        }
    }
}

impl fmt::Display for SemanticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovedFile { from, to } | Self::MovedDir { from, to } => write!(
                f,
                "{:?} {} -> {}",
                self.kind(),
                from.display(),
                to.display()
            ),
            Self::RootAppeared { path, kind } | Self::RootDisappeared { path, kind } => {
                write!(f, "{:?} {} ({kind:?})", self.kind(), path.display())
            }
            _ => write!(f, "{:?} {}", self.kind(), self.path().display()),
        }
    }
}
