//! Pairing of split rename notifications.
//!
//! Native sources report a rename as a "from" half and a "to" half, sometimes
//! followed by a combined notification repeating both paths. This tracker
//! turns those into one `Moved` raw event, and degrades gracefully when a half
//! never shows up (moved in from, or out to, an unwatched place).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::watcher::event::{EntryKind, RawEvent};

/// How long a lone "from" half waits for its partner before it is reported
/// as a deletion by [`RenameTracker::expire`].
pub const RENAME_GRACE: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct PendingFrom {
    path: PathBuf,
    entry: EntryKind,
    tracker: Option<usize>,
    seen: Instant,
}

/// Holds at most one unmatched "from" half.
#[derive(Debug, Default)]
pub struct RenameTracker {
    pending: Option<PendingFrom>,
    /// Last pair emitted, so a trailing combined notification is swallowed.
    last_pair: Option<(PathBuf, PathBuf)>,
}

impl RenameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a "from" half. A previous unmatched half is returned as a deletion.
    pub fn from(&mut self, path: PathBuf, entry: EntryKind, tracker: Option<usize>) -> Option<RawEvent> {
        let previous = self.take_unmatched();
        self.pending = Some(PendingFrom {
            path,
            entry,
            tracker,
            seen: Instant::now(),
        });
        previous
    }

    /// Record a "to" half. Returns a move when it completes a pending "from"
    /// with the same tracker, otherwise a creation (plus the stale "from" as a
    /// deletion).
    pub fn to(&mut self, path: PathBuf, entry: EntryKind, tracker: Option<usize>) -> Vec<RawEvent> {
        match self.pending.take() {
            Some(from) if from.tracker == tracker => {
                self.last_pair = Some((from.path.clone(), path.clone()));
                vec![RawEvent::moved(entry, from.path, path)]
            }
            Some(from) => vec![
                RawEvent::deleted(from.entry, from.path),
                RawEvent::created(entry, path),
            ],
            None => vec![RawEvent::created(entry, path)],
        }
    }

    /// Handle a combined notification carrying both paths.
    pub fn both(&mut self, src: PathBuf, dest: PathBuf, entry: EntryKind) -> Option<RawEvent> {
        if self
            .last_pair
            .as_ref()
            .is_some_and(|(s, d)| *s == src && *d == dest)
        {
            self.last_pair = None;
            return None;
        }

        if self.pending.as_ref().is_some_and(|p| p.path == src) {
            self.pending = None;
        }
        self.last_pair = None;
        Some(RawEvent::moved(entry, src, dest))
    }

    /// Report the pending "from" as a deletion regardless of age.
    pub fn take_unmatched(&mut self) -> Option<RawEvent> {
        self.last_pair = None;
        self.pending
            .take()
            .map(|from| RawEvent::deleted(from.entry, from.path))
    }

    /// Report the pending "from" as a deletion if it has waited longer than
    /// `grace`.
    pub fn expire(&mut self, grace: Duration) -> Option<RawEvent> {
        if self.pending.as_ref().is_some_and(|p| p.seen.elapsed() >= grace) {
            self.take_unmatched()
        } else {
            None
        }
    }

    /// True if `path` is the pending "from" half.
    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.as_ref().is_some_and(|p| p.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::RawKind;

    #[test]
    fn test_from_to_pair_with_tracker() {
        let mut renames = RenameTracker::new();
        assert!(renames.from("/w/a".into(), EntryKind::File, Some(7)).is_none());
        assert!(renames.is_pending(Path::new("/w/a")));

        let out = renames.to("/w/b".into(), EntryKind::File, Some(7));
        assert_eq!(out, vec![RawEvent::moved(EntryKind::File, "/w/a", "/w/b")]);

        // The trailing combined notification repeats the pair
        assert!(renames.both("/w/a".into(), "/w/b".into(), EntryKind::File).is_none());
    }

    #[test]
    fn test_tracker_mismatch_splits_into_delete_and_create() {
        let mut renames = RenameTracker::new();
        renames.from("/w/a".into(), EntryKind::File, Some(1));

        let out = renames.to("/w/b".into(), EntryKind::File, Some(2));
        assert_eq!(out[0].kind, RawKind::Deleted);
        assert_eq!(out[1].kind, RawKind::Created);
    }

    #[test]
    fn test_lone_to_is_creation() {
        let mut renames = RenameTracker::new();
        let out = renames.to("/w/in".into(), EntryKind::Directory, None);
        assert_eq!(out, vec![RawEvent::created(EntryKind::Directory, "/w/in")]);
    }

    #[test]
    fn test_both_without_halves_is_move() {
        let mut renames = RenameTracker::new();
        let out = renames.both("/w/a".into(), "/w/b".into(), EntryKind::File);
        assert_eq!(out, Some(RawEvent::moved(EntryKind::File, "/w/a", "/w/b")));
    }

    #[test]
    fn test_lone_from_expires_as_deletion() {
        let mut renames = RenameTracker::new();
        renames.from("/w/out".into(), EntryKind::File, None);

        assert!(renames.expire(Duration::from_secs(60)).is_none());
        let expired = renames.expire(Duration::ZERO);
        assert_eq!(expired, Some(RawEvent::deleted(EntryKind::File, "/w/out")));
        assert!(!renames.is_pending(Path::new("/w/out")));
    }

    #[test]
    fn test_second_from_flushes_first() {
        let mut renames = RenameTracker::new();
        renames.from("/w/a".into(), EntryKind::File, None);
        let flushed = renames.from("/w/b".into(), EntryKind::File, None);
        assert_eq!(flushed, Some(RawEvent::deleted(EntryKind::File, "/w/a")));
    }
}
