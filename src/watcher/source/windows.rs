//! Strategy for ReadDirectoryChangesW.
//!
//! Removal notifications carry no kind, a parent directory gets a modify
//! for every change inside it, and rename halves have no tracker. Every
//! decision is therefore checked against the disk.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use super::rename::{RENAME_GRACE, RenameTracker};
use super::{PlatformStrategy, translate_rename};
use crate::watcher::event::{EntryKind, RawEvent};
use crate::watcher::target::ExistenceProbe;

pub struct WindowsStrategy {
    probe: Box<dyn ExistenceProbe>,
    renames: RenameTracker,
}

impl WindowsStrategy {
    pub fn new(probe: Box<dyn ExistenceProbe>) -> Self {
        Self {
            probe,
            renames: RenameTracker::new(),
        }
    }

    /// A path that has already vanished is reported as a file; the
    /// normalizer corrects that from its directory cache.
    fn kind_of(&self, path: &Path) -> EntryKind {
        self.probe.probe(path).unwrap_or(EntryKind::File)
    }
}

impl PlatformStrategy for WindowsStrategy {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn translate(&mut self, event: Event) -> Vec<RawEvent> {
        if let EventKind::Modify(ModifyKind::Name(mode)) = event.kind {
            // No trackers here: halves pair with whatever comes next
            return translate_rename(
                &mut self.renames,
                self.probe.as_ref(),
                mode,
                event.paths,
                None,
            );
        }

        let mut out = Vec::new();
        match event.kind {
            EventKind::Create(_) => {
                out.extend(self.renames.take_unmatched());
                for path in event.paths {
                    let entry = self.kind_of(&path);
                    out.push(RawEvent::created(entry, path));
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => {
                out.extend(self.renames.take_unmatched());
                for path in event.paths {
                    match self.probe.probe(&path) {
                        // Echo of a change inside the directory; the
                        // normalizer reports the parent update itself
                        Some(EntryKind::Directory) => {}
                        Some(EntryKind::File) | None => {
                            out.push(RawEvent::modified(EntryKind::File, path))
                        }
                    }
                }
            }
            EventKind::Remove(_) => {
                out.extend(self.renames.take_unmatched());
                for path in event.paths {
                    out.push(RawEvent::deleted(EntryKind::File, path));
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
        out
    }

    fn flush(&mut self) -> Vec<RawEvent> {
        self.renames.expire(RENAME_GRACE).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeDisk, event};
    use super::*;
    use notify::event::{CreateKind, RemoveKind, RenameMode};

    fn strategy(disk: FakeDisk) -> WindowsStrategy {
        WindowsStrategy::new(Box::new(disk))
    }

    #[test]
    fn test_create_kind_comes_from_disk() {
        let mut s = strategy(FakeDisk::with(&[("/w/d", EntryKind::Directory)]));
        let out = s.translate(event(EventKind::Create(CreateKind::Any), &["/w/d"]));
        assert_eq!(out, vec![RawEvent::created(EntryKind::Directory, "/w/d")]);
    }

    #[test]
    fn test_remove_is_always_file_typed() {
        let mut s = strategy(FakeDisk::default());
        let out = s.translate(event(EventKind::Remove(RemoveKind::Any), &["/w/d"]));
        assert_eq!(out, vec![RawEvent::deleted(EntryKind::File, "/w/d")]);
    }

    #[test]
    fn test_directory_modify_is_dropped() {
        let mut s = strategy(FakeDisk::with(&[("/w/d", EntryKind::Directory)]));
        let modify = EventKind::Modify(ModifyKind::Any);
        assert!(s.translate(event(modify, &["/w/d"])).is_empty());
    }

    #[test]
    fn test_ghost_modify_is_passed_through() {
        // The normalizer turns this into a single deletion
        let mut s = strategy(FakeDisk::default());
        let modify = EventKind::Modify(ModifyKind::Any);
        let out = s.translate(event(modify, &["/w/gone.txt"]));
        assert_eq!(out, vec![RawEvent::modified(EntryKind::File, "/w/gone.txt")]);
    }

    #[test]
    fn test_rename_halves_pair_without_tracker() {
        let mut s = strategy(FakeDisk::with(&[("/w/new", EntryKind::Directory)]));
        let name = |mode| EventKind::Modify(ModifyKind::Name(mode));

        assert!(s.translate(event(name(RenameMode::From), &["/w/old"])).is_empty());
        let out = s.translate(event(name(RenameMode::To), &["/w/new"]));
        assert_eq!(
            out,
            vec![RawEvent::moved(EntryKind::Directory, "/w/old", "/w/new")]
        );
    }
}
