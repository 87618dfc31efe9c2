//! Strategy for POSIX backends (inotify, FSEvents, kqueue).
//!
//! These report accurate file/folder tags on create and remove and attach a
//! tracker to rename halves, so the disk is only consulted when a tag is
//! missing.

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

use super::rename::{RENAME_GRACE, RenameTracker};
use super::{PlatformStrategy, translate_rename};
use crate::watcher::event::{EntryKind, RawEvent};
use crate::watcher::target::ExistenceProbe;

pub struct PosixStrategy {
    probe: Box<dyn ExistenceProbe>,
    renames: RenameTracker,
}

impl PosixStrategy {
    pub fn new(probe: Box<dyn ExistenceProbe>) -> Self {
        Self {
            probe,
            renames: RenameTracker::new(),
        }
    }

    fn kind_of(&self, path: &std::path::Path) -> EntryKind {
        self.probe.probe(path).unwrap_or(EntryKind::File)
    }
}

impl PlatformStrategy for PosixStrategy {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn translate(&mut self, event: Event) -> Vec<RawEvent> {
        let tracker = event.tracker();

        if let EventKind::Modify(ModifyKind::Name(mode)) = event.kind {
            return translate_rename(
                &mut self.renames,
                self.probe.as_ref(),
                mode,
                event.paths,
                tracker,
            );
        }

        let mut out = Vec::new();
        match event.kind {
            EventKind::Create(kind) => {
                out.extend(self.renames.take_unmatched());
                for path in event.paths {
                    let entry = match kind {
                        CreateKind::File => EntryKind::File,
                        CreateKind::Folder => EntryKind::Directory,
                        _ => self.kind_of(&path),
                    };
                    out.push(RawEvent::created(entry, path));
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => {
                out.extend(self.renames.take_unmatched());
                for path in event.paths {
                    let entry = self.kind_of(&path);
                    out.push(RawEvent::modified(entry, path));
                }
            }
            EventKind::Remove(kind) => {
                out.extend(self.renames.take_unmatched());
                let entry = match kind {
                    RemoveKind::Folder => EntryKind::Directory,
                    _ => EntryKind::File,
                };
                for path in event.paths {
                    out.push(RawEvent::deleted(entry, path));
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
