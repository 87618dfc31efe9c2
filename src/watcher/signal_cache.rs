//! Short memory of what the consumer has already been told.
//!
//! Native sources emit bursts around a single logical change (several modifies
//! before a delete, a file-typed and a directory-typed delete for the same
//! path, a create echoed by a move). This cache lets the normalizer answer
//! "did we already say that?" without asking the consumer to deduplicate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paths the consumer currently believes deleted or created.
///
/// Marking a path one way always clears it from the other set, so the two
/// sets never overlap.
#[derive(Debug, Default)]
pub struct PendingSignalCache {
    reported_deleted: HashSet<PathBuf>,
    reported_created: HashSet<PathBuf>,
}

impl PendingSignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a creation (or move destination) was reported for `path`.
    pub fn mark_created(&mut self, path: &Path) {
        self.reported_deleted.remove(path);
        self.reported_created.insert(path.to_path_buf());
    }

    /// Record that a deletion (or move source) was reported for `path`.
    pub fn mark_deleted(&mut self, path: &Path) {
        self.reported_created.remove(path);
        self.reported_deleted.insert(path.to_path_buf());
    }

    /// Check if a creation was the last thing reported for `path`.
    pub fn was_created(&self, path: &Path) -> bool {
        self.reported_created.contains(path)
    }

    /// Check if a deletion was the last thing reported for `path`.
    pub fn was_deleted(&self, path: &Path) -> bool {
        self.reported_deleted.contains(path)
    }

    /// Forget everything remembered strictly below `dir`.
    ///
    /// Called when a directory goes away: whatever appears under the same
    /// name later is new.
    pub fn forget_tree(&mut self, dir: &Path) {
        self.reported_deleted.retain(|p| !is_below(p, dir));
        self.reported_created.retain(|p| !is_below(p, dir));
    }

    /// Carry what is remembered below `from` over to `to` after a directory move.
    ///
    /// Anything remembered below `to` belonged to whatever was there before
    /// and is dropped first.
    pub fn rename_tree(&mut self, from: &Path, to: &Path) {
        self.forget_tree(to);

        for set in [&mut self.reported_deleted, &mut self.reported_created] {
            let moved: Vec<PathBuf> = set.iter().filter(|p| is_below(p, from)).cloned().collect();
            for old in moved {
                set.remove(&old);
                if let Ok(rest) = old.strip_prefix(from) {
                    set.insert(to.join(rest));
                }
            }
        }
    }

    /// Forget everything. Called when a watch session starts.
    pub fn clear(&mut self) {
        self.reported_deleted.clear();
        self.reported_created.clear();
    }

    /// Check if there is anything remembered.
    pub fn is_empty(&self) -> bool {
        self.reported_deleted.is_empty() && self.reported_created.is_empty()
    }
}

fn is_below(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}
