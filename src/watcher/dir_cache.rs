//! Known subdirectories of a watched root.
//!
//! Once a path is gone there is no way to ask the filesystem whether it used to
//! be a directory, and some native sources report a directory deletion as a
//! file deletion. The cache keeps the answer around.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Set of absolute directory paths below a root (the root itself excluded).
#[derive(Debug, Default)]
pub struct DirectoryCache {
    dirs: HashSet<PathBuf>,
}

impl DirectoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the cache and walk `root` again.
    ///
    /// Unreadable entries are logged and skipped; they are picked up by later
    /// create events if they become readable.
    pub fn rebuild(&mut self, root: &Path) {
        self.dirs.clear();
        self.walk_into(root);
        crate::debug_event!(
            "dir-cache",
            "built",
            "{} dirs under {}",
            self.dirs.len(),
            root.display()
        );
    }

    /// Record a new directory and every directory already inside it.
    ///
    /// A directory moved or copied into the tree arrives with its contents, and
    /// the native source only reports the top of it.
    pub fn insert_tree(&mut self, dir: &Path) {
        self.dirs.insert(dir.to_path_buf());
        self.walk_into(dir);
    }

    /// Forget a directory and everything cached beneath it.
    pub fn remove_tree(&mut self, dir: &Path) -> bool {
        let before = self.dirs.len();
        self.dirs.retain(|p| !p.starts_with(dir));
        self.dirs.len() != before
    }

    /// Re-root a directory and its cached descendants after a move.
    pub fn rename_tree(&mut self, from: &Path, to: &Path) {
        let moved: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();

        for old in moved {
            self.dirs.remove(&old);
            if let Ok(rest) = old.strip_prefix(from) {
                let renamed = if rest.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rest)
                };
                self.dirs.insert(renamed);
            }
        }
        self.dirs.insert(to.to_path_buf());
    }

    /// Check if a path is a known directory.
    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// Get count of known directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    fn walk_into(&mut self, dir: &Path) {
        for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    self.dirs.insert(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("[dir-cache] skipping unreadable entry: {e}");
                }
            }
        }
    }
}
