//! Write-burst coalescing.
//!
//! A single save often reaches us as a create followed by several modifies.
//! The first event of a burst passes straight through; later modifies for the
//! same path inside the window are held and released as one trailing modify
//! once the path has been quiet for the window. A close-after-write ends the
//! burst early: one open-write-close session is one change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::watcher::event::{EntryKind, RawEvent, RawKind};

/// Modifies this close to the previous event of a creation burst are the
/// creation's own content being written.
pub const CREATION_SETTLE: Duration = Duration::from_millis(20);

/// One open burst for a path.
#[derive(Debug)]
struct Burst {
    started: Instant,
    last: Instant,
    /// Opened by a creation rather than a modify.
    created: bool,
    /// A held modify is owed to the consumer.
    trailing: Option<EntryKind>,
}

impl Burst {
    fn open(now: Instant, created: bool) -> Self {
        Self {
            started: now,
            last: now,
            created,
            trailing: None,
        }
    }
}

/// Coalesces modify bursts by path.
#[derive(Debug)]
pub struct WriteCoalescer {
    recent: HashMap<PathBuf, Burst>,
    window: Duration,
}

impl WriteCoalescer {
    /// Create a coalescer with the given window in milliseconds. Zero disables it.
    pub fn new(window_ms: u64) -> Self {
        Self {
            recent: HashMap::new(),
            window: Duration::from_millis(window_ms),
        }
    }

    /// Decide whether `raw` should be passed on now.
    ///
    /// Only `Modified` events are ever held back. The burst start is not
    /// extended by held events, so a continuous writer still produces an
    /// update per window.
    pub fn admit(&mut self, raw: &RawEvent) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let now = Instant::now();
        match raw.kind {
            RawKind::Modified => {
                let window = self.window;
                let open = self
                    .recent
                    .get(&raw.src)
                    .is_some_and(|burst| now.duration_since(burst.started) < window);
                let Some(burst) = self.recent.get_mut(&raw.src).filter(|_| open) else {
                    self.recent.insert(raw.src.clone(), Burst::open(now, false));
                    return true;
                };

                let settling = burst.created
                    && burst.trailing.is_none()
                    && now.duration_since(burst.last) < CREATION_SETTLE;
                if !settling {
                    burst.trailing = Some(raw.entry);
                }
                burst.last = now;
                false
            }
            RawKind::Created => {
                self.recent.insert(raw.src.clone(), Burst::open(now, true));
                true
            }
            // The move or delete supersedes anything held for these paths
            RawKind::Moved | RawKind::Deleted => {
                self.recent.remove(&raw.src);
                if let Some(dest) = &raw.dest {
                    self.recent.remove(dest);
                }
                true
            }
        }
    }

    /// End the burst for `path`: the writer closed the file, so everything
    /// it wrote belongs to the change already passed on.
    pub fn release(&mut self, path: &Path) {
        self.recent.remove(path);
    }

    /// Take the held modifies of every path that has been quiet for the
    /// window. Bursts with nothing owed are dropped at the same time.
    pub fn take_ready(&mut self) -> Vec<RawEvent> {
        let now = Instant::now();
        let window = self.window;
        let mut ready = Vec::new();

        self.recent.retain(|path, burst| {
            if now.duration_since(burst.last) < window {
                return true;
            }
            if let Some(entry) = burst.trailing {
                ready.push(RawEvent::modified(entry, path.clone()));
            }
            false
        });

        ready
    }

    /// Get the number of paths with an open burst.
    pub fn pending_count(&self) -> usize {
        self.recent.len()
    }
}
