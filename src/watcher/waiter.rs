//! Cold-start polling for the watched root.
//!
//! Native watches cannot be placed on a path that does not exist yet, so until
//! the root shows up (and again after it goes away) the watcher polls.

use std::path::Path;
use std::time::Duration;

use super::target::{DesiredKind, DiskProbe, ExistenceProbe, WatchTarget};

/// Default poll interval, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Polls until a path exists as the wanted kind.
///
/// Holds no state between calls, so it can be awaited again every time a
/// watcher falls back to waiting.
pub struct PathExistenceWaiter {
    interval: Duration,
    probe: Box<dyn ExistenceProbe>,
}

impl PathExistenceWaiter {
    pub fn new(interval: Duration) -> Self {
        Self::with_probe(interval, DiskProbe)
    }

    pub fn with_probe(interval: Duration, probe: impl ExistenceProbe + 'static) -> Self {
        Self {
            interval,
            probe: Box::new(probe),
        }
    }

    /// Resolve `path` right now, without waiting.
    pub fn check(&self, path: &Path, desired: DesiredKind) -> Option<WatchTarget> {
        self.probe
            .probe(path)
            .filter(|kind| desired.accepts(*kind))
            .map(|kind| WatchTarget::present(path, kind))
    }

    /// Suspend until an entry of the desired kind exists at `path`.
    ///
    /// The first check happens immediately. With no path (or an empty one)
    /// this never returns; it only wakes once per interval so the task stays
    /// cancellable.
    pub async fn wait_for_target(&self, path: Option<&Path>, desired: DesiredKind) -> WatchTarget {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            crate::debug_event!("waiter", "no input path, idling");
            loop {
                tokio::time::sleep(self.interval).await;
            }
        };

        let mut announced = false;
        loop {
            if let Some(target) = self.check(path, desired) {
                if announced {
                    crate::debug_event!("waiter", "ready", "{} ({:?})", path.display(), target.kind);
                }
                return target;
            }

            if !announced {
                crate::debug_event!("waiter", "waiting", "{} ({desired:?})", path.display());
                announced = true;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for PathExistenceWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathExistenceWaiter")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::EntryKind;
    use crate::watcher::target::TargetKind;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_cold_start_returns_without_sleeping() {
        let temp_dir = TempDir::new().unwrap();
        // An hour-long interval would hang the test if the first check slept
        let waiter = PathExistenceWaiter::new(Duration::from_secs(3600));

        let target = timeout(
            Duration::from_secs(1),
            waiter.wait_for_target(Some(temp_dir.path()), DesiredKind::Directory),
        )
        .await
        .expect("existing target must resolve immediately");

        assert!(target.exists);
        assert_eq!(target.kind, TargetKind::Directory);
        assert_eq!(target.path, temp_dir.path());
    }

    #[tokio::test]
    async fn test_waits_until_created() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("later.txt");
        let waiter = PathExistenceWaiter::new(Duration::from_millis(20));

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            fs::write(writer_path, b"x").unwrap();
        });

        let target = timeout(
            Duration::from_secs(5),
            waiter.wait_for_target(Some(&path), DesiredKind::File),
        )
        .await
        .unwrap();
        assert_eq!(target.kind, TargetKind::File);
    }

    #[tokio::test]
    async fn test_wrong_kind_keeps_waiting() {
        let temp_dir = TempDir::new().unwrap();
        let waiter = PathExistenceWaiter::new(Duration::from_millis(10));

        let result = timeout(
            Duration::from_millis(100),
            waiter.wait_for_target(Some(temp_dir.path()), DesiredKind::File),
        )
        .await;
        assert!(result.is_err());

        // Any kind accepts the directory
        let target = waiter
            .wait_for_target(Some(temp_dir.path()), DesiredKind::Any)
            .await;
        assert_eq!(target.kind, TargetKind::Directory);
    }

    #[tokio::test]
    async fn test_missing_path_never_resolves() {
        let waiter = PathExistenceWaiter::new(Duration::from_millis(10));

        let unset = timeout(
            Duration::from_millis(50),
            waiter.wait_for_target(None, DesiredKind::Any),
        )
        .await;
        assert!(unset.is_err());

        let empty = timeout(
            Duration::from_millis(50),
            waiter.wait_for_target(Some(Path::new("")), DesiredKind::Any),
        )
        .await;
        assert!(empty.is_err());
    }

    #[test]
    fn test_check_uses_probe() {
        struct AlwaysFile;
        impl ExistenceProbe for AlwaysFile {
            fn probe(&self, _: &Path) -> Option<EntryKind> {
                Some(EntryKind::File)
            }
        }

        let waiter = PathExistenceWaiter::with_probe(Duration::from_millis(10), AlwaysFile);
        assert!(waiter.check(Path::new("/anything"), DesiredKind::File).is_some());
        assert!(waiter
            .check(Path::new("/anything"), DesiredKind::Directory)
            .is_none());
    }
}
