//! Shared helpers for watcher integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use pathwarden::config::WatcherTuning;
use pathwarden::watcher::{
    EventReceiver, FileSystemWatcher, SemanticEvent, SemanticEventKind, WatchError, event_channel,
};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

pub const POLL_MS: u64 = 50;

pub fn tuning() -> WatcherTuning {
    WatcherTuning {
        poll_interval_ms: POLL_MS,
        stop_timeout_secs: 5,
        ..WatcherTuning::default()
    }
}

pub struct Running {
    pub rx: EventReceiver,
    pub cancel: CancellationToken,
    pub task: JoinHandle<Result<(), WatchError>>,
}

impl Running {
    /// Cancel the watcher and check it shut down cleanly.
    pub async fn stop(self) {
        self.cancel.cancel();
        let result = timeout(Duration::from_secs(10), self.task)
            .await
            .expect("watcher did not stop")
            .expect("watcher task panicked");
        assert!(result.is_ok(), "watcher failed: {result:?}");
    }
}

pub fn spawn(watcher: FileSystemWatcher) -> Running {
    let (tx, rx) = event_channel();
    let mut watcher = watcher.with_tuning(tuning());
    watcher.bind(tx);
    let cancel = watcher.cancellation_token();
    let task = tokio::spawn(watcher.run());
    Running { rx, cancel, task }
}

/// Wait for the next event, failing after `within`.
pub async fn next_event(rx: &mut EventReceiver, within: Duration) -> SemanticEvent {
    timeout(within, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Collect events until none arrives for `quiet`.
pub async fn drain_until_quiet(rx: &mut EventReceiver, quiet: Duration) -> Vec<SemanticEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = timeout(quiet, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Collect events for a fixed duration.
pub async fn collect_for(rx: &mut EventReceiver, window: Duration) -> Vec<SemanticEvent> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}

pub fn root_events(events: &[SemanticEvent]) -> Vec<SemanticEventKind> {
    events
        .iter()
        .map(SemanticEvent::kind)
        .filter(|k| {
            matches!(
                k,
                SemanticEventKind::RootAppeared | SemanticEventKind::RootDisappeared
            )
        })
        .collect()
}

pub fn created_file(path: &Path) -> SemanticEvent {
    SemanticEvent::CreatedFile {
        path: path.to_path_buf(),
    }
}

pub fn updated_file(path: &Path) -> SemanticEvent {
    SemanticEvent::UpdatedFile {
        path: path.to_path_buf(),
    }
}

pub fn deleted_file(path: &Path) -> SemanticEvent {
    SemanticEvent::DeletedFile {
        path: path.to_path_buf(),
    }
}

pub fn updated_dir(path: &Path) -> SemanticEvent {
    SemanticEvent::UpdatedDir {
        path: path.to_path_buf(),
    }
}
