//! Error types for the watcher system.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
///
/// Only conditions that end a watcher instance are represented here. Per-event
/// anomalies (stale modifies, duplicate deletes, kind mismatches) are absorbed by
/// the normalizer and never surface as errors.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Failed to load config: {reason}")]
    ConfigError { reason: String },

    #[error("Output channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_maps_to_init_failed() {
        let err: WatchError = notify::Error::generic("inotify limit reached").into();
        assert!(matches!(err, WatchError::InitFailed { .. }));
        assert!(err.to_string().contains("inotify limit reached"));
    }

    #[test]
    fn test_path_watch_failed_display() {
        let err = WatchError::PathWatchFailed {
            path: PathBuf::from("/tmp/gone"),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot watch path /tmp/gone: No such file or directory"
        );
    }
}
