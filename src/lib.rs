//! Watch a file or a directory tree and receive one clean event per real
//! change, across platforms whose native notifications disagree.
//!
//! Start with [`watcher::FileSystemWatcher`].

pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::Settings;
pub use watcher::{FileSystemWatcher, SemanticEvent, WatchError, WatchMode};
