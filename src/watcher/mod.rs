//! Filesystem watching with normalized events.
//!
//! Native notification facilities disagree on ordering, on whether a path
//! was a file or a directory, and on how many notifications a single change
//! produces. This module hides all of that behind one stream of
//! [`SemanticEvent`]s per watched root.
//!
//! # Architecture
//!
//! ```text
//! FileSystemWatcher (one task per root)
//!   - PathExistenceWaiter     polls while the root is missing
//!   - NativeEventSource       notify watcher + PlatformStrategy
//!         |  unbounded channel (backend thread -> task)
//!         v
//!   - EventNormalizer         DirectoryCache + PendingSignalCache
//!         |
//!         v
//!   EventSender  ->  consumer
//! ```
//!
//! Watchers share nothing; run as many as there are roots.

mod dir_cache;
mod error;
mod event;
mod fs_watcher;
mod normalizer;
mod signal_cache;
pub mod source;
mod target;
mod waiter;

pub use dir_cache::DirectoryCache;
pub use error::WatchError;
pub use event::{
    EntryKind, EventReceiver, EventSender, RawEvent, RawKind, SemanticEvent, SemanticEventKind,
    event_channel,
};
pub use fs_watcher::{FileSystemWatcher, produced_by};
pub use normalizer::EventNormalizer;
pub use signal_cache::PendingSignalCache;
pub use source::{Platform, PlatformChoice};
pub use target::{DesiredKind, DiskProbe, ExistenceProbe, TargetKind, WatchMode, WatchTarget};
pub use waiter::{DEFAULT_POLL_INTERVAL_MS, PathExistenceWaiter};
