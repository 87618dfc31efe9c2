//! The watcher state machine.
//!
//! ```text
//!            root exists               root gone
//! UNWATCHED ------------> WATCHING ----------------> UNWATCHED ...
//!   (poll)     appeared    (native)   disappeared
//! ```
//!
//! There is no terminal state; [`FileSystemWatcher::run`] only returns when
//! cancelled, when the consumer drops its receiver, or when the native source
//! cannot be started.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::WatchError;
use super::event::{EventSender, SemanticEvent, SemanticEventKind};
use super::normalizer::EventNormalizer;
use super::source::{NativeEventSource, SourceSignal};
use super::target::WatchMode;
use super::waiter::PathExistenceWaiter;
use crate::config::{WatchSettings, WatcherTuning};

/// Why a watch session ended.
enum SessionEnd {
    Cancelled,
    RootLost,
    /// Native backend went away while the root is still there.
    SourceClosed,
    Failed(WatchError),
}

/// Watches one file or one directory tree and delivers [`SemanticEvent`]s.
///
/// # Example
///
/// ```no_run
/// use pathwarden::watcher::{FileSystemWatcher, event_channel};
///
/// # async fn demo() -> Result<(), pathwarden::watcher::WatchError> {
/// let (tx, mut rx) = event_channel();
/// let mut watcher = FileSystemWatcher::dir("/srv/inbox");
/// watcher.bind(tx);
///
/// let cancel = watcher.cancellation_token();
/// let task = tokio::spawn(watcher.run());
///
/// while let Some(event) = rx.recv().await {
///     println!("{event}");
/// }
/// cancel.cancel();
/// # let _ = task.await;
/// # Ok(())
/// # }
/// ```
pub struct FileSystemWatcher {
    input_path: Option<PathBuf>,
    mode: WatchMode,
    tuning: WatcherTuning,
    output: Option<EventSender>,
    cancel: CancellationToken,
}

impl FileSystemWatcher {
    pub fn new(input_path: Option<PathBuf>, mode: WatchMode) -> Self {
        Self {
            input_path,
            mode,
            tuning: WatcherTuning::default(),
            output: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Watch a single file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), WatchMode::File)
    }

    /// Watch a directory tree.
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), WatchMode::Dir)
    }

    /// Build from a `[[watches]]` entry.
    pub fn from_settings(watch: &WatchSettings, tuning: &WatcherTuning) -> Self {
        Self::new(watch.input_path.clone(), watch.mode).with_tuning(tuning.clone())
    }

    pub fn with_tuning(mut self, tuning: WatcherTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Use an externally owned token, e.g. a child of a process-wide shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach the delivery channel. Without one, events are discarded.
    pub fn bind(&mut self, output: EventSender) {
        self.output = Some(output);
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    pub fn tuning(&self) -> &WatcherTuning {
        &self.tuning
    }

    /// Event kinds this configuration can emit.
    pub fn produces_events(&self) -> BTreeSet<SemanticEventKind> {
        produced_by(self.mode)
    }

    /// Run until cancelled.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InitFailed`] / [`WatchError::PathWatchFailed`] if the
    ///   native source cannot be started on an existing root
    /// - [`WatchError::ChannelClosed`] if the bound receiver was dropped
    /// - [`WatchError::ConfigError`] if the input path cannot be made absolute
    pub async fn run(self) -> Result<(), WatchError> {
        let waiter = PathExistenceWaiter::new(self.tuning.poll_interval());

        let Some(root) = self.resolve_root()? else {
            tracing::warn!("[watcher] no input path configured, idling until cancelled");
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = waiter.wait_for_target(None, self.mode.desired_kind()) => {}
            }
            return Ok(());
        };

        let desired = self.mode.desired_kind();
        let platform = self.tuning.platform.resolve();
        let mut normalizer = EventNormalizer::new(root.clone(), self.mode);
        let mut announce = true;

        crate::log_event!(
            "watcher",
            "started",
            "{} ({:?}, {platform:?})",
            root.display(),
            self.mode
        );

        loop {
            // UNWATCHED
            let target = tokio::select! {
                _ = self.cancel.cancelled() => break,
                target = waiter.wait_for_target(Some(&root), desired) => target,
            };

            normalizer.reset();
            let mut source = match NativeEventSource::start(
                &root,
                self.mode,
                platform,
                self.tuning.coalesce_window_ms,
            ) {
                Ok(source) => source,
                Err(e) if waiter.check(&root, desired).is_none() => {
                    crate::debug_event!("watcher", "root vanished during attach", "{e}");
                    continue;
                }
                Err(e) => {
                    tracing::error!("[watcher] cannot watch {}: {e}", root.display());
                    return Err(e);
                }
            };

            // WATCHING
            if announce {
                crate::log_event!(
                    "watcher",
                    "root appeared",
                    "{} ({:?})",
                    target.path.display(),
                    target.kind
                );
                if let Err(e) = self.emit(normalizer.root_appeared()) {
                    source.stop(self.tuning.stop_timeout()).await;
                    return Err(e);
                }
            }

            let end = self.watch(&mut source, &mut normalizer, &waiter).await;
            source.stop(self.tuning.stop_timeout()).await;
            normalizer.discard();

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::RootLost => {
                    crate::log_event!("watcher", "root disappeared", "{}", root.display());
                    announce = true;
                }
                SessionEnd::SourceClosed => {
                    tracing::warn!("[watcher] native source closed, reattaching");
                    // Reattach silently if the consumer never heard of a loss
                    match self.check_root(&mut normalizer, &waiter) {
                        None => announce = false,
                        Some(SessionEnd::Failed(e)) => return Err(e),
                        Some(_) => announce = true,
                    }
                }
                SessionEnd::Failed(e) => return Err(e),
            }
        }

        crate::log_event!("watcher", "stopped", "{}", root.display());
        Ok(())
    }

    async fn watch(
        &self,
        source: &mut NativeEventSource,
        normalizer: &mut EventNormalizer,
        waiter: &PathExistenceWaiter,
    ) -> SessionEnd {
        let mut ticker = tokio::time::interval(self.tuning.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,

                signal = source.recv() => match signal {
                    Some(SourceSignal::Events(batch)) => {
                        if let Some(end) = self.check_root(normalizer, waiter) {
                            return end;
                        }
                        for raw in batch {
                            if let Err(e) = self.deliver(normalizer.process(raw)) {
                                return SessionEnd::Failed(e);
                            }
                        }
                        if normalizer.root_lost() {
                            return SessionEnd::RootLost;
                        }
                    }
                    Some(SourceSignal::Rescan) => {
                        tracing::warn!("[watcher] native source overflowed, rescanning");
                        normalizer.rescan();
                    }
                    Some(SourceSignal::Error(e)) => {
                        tracing::warn!("[watcher] native source error: {e}");
                    }
                    None => return SessionEnd::SourceClosed,
                },

                _ = ticker.tick() => {
                    for raw in source.flush() {
                        if let Err(e) = self.deliver(normalizer.process(raw)) {
                            return SessionEnd::Failed(e);
                        }
                    }
                    if let Some(end) = self.check_root(normalizer, waiter) {
                        return end;
                    }
                }
            }
        }
    }

    /// Report the loss of the root if it is gone (or no longer the right kind).
    fn check_root(
        &self,
        normalizer: &mut EventNormalizer,
        waiter: &PathExistenceWaiter,
    ) -> Option<SessionEnd> {
        if waiter
            .check(normalizer.root(), self.mode.desired_kind())
            .is_some()
        {
            return None;
        }

        match normalizer.root_disappeared().map(|event| self.emit(event)) {
            Some(Err(e)) => Some(SessionEnd::Failed(e)),
            _ => Some(SessionEnd::RootLost),
        }
    }

    fn deliver(&self, events: Vec<SemanticEvent>) -> Result<(), WatchError> {
        events.into_iter().try_for_each(|event| self.emit(event))
    }

    fn emit(&self, event: SemanticEvent) -> Result<(), WatchError> {
        let Some(output) = &self.output else {
            crate::debug_event!("watcher", "unbound, dropped", "{event}");
            return Ok(());
        };

        crate::debug_event!("watcher", "emit", "{event}");
        output.send(event).map_err(|_| WatchError::ChannelClosed)
    }

    fn resolve_root(&self) -> Result<Option<PathBuf>, WatchError> {
        let Some(path) = self
            .input_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
        else {
            return Ok(None);
        };

        std::path::absolute(path)
            .map(Some)
            .map_err(|e| WatchError::ConfigError {
                reason: format!("cannot resolve {}: {e}", path.display()),
            })
    }
}

impl std::fmt::Debug for FileSystemWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemWatcher")
            .field("input_path", &self.input_path)
            .field("mode", &self.mode)
            .field("bound", &self.output.is_some())
            .finish()
    }
}

/// Event kinds a watcher in `mode` can emit.
pub fn produced_by(mode: WatchMode) -> BTreeSet<SemanticEventKind> {
    use SemanticEventKind::*;

    match mode {
        WatchMode::File => BTreeSet::from([CreatedFile, UpdatedFile, DeletedFile]),
        WatchMode::Dir => BTreeSet::from([
            CreatedFile,
            UpdatedFile,
            MovedFile,
            DeletedFile,
            CreatedDir,
            UpdatedDir,
            MovedDir,
            DeletedDir,
            RootAppeared,
            RootDisappeared,
        ]),
    }
}
