//! Compact timestamped logging with per-target levels.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"      # quiet by default
//!
//! [logging.modules]
//! pathwarden = "debug"  # everything in this crate
//! ```
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=debug pathwarden watch ./inbox
//! RUST_LOG=pathwarden::watcher::normalizer=trace pathwarden run
//! ```
//!
//! Log lines carry a bracketed component tag (`[watcher]`, `[normalizer]`,
//! `[source]`, ...) written by [`log_event!`](crate::log_event) and
//! [`debug_event!`](crate::debug_event).

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build the filter directive string for a logging config.
pub fn filter_directives(config: &LoggingConfig) -> String {
    // Sorted so the directive is stable across runs
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    modules
        .into_iter()
        .fold(config.default.clone(), |mut acc, (module, level)| {
            acc.push_str(&format!(",{module}={level}"));
            acc
        })
}

/// Initialize logging with configuration.
///
/// Only the first call takes effect. Output goes to stderr so that event
/// output on stdout stays machine-readable.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize logging with `LoggingConfig::default()` (warnings and errors).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Log an event with a component tag.
///
/// # Examples
/// ```ignore
/// log_event!("watcher", "root appeared", "{}", path.display());
/// log_event!("watcher", "stopped");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("normalizer", "dropped zombie create", "{}", path.display());
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
