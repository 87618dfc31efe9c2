//! Watch and Run commands.
//!
//! Every watcher writes into one shared channel; this module drains it to
//! stdout until Ctrl-C, then cancels all watchers and waits for them.

use std::path::PathBuf;

use anyhow::bail;
use console::style;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{Settings, WatchSettings};
use crate::watcher::{
    FileSystemWatcher, SemanticEvent, SemanticEventKind, WatchError, WatchMode, event_channel,
};

/// Run watch command - watch one path given on the command line.
pub async fn run_watch(
    path: PathBuf,
    mode: WatchMode,
    json: bool,
    config: &Settings,
) -> anyhow::Result<()> {
    let watch = WatchSettings {
        input_path: Some(path),
        mode,
    };
    run_watchers(std::slice::from_ref(&watch), json, config).await
}

/// Run run command - watch every configured entry.
pub async fn run_all(json: bool, config: &Settings) -> anyhow::Result<()> {
    if config.watches.is_empty() {
        bail!(
            "No [[watches]] entries configured. Run `pathwarden init` or use `pathwarden watch <PATH>`."
        );
    }
    run_watchers(&config.watches, json, config).await
}

async fn run_watchers(
    watches: &[WatchSettings],
    json: bool,
    config: &Settings,
) -> anyhow::Result<()> {
    let (tx, mut rx) = event_channel();
    let shutdown = CancellationToken::new();
    let mut tasks: JoinSet<(String, Result<(), WatchError>)> = JoinSet::new();

    for watch in watches {
        let mut watcher = FileSystemWatcher::from_settings(watch, &config.watcher)
            .with_cancellation(shutdown.child_token());
        watcher.bind(tx.clone());

        let label = watch
            .input_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string());
        eprintln!("Watching {label} ({:?})", watch.mode);

        tasks.spawn(async move { (label, watcher.run().await) });
    }
    // Only the watchers hold senders now, so the channel closes when all end
    drop(tx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut failed = 0usize;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => print_event(&event, json)?,
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                failed += report(joined);
            }
            _ = &mut ctrl_c => {
                eprintln!("Stopping watchers...");
                break;
            }
        }
    }

    shutdown.cancel();
    while let Some(joined) = tasks.join_next().await {
        failed += report(joined);
    }

    if failed > 0 {
        bail!("{failed} watcher(s) stopped with an error");
    }
    Ok(())
}

fn report(joined: Result<(String, Result<(), WatchError>), tokio::task::JoinError>) -> usize {
    match joined {
        Ok((_, Ok(()))) => 0,
        Ok((label, Err(e))) => {
            eprintln!("Watcher for {label} failed: {e}");
            1
        }
        Err(e) => {
            eprintln!("Watcher task aborted: {e}");
            1
        }
    }
}

fn print_event(event: &SemanticEvent, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", format_event(event));
    }
    Ok(())
}

/// Human-readable line: time, colored kind, path(s).
fn format_event(event: &SemanticEvent) -> String {
    use SemanticEventKind::*;

    let time = chrono::Local::now().format("%H:%M:%S%.3f");
    let kind = event.kind();
    let padded = format!("{kind:?}");
    let padded = format!("{padded:<15}");
    let label = match kind {
        CreatedFile | CreatedDir => style(padded).green(),
        UpdatedFile | UpdatedDir => style(padded).yellow(),
        MovedFile | MovedDir => style(padded).blue(),
        DeletedFile | DeletedDir => style(padded).red(),
        RootAppeared | RootDisappeared => style(padded).cyan().bold(),
    };

    match event {
        SemanticEvent::MovedFile { from, to } | SemanticEvent::MovedDir { from, to } => {
            format!("{time} {label} {} -> {}", from.display(), to.display())
        }
        _ => format!("{time} {label} {}", event.path().display()),
    }
}
