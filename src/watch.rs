//! Source tree watcher.
//!
//! Events are batched for a short quiet period, then every touched path is
//! handed to [`Orchestrator::apply_change`]. A path that no longer exists
//! removes its output.

use anyhow::{Context, Result};
use h5_compiler_native::log;
use h5_compiler_native::orchestrator::{is_ignored, Orchestrator};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

const DEBOUNCE_MS: u64 = 150;

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn collect(pending: &mut BTreeSet<PathBuf>, event: Event) {
    if !is_relevant(&event) {
        return;
    }
    pending.extend(event.paths.into_iter().filter(|path| !is_ignored(path)));
}

pub fn watch(orchestrator: &mut Orchestrator) -> Result<()> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to create file watcher")?;
    let source_dir = orchestrator.config().source_dir();
    watcher
        .watch(&source_dir, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", source_dir.display()))?;
    log!("watch"; "watching {}", source_dir.display());

    let mut pending = BTreeSet::new();
    loop {
        let received = if pending.is_empty() {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            rx.recv_timeout(Duration::from_millis(DEBOUNCE_MS))
        };
        match received {
            Ok(Ok(event)) => collect(&mut pending, event),
            Ok(Err(e)) => log!("error"; "watch: {e}"),
            Err(RecvTimeoutError::Timeout) => {
                for path in std::mem::take(&mut pending) {
                    if let Err(err) = orchestrator.apply_change(&path) {
                        log!("error"; "{}: [{}] {}", path.display(), err.code(), err);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
