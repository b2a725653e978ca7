//! Development file watcher
//!
//! Watches the routes, components and public roots. Every burst of changes
//! rebuilds the route table once, re-syncs the watched roots and, in dev,
//! fires the reload callback.

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use strata_router::Dispatcher;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::runtime::RuntimeContext;

/// Running watcher task; dropping it stops the task too
#[derive(Debug)]
pub struct WatchHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stops watching and waits for the task to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts watching `roots` and rebuilding `dispatcher` on change
///
/// Roots that do not exist yet are picked up after the next rebuild.
/// Fails when called outside a Tokio runtime.
pub fn spawn_watcher(
    dispatcher: Arc<Dispatcher>,
    roots: Vec<PathBuf>,
    runtime: RuntimeContext,
) -> Result<WatchHandle> {
    let handle = tokio::runtime::Handle::try_current().context("No Tokio runtime for the file watcher")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // Receiver gone means the task ended
        let _ = tx.send(res);
    })
    .context("Failed to create file watcher")?;

    let mut watched = HashSet::new();
    sync_watches(&mut watcher, &roots, &mut watched);

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let task = handle.spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };

                    let mut changed = Vec::new();
                    collect_changes(event, &mut changed);
                    while let Ok(event) = rx.try_recv() {
                        collect_changes(event, &mut changed);
                    }

                    if changed.is_empty() {
                        continue;
                    }

                    let rebuild = dispatcher.clone();
                    match tokio::task::spawn_blocking(move || rebuild.rebuild()).await {
                        Ok(routes) => debug!(routes, "route table rebuilt"),
                        Err(e) => warn!(error = %e, "route rebuild failed"),
                    }

                    sync_watches(&mut watcher, &roots, &mut watched);

                    if runtime.is_dev() {
                        changed.sort();
                        changed.dedup();
                        info!(paths = ?changed, "files changed");

                        if let Some(on_reload) = &runtime.on_reload {
                            on_reload();
                        }
                    }
                }
            }
        }

        debug!("file watcher stopped");
    });

    Ok(WatchHandle {
        stop: Some(stop_tx),
        task,
    })
}

/// Create, content/name modification and removal count; metadata and access do not
pub fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

fn collect_changes(res: notify::Result<Event>, into: &mut Vec<PathBuf>) {
    match res {
        Ok(event) if is_relevant(&event.kind) => into.extend(event.paths),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "watch error"),
    }
}

/// Watches roots that appeared and forgets roots that vanished
fn sync_watches(watcher: &mut RecommendedWatcher, roots: &[PathBuf], watched: &mut HashSet<PathBuf>) {
    for root in roots {
        let exists = root.is_dir();

        if exists && !watched.contains(root) {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!(path = %root.display(), "watching");
                    watched.insert(root.clone());
                }
                Err(e) => warn!(path = %root.display(), error = %e, "failed to watch"),
            }
        } else if !exists && watched.remove(root) {
            // The OS usually dropped the watch already
            let _ = watcher.unwatch(root);
            debug!(path = %root.display(), "watched root removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RenameMode};

    #[test]
    fn test_relevant_event_kinds() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
        assert!(is_relevant(&EventKind::Remove(notify::event::RemoveKind::Folder)));

        assert!(!is_relevant(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn test_collect_skips_irrelevant() {
        let mut changed = Vec::new();
        collect_changes(
            Ok(Event::new(EventKind::Access(AccessKind::Any)).add_path("a".into())),
            &mut changed,
        );
        collect_changes(
            Ok(Event::new(EventKind::Create(CreateKind::Folder)).add_path("b".into())),
            &mut changed,
        );

        assert_eq!(changed, vec![PathBuf::from("b")]);
    }
}
