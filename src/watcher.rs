//! Watch-folder event loop.
//!
//! Subscribes to filesystem notifications on the watch directory, filters
//! for content-relevant events, claims each path in the in-flight set, and
//! spawns one task per eligible file. Notification errors are logged and
//! never terminate the loop; only failing to attach the watcher is fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{EventKind, MetadataKind, ModifyKind};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::inflight::InFlightSet;
use crate::pipeline::Pipeline;

/// Watch `watch_dir` forever, dispatching eligible files into `pipeline`.
pub async fn run(watch_dir: &Path, pipeline: Arc<Pipeline>) -> Result<(), PipelineError> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    // The callback runs on the notify thread; shipping the raw result over
    // the channel keeps that thread free.
    let mut watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            let _ = tx.send(res);
        })?;
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let in_flight = InFlightSet::new();
    tracing::info!("[Watcher] Watching {}", watch_dir.display());

    while let Some(result) = rx.recv().await {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[Watcher] Notification error: {}", e);
                continue;
            }
        };

        if !is_content_event(&event.kind) {
            continue;
        }

        for path in event.paths {
            dispatch(path, &in_flight, &pipeline);
        }
    }

    // Channel closed: the watcher was dropped, nothing left to do.
    Ok(())
}

/// Claim the path and spawn its processing task, or drop the event if a
/// task already owns the path.
fn dispatch(path: PathBuf, in_flight: &InFlightSet, pipeline: &Arc<Pipeline>) {
    let Some(guard) = in_flight.claim(&path) else {
        return;
    };

    let pipeline = Arc::clone(pipeline);
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = pipeline.process(&path).await {
            tracing::warn!("[Pipeline] {}: {}", path.display(), e);
        }
    });
}

/// Whether an event kind can change a file's content or readiness.
///
/// Renames and permission changes count: some scanners write to a temp
/// name and rename into place, others finalize a file by flipping its
/// mode. Removals and reads do not.
fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))
    )
}
