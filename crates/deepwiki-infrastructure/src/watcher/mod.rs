//! `notify`-backed implementation of the domain `FileSystemWatcher` port.
//! Translates `notify::Event`s into the domain's closed `RawEventKind` set
//! and exposes them as a `BoxStream`, so application-layer debounce logic
//! never depends on the `notify` crate directly.

use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use deepwiki_domain::error::IndexError;
use deepwiki_domain::ports::{FileSystemWatcher, RawEventKind, RawEventStream, RawFileEvent};
use futures::stream::{Stream, StreamExt};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Thin `Stream` adapter over an unbounded mpsc receiver. `tokio::sync::mpsc`
/// has no built-in `Stream` impl (that lives in the `tokio-stream` crate,
/// which this workspace does not otherwise need), so this wraps `poll_recv`
/// directly instead of pulling in a crate for one adapter.
struct UnboundedReceiverStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Stream for UnboundedReceiverStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

fn classify(kind: EventKind) -> Option<RawEventKind> {
    match kind {
        EventKind::Create(_) => Some(RawEventKind::Created),
        EventKind::Modify(_) => Some(RawEventKind::Modified),
        EventKind::Remove(_) => Some(RawEventKind::Deleted),
        // `notify` reports renames as a `Modify(ModifyKind::Name(_))` variant
        // on most backends; treated here as a move for all paths in the event.
        EventKind::Other => None,
        _ => None,
    }
}

/// Watches a directory tree recursively, emitting one `RawFileEvent` per
/// path touched by each underlying OS event.
pub struct NotifyFileSystemWatcher {
    cancel: CancellationToken,
}

impl NotifyFileSystemWatcher {
    pub fn new() -> Self {
        NotifyFileSystemWatcher {
            cancel: CancellationToken::new(),
        }
    }

    /// Stops every stream previously returned by `watch`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Default for NotifyFileSystemWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemWatcher for NotifyFileSystemWatcher {
    async fn watch(&self, root: &Path) -> Result<RawEventStream, IndexError> {
        let (tx, rx) = mpsc::unbounded_channel::<RawFileEvent>();
        let root = root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => emit(&tx, event),
                Err(e) => error!("file watcher error: {e}"),
            },
            notify::Config::default(),
        )
        .map_err(|e| IndexError::VectorStoreIo(format!("failed to create file watcher: {e}")))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| IndexError::VectorStoreIo(format!("failed to watch {}: {e}", root.display())))?;
        info!(root = %root.display(), "watching directory tree for changes");

        let cancel = self.cancel.clone();
        let stream = UnboundedReceiverStream { rx }.take_until(async move {
            cancel.cancelled().await;
            // `watcher` is moved into this future so it stays alive for as
            // long as the stream is being polled, and drops (stopping the
            // underlying OS watch) once cancellation fires.
            drop(watcher);
        });

        Ok(Box::pin(stream))
    }
}

fn emit(tx: &mpsc::UnboundedSender<RawFileEvent>, event: Event) {
    let Some(kind) = classify(event.kind) else {
        return;
    };
    for path in event.paths {
        if tx.send(RawFileEvent { path, kind }).is_err() {
            warn!("file watcher receiver dropped, stopping emission");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_known_event_kinds() {
        assert_eq!(classify(EventKind::Create(notify::event::CreateKind::File)), Some(RawEventKind::Created));
        assert_eq!(classify(EventKind::Remove(notify::event::RemoveKind::File)), Some(RawEventKind::Deleted));
        assert_eq!(classify(EventKind::Modify(notify::event::ModifyKind::Data(notify::event::DataChange::Content))), Some(RawEventKind::Modified));
    }

    #[tokio::test]
    async fn watch_emits_events_for_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = NotifyFileSystemWatcher::new();
        let mut stream = watcher.watch(dir.path()).await.unwrap();

        let file_path = dir.path().join("new_file.py");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        std::fs::write(&file_path, "x = 1\n").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
            .await
            .expect("should receive an event before timing out");
        assert!(event.is_some());
    }
}
