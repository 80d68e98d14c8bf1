//! §4.9 Watcher: coalesces a burst of file-system events into at most one
//! incremental index run. Holds the debounce timer and the "is this path
//! watched" predicate; the platform-specific event source lives behind the
//! `FileSystemWatcher` port in `deepwiki-infrastructure`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deepwiki_domain::error::IndexError;
use deepwiki_domain::ports::{FileSystemWatcher, RawFileEvent};
use deepwiki_domain::value_objects::{IndexerConfig, Language, WatcherConfig};
use futures::StreamExt;
use glob::Pattern;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::indexer::Indexer;

/// A path is watched iff its extension is recognized by the closed
/// `Language` set and it does not match any configured exclude glob.
fn is_watched(path: &Path, exclude: &[Pattern], repo_root: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if Language::from_extension(ext).is_none() {
        return false;
    }
    let rel = path.strip_prefix(repo_root).unwrap_or(path).to_string_lossy().replace('\\', "/");
    !exclude.iter().any(|p| p.matches(&rel))
}

/// Runs after each debounced incremental index, given the set of paths that
/// triggered the run (relative to the repository root). Used by callers to
/// wire in out-of-scope post-indexing work (e.g. wiki regeneration).
pub type PostIndexHook = dyn Fn(&HashSet<PathBuf>) + Send + Sync;

/// Debounces raw filesystem events from a `FileSystemWatcher` and drives
/// `Indexer::index(full_rebuild=false)` at most once per quiet period.
/// Events arriving while a run is in flight accumulate in the buffer and are
/// folded into the next run — the shared `Mutex` around the buffer and
/// in-flight flag make buffer mutation and timer restart atomic.
pub struct WatcherOrchestrator {
    repo_root: PathBuf,
    indexer: Arc<Indexer>,
    watcher: Arc<dyn FileSystemWatcher>,
    config: WatcherConfig,
    exclude: Vec<Pattern>,
    buffer: Mutex<HashSet<PathBuf>>,
    running: Mutex<bool>,
}

impl WatcherOrchestrator {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        indexer: Arc<Indexer>,
        watcher: Arc<dyn FileSystemWatcher>,
        watcher_config: WatcherConfig,
        indexer_config: &IndexerConfig,
    ) -> Result<Self, IndexError> {
        let exclude = indexer_config
            .exclude
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| IndexError::Status(format!("invalid glob pattern {p:?}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WatcherOrchestrator {
            repo_root: repo_root.into(),
            indexer,
            watcher,
            config: watcher_config,
            exclude,
            buffer: Mutex::new(HashSet::new()),
            running: Mutex::new(false),
        })
    }

    /// Begins watching the repository root and runs until the event stream
    /// ends (the underlying watcher is dropped or fails irrecoverably).
    /// `post_index` is invoked, if given, after each debounced index run
    /// completes, with the snapshot of paths that triggered it.
    pub async fn run(&self, post_index: Option<&PostIndexHook>) -> Result<(), IndexError> {
        let mut events = self.watcher.watch(&self.repo_root).await?;
        let debounce = Duration::from_secs(self.config.debounce_seconds.max(1));

        loop {
            let first = match events.next().await {
                Some(event) => event,
                None => {
                    info!("watcher event stream ended");
                    return Ok(());
                }
            };
            self.record(first).await;

            // Keep restarting the timer as long as events keep arriving
            // within the debounce window, so a burst coalesces into one run.
            loop {
                match tokio::time::timeout(debounce, events.next()).await {
                    Ok(Some(event)) => self.record(event).await,
                    Ok(None) => {
                        self.flush(post_index).await;
                        info!("watcher event stream ended");
                        return Ok(());
                    }
                    Err(_) => break,
                }
            }

            self.flush(post_index).await;
        }
    }

    async fn record(&self, event: RawFileEvent) {
        if !is_watched(&event.path, &self.exclude, &self.repo_root) {
            return;
        }
        self.buffer.lock().await.insert(event.path);
    }

    async fn flush(&self, post_index: Option<&PostIndexHook>) {
        let changed = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        {
            let mut running = self.running.lock().await;
            if *running {
                // An index run is already in flight; put the events back so
                // the next flush after the current run picks them up.
                self.buffer.lock().await.extend(changed);
                return;
            }
            *running = true;
        }

        info!(changed = changed.len(), "debounce window elapsed, running incremental index");
        let result = self.indexer.index(false, None).await;
        *self.running.lock().await = false;

        match result {
            Ok(status) => {
                info!(total_chunks = status.total_chunks, "watcher-triggered index run complete");
                if let Some(hook) = post_index {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(&changed)));
                    if result.is_err() {
                        warn!("watcher post-index hook panicked, continuing");
                    }
                }
            }
            Err(e) => warn!(error = %e, "watcher-triggered index run failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_watched_rejects_unknown_extensions() {
        let exclude = vec![Pattern::new("**/node_modules/**").unwrap()];
        let root = Path::new("/repo");
        assert!(!is_watched(Path::new("/repo/a.bin"), &exclude, root));
        assert!(is_watched(Path::new("/repo/a.py"), &exclude, root));
    }

    #[test]
    fn is_watched_rejects_excluded_paths() {
        let exclude = vec![Pattern::new("**/node_modules/**").unwrap()];
        let root = Path::new("/repo");
        assert!(!is_watched(Path::new("/repo/node_modules/a.py"), &exclude, root));
    }
}
