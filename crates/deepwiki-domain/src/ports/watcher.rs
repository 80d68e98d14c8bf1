use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::IndexError;

/// The raw kinds of filesystem change the watcher layer coalesces. Mirrors
/// the four event kinds named in §4.9: `created`, `modified`, `deleted`,
/// `moved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// One filesystem change as reported by the platform watcher layer, already
/// expanded from any recursive directory event into individual paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileEvent {
    pub path: PathBuf,
    pub kind: RawEventKind,
}

/// A live stream of raw filesystem events.
pub type RawEventStream = BoxStream<'static, RawFileEvent>;

/// Capability interface over a platform filesystem notifier. The debounce
/// and "is this path watched" logic in §4.9 lives in `deepwiki-application`;
/// this port only has to deliver raw, already-recursively-expanded events —
/// it does not know about language extensions or exclude globs.
#[async_trait]
pub trait FileSystemWatcher: Send + Sync {
    /// Begins watching `root` recursively and returns a stream of events.
    /// The stream ends only if the underlying watcher is dropped or the
    /// platform layer fails irrecoverably.
    async fn watch(&self, root: &std::path::Path) -> Result<RawEventStream, IndexError>;
}
