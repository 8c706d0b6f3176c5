//! Directory watcher keeping a [`DoableCache`] in sync with the disk
//!
//! The notify backend runs its own thread and forwards raw events into a
//! tokio channel. A single task drains that channel and reloads the cache on
//! write events:
//!
//! ```text
//! Idle --(write event)--> Reloading --(reload done)--> Idle
//! ```
//!
//! Only directories present when the watcher starts are watched; a
//! subdirectory created later is not picked up until restart.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::cache::{DoableCache, ReloadTrigger};
use crate::error::WatchError;

/// Where the watch loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Waiting for notifications
    Idle,
    /// Reloading the cache after a write event
    Reloading,
    /// The loop has exited
    Stopped,
}

impl WatcherState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WatcherState::Idle,
            1 => WatcherState::Reloading,
            _ => WatcherState::Stopped,
        }
    }
}

type NotifyRx = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Builder for the background watch task
pub struct DirectoryWatcher {
    cache: Arc<DoableCache>,
}

impl DirectoryWatcher {
    /// Watch the sync root of `cache`'s store
    pub fn new(cache: Arc<DoableCache>) -> Self {
        Self { cache }
    }

    /// Bootstrap the sync directories, warm the cache and spawn the watch loop
    ///
    /// Must be called from within a tokio runtime. Any error here means the
    /// cache cannot be kept fresh and should abort startup.
    pub async fn start(self) -> Result<WatcherHandle, WatchError> {
        let store = Arc::clone(self.cache.store());
        store.ensure_layout()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the loop already exited
            let _ = tx.send(res);
        })?;
        let watched = watch_tree(&mut watcher, store.root())?;
        info!(root = %store.root().display(), dirs = watched, "watching sync directories");

        let cache = Arc::clone(&self.cache);
        let report = tokio::task::spawn_blocking(move || cache.reload(ReloadTrigger::Startup)).await?;
        if !report.is_ok() {
            warn!(?report, "startup load incomplete, missing collections load on first request");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(AtomicU8::new(WatcherState::Idle as u8));
        let task = tokio::spawn(run(
            self.cache,
            watcher,
            rx,
            shutdown_rx,
            Arc::clone(&state),
        ));

        info!("directory watcher started");
        Ok(WatcherHandle {
            shutdown: shutdown_tx,
            task,
            state,
        })
    }
}

/// Handle on a running watch loop
///
/// Dropping the handle also stops the loop.
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), WatchError>>,
    state: Arc<AtomicU8>,
}

impl WatcherHandle {
    /// Current loop state
    pub fn state(&self) -> WatcherState {
        WatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Signal the loop to exit and wait for it
    pub async fn stop(self) -> Result<(), WatchError> {
        let _ = self.shutdown.send(true);
        self.task.await?
    }

    /// Wait for the loop to exit on its own
    ///
    /// Only returns when the notification channel dies or the task fails.
    pub async fn finished(&mut self) -> Result<(), WatchError> {
        (&mut self.task).await?
    }
}

/// Register a non-recursive watch on `root` and every directory below it
fn watch_tree(watcher: &mut RecommendedWatcher, root: &Path) -> Result<usize, WatchError> {
    let mut watched = 0;
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            watcher.watch(entry.path(), RecursiveMode::NonRecursive)?;
            debug!(dir = %entry.path().display(), "watch registered");
            watched += 1;
        }
    }
    Ok(watched)
}

/// Content changes only; create, rename and remove do not trigger a reload
fn is_write_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

/// Log one notification and report whether it asks for a reload
fn inspect(received: notify::Result<Event>) -> bool {
    match received {
        Ok(event) if is_write_event(&event) => {
            info!(paths = ?event.paths, "change detected, will rescan files");
            true
        }
        Ok(event) => {
            debug!(kind = ?event.kind, paths = ?event.paths, "ignoring event");
            false
        }
        Err(e) => {
            error!(error = %e, "file notification error");
            false
        }
    }
}

async fn run(
    cache: Arc<DoableCache>,
    // Owned here so the OS watches live exactly as long as the loop
    _watcher: RecommendedWatcher,
    mut events: NotifyRx,
    mut shutdown: watch::Receiver<bool>,
    state: Arc<AtomicU8>,
) -> Result<(), WatchError> {
    let result = loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("directory watcher stopping");
                    break Ok(());
                }
            }
            received = events.recv() => {
                let Some(received) = received else {
                    error!("file notification channel closed");
                    break Err(WatchError::ChannelClosed);
                };

                // Coalesce a burst of events into one reload
                let mut reload = inspect(received);
                while let Ok(queued) = events.try_recv() {
                    reload |= inspect(queued);
                }
                if !reload {
                    continue;
                }

                state.store(WatcherState::Reloading as u8, Ordering::Release);
                let cache = Arc::clone(&cache);
                let reloaded =
                    tokio::task::spawn_blocking(move || cache.reload(ReloadTrigger::FileChange)).await;
                state.store(WatcherState::Idle as u8, Ordering::Release);

                if let Err(e) = reloaded {
                    error!(error = %e, "cache reload task failed");
                }
            }
        }
    };

    state.store(WatcherState::Stopped as u8, Ordering::Release);
    result
}
