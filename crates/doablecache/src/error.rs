//! Error types for the directory watcher

/// Errors that stop the directory watcher
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The sync directories could not be created
    #[error("cannot prepare sync directories: {0}")]
    Layout(#[from] doablestore::Error),

    /// The OS notification backend refused a watcher or a watch
    #[error("file notification error: {0}")]
    Notify(#[from] notify::Error),

    /// The initial directory walk failed
    #[error("cannot walk sync directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The notification channel closed; freshness can no longer be guaranteed
    #[error("file notification channel closed")]
    ChannelClosed,

    /// The watch loop task panicked or was aborted
    #[error("watch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
