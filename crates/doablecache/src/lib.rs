//! # doablecache
//!
//! In-memory snapshot cache for Doable entities, kept fresh by a directory
//! watcher.
//!
//! ## Architecture
//! - **Collection**: ordered entities plus an AHash id index, immutable once built
//! - **DoableCache**: one swappable `Arc<Collection>` per entity kind,
//!   populated on first miss and replaced wholesale on reload
//! - **DirectoryWatcher**: notify watcher feeding a tokio task that reloads
//!   the cache on every write event under the sync root

#![warn(missing_docs)]

mod cache;
mod collection;
mod error;
mod stats;
pub mod watcher;

pub use cache::{DoableCache, ReloadReport, ReloadTrigger};
pub use collection::Collection;
pub use error::WatchError;
pub use stats::CacheStats;
pub use watcher::{DirectoryWatcher, WatcherHandle, WatcherState};
