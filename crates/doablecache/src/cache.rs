//! DoableCache: whole-collection snapshots over the entity store

use std::fmt;
use std::sync::Arc;

use doablestore::{Entity, EntityStore, Result, Todo, TodoList};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::collection::Collection;
use crate::stats::CacheStats;

/// Why a reload was started, used to label log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// Initial load when the watcher starts
    Startup,
    /// A write event under the sync root
    FileChange,
    /// A handler wrote or deleted an entity
    Write,
}

impl fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadTrigger::Startup => write!(f, "startup"),
            ReloadTrigger::FileChange => write!(f, "file change"),
            ReloadTrigger::Write => write!(f, "write"),
        }
    }
}

/// Per-collection outcome of [`DoableCache::reload`]
///
/// `Ok` carries the number of entities now cached. On `Err` the previous
/// snapshot, if any, is still being served.
#[derive(Debug)]
pub struct ReloadReport {
    /// Outcome for todos
    pub todos: Result<usize>,
    /// Outcome for lists
    pub lists: Result<usize>,
}

impl ReloadReport {
    /// Both collections were refreshed
    pub fn is_ok(&self) -> bool {
        self.todos.is_ok() && self.lists.is_ok()
    }
}

/// One swappable collection
///
/// `current` is `None` until the first load. `gate` serializes loaders so a
/// slow scan never overwrites a newer one.
struct Slot<E> {
    current: RwLock<Option<Arc<Collection<E>>>>,
    gate: Mutex<()>,
}

impl<E: Entity> Slot<E> {
    fn new() -> Self {
        Self {
            current: RwLock::new(None),
            gate: Mutex::new(()),
        }
    }

    fn peek(&self) -> Option<Arc<Collection<E>>> {
        self.current.read().clone()
    }

    fn install(&self, collection: Arc<Collection<E>>) {
        *self.current.write() = Some(collection);
    }
}

/// Cached view of every todo and list under a sync root
pub struct DoableCache {
    /// Underlying entity files
    store: Arc<EntityStore>,

    /// Todos snapshot
    todos: Slot<Todo>,

    /// Lists snapshot
    lists: Slot<TodoList>,

    /// Cache statistics
    stats: Arc<CacheStats>,
}

impl DoableCache {
    /// Create an unpopulated cache over `store`
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            todos: Slot::new(),
            lists: Slot::new(),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// All todos, loading them from disk on a cold cache
    pub fn todos(&self) -> Result<Arc<Collection<Todo>>> {
        self.get_or_load(&self.todos)
    }

    /// All lists, loading them from disk on a cold cache
    pub fn lists(&self) -> Result<Arc<Collection<TodoList>>> {
        self.get_or_load(&self.lists)
    }

    /// A single cached todo
    pub fn todo(&self, id: &str) -> Result<Option<Todo>> {
        Ok(self.todos()?.get(id).cloned())
    }

    /// A single cached list
    pub fn list(&self, id: &str) -> Result<Option<TodoList>> {
        Ok(self.lists()?.get(id).cloned())
    }

    /// Re-read both collections and replace each snapshot that loaded
    ///
    /// Lists and todos are reloaded independently: a failure on one is
    /// logged and leaves its previous snapshot in place.
    pub fn reload(&self, trigger: ReloadTrigger) -> ReloadReport {
        info!(%trigger, "cache reload started");

        let lists = self.reload_slot(&self.lists, trigger);
        let todos = self.reload_slot(&self.todos, trigger);

        info!(%trigger, "cache reload done");
        debug!(
            hits = self.stats.hits(),
            misses = self.stats.misses(),
            reloads = self.stats.reloads(),
            reload_failures = self.stats.reload_failures(),
            hit_ratio = self.stats.hit_ratio(),
            "cache stats"
        );

        ReloadReport { todos, lists }
    }

    /// Reload after a write made through the API
    pub fn invalidate(&self) -> ReloadReport {
        self.reload(ReloadTrigger::Write)
    }

    /// Whether todos have been loaded at least once
    pub fn todos_populated(&self) -> bool {
        self.todos.current.read().is_some()
    }

    /// Whether lists have been loaded at least once
    pub fn lists_populated(&self) -> bool {
        self.lists.current.read().is_some()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn get_or_load<E: Entity>(&self, slot: &Slot<E>) -> Result<Arc<Collection<E>>> {
        if let Some(collection) = slot.peek() {
            self.stats.record_hit();
            return Ok(collection);
        }

        let _gate = slot.gate.lock();

        // Another request may have loaded it while we waited
        if let Some(collection) = slot.peek() {
            self.stats.record_hit();
            return Ok(collection);
        }

        self.stats.record_miss();
        let collection = Arc::new(Collection::new(self.store.read_all::<E>()?));
        slot.install(Arc::clone(&collection));
        info!(kind = %E::KIND, count = collection.len(), "cache populated on miss");

        Ok(collection)
    }

    fn reload_slot<E: Entity>(&self, slot: &Slot<E>, trigger: ReloadTrigger) -> Result<usize> {
        let _gate = slot.gate.lock();

        match self.store.read_all::<E>() {
            Ok(items) => {
                let collection = Arc::new(Collection::new(items));
                let count = collection.len();
                slot.install(collection);
                self.stats.record_reload();
                debug!(kind = %E::KIND, count, %trigger, "collection reloaded");
                Ok(count)
            }
            Err(e) => {
                self.stats.record_reload_failure();
                error!(kind = %E::KIND, %trigger, error = %e, "collection reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn open() -> (TempDir, Arc<EntityStore>, DoableCache) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(EntityStore::new(dir.path()));
        store.ensure_layout().unwrap();
        let cache = DoableCache::new(Arc::clone(&store));
        (dir, store, cache)
    }

    fn todo(id: &str, title: &str) -> Todo {
        Todo {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn list(id: &str, name: &str) -> TodoList {
        TodoList {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_unpopulated() {
        let (_dir, _store, cache) = open();
        assert!(!cache.todos_populated());
        assert!(!cache.lists_populated());
    }

    #[test]
    fn test_populate_on_miss() {
        let (_dir, store, cache) = open();
        store.write_one(&todo("todo-1", "Buy milk")).unwrap();

        let todos = cache.todos().unwrap();
        assert_eq!(todos.len(), 1);
        assert!(cache.todos_populated());
        assert!(!cache.lists_populated());
        assert_eq!(cache.stats().misses(), 1);

        // Second read is served from memory
        cache.todos().unwrap();
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_ratio(), 0.5);
    }

    #[test]
    fn test_empty_is_populated() {
        let (_dir, _store, cache) = open();

        assert!(cache.lists().unwrap().is_empty());
        assert!(cache.lists_populated());

        cache.lists().unwrap();
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn test_stale_until_reload() {
        let (_dir, store, cache) = open();
        store.write_one(&todo("todo-1", "first")).unwrap();
        let before = cache.todos().unwrap();

        store.write_one(&todo("todo-1", "second")).unwrap();
        assert_eq!(cache.todo("todo-1").unwrap().unwrap().title, "first");

        let report = cache.reload(ReloadTrigger::FileChange);
        assert!(report.is_ok());
        assert_eq!(cache.todo("todo-1").unwrap().unwrap().title, "second");

        // Earlier snapshots are untouched by the swap
        assert_eq!(before.get("todo-1").unwrap().title, "first");
    }

    #[test]
    fn test_reload_populates_both() {
        let (_dir, store, cache) = open();
        store.write_one(&todo("todo-1", "t")).unwrap();
        store.write_one(&list("list-9", "Groceries")).unwrap();

        let report = cache.reload(ReloadTrigger::Startup);
        assert!(matches!(report.todos, Ok(1)));
        assert!(matches!(report.lists, Ok(1)));
        assert!(cache.todos_populated());
        assert!(cache.lists_populated());
        assert_eq!(cache.stats().reloads(), 2);

        assert_eq!(cache.list("list-9").unwrap().unwrap().name, "Groceries");
        assert!(cache.list("list-0").unwrap().is_none());
        assert_eq!(cache.stats().misses(), 0);
    }

    #[test]
    fn test_failed_reload_is_isolated() {
        let (_dir, store, cache) = open();
        store.write_one(&todo("todo-1", "t")).unwrap();
        store.write_one(&list("list-9", "Groceries")).unwrap();
        cache.reload(ReloadTrigger::Startup);

        fs::write(store.root().join("lists/broken.list"), b"{").unwrap();
        store.write_one(&todo("todo-2", "t")).unwrap();

        let report = cache.invalidate();
        assert!(report.lists.is_err());
        assert!(matches!(report.todos, Ok(2)));
        assert!(!report.is_ok());

        // Stale lists still served
        let lists = cache.lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists.as_slice()[0].name, "Groceries");
        assert_eq!(cache.todos().unwrap().len(), 2);
        assert_eq!(cache.stats().reload_failures(), 1);
    }

    #[test]
    fn test_failed_reload_on_cold_cache_stays_cold() {
        let (_dir, store, cache) = open();
        fs::write(store.root().join("todos/broken.todo"), b"nope").unwrap();

        let report = cache.reload(ReloadTrigger::Startup);
        assert!(report.todos.is_err());
        assert!(!cache.todos_populated());
        assert!(cache.lists_populated());

        assert!(cache.todos().is_err());
    }

    #[test]
    fn test_concurrent_first_reads() {
        let (_dir, store, cache) = open();
        for i in 0..10 {
            store.write_one(&todo(&format!("todo-{i}"), "t")).unwrap();
        }
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.todos().unwrap().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 10);
        }

        // Loads are coalesced behind the gate
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hits(), 7);
    }
}
