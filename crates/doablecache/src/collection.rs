//! Immutable snapshot of every entity of one kind

use std::collections::HashMap;

use ahash::RandomState;
use doablestore::Entity;

/// Entities in directory order, indexed by id
///
/// Built once per load and never mutated; the cache swaps whole collections.
#[derive(Debug, Clone)]
pub struct Collection<E> {
    items: Vec<E>,
    index: HashMap<String, usize, RandomState>,
}

impl<E: Entity> Collection<E> {
    /// Build a collection, keeping the order of `items`
    ///
    /// On duplicate ids the index points at the last occurrence.
    pub fn new(items: Vec<E>) -> Self {
        let mut index = HashMap::with_capacity_and_hasher(items.len(), RandomState::new());
        for (pos, item) in items.iter().enumerate() {
            index.insert(item.id().to_string(), pos);
        }
        Self { items, index }
    }

    /// Look up an entity by id
    pub fn get(&self, id: &str) -> Option<&E> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Entities in load order
    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    /// Iterate in load order
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, E: Entity> IntoIterator for &'a Collection<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
