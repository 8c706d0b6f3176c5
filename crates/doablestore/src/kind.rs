//! Entity kinds and the trait binding Rust types to them

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The two kinds of entity persisted by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A single todo item
    Todo,
    /// A todo list
    List,
}

impl EntityKind {
    /// Directory under the sync root holding this kind's files
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Todo => "todos",
            EntityKind::List => "lists",
        }
    }

    /// File extension (without the dot) of this kind's files
    pub fn extension(self) -> &'static str {
        match self {
            EntityKind::Todo => "todo",
            EntityKind::List => "list",
        }
    }

    /// Every kind, in the order directories are bootstrapped
    pub fn all() -> [EntityKind; 2] {
        [EntityKind::Todo, EntityKind::List]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Todo => write!(f, "todo"),
            EntityKind::List => write!(f, "list"),
        }
    }
}

/// A record stored as one JSON file keyed by its id
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind this type is stored as
    const KIND: EntityKind;

    /// Stable identifier, also the file stem
    fn id(&self) -> &str;
}
