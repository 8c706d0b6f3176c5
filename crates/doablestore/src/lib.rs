//! # doablestore
//!
//! Flat-file entity store for Doable todos and todo-lists.
//!
//! ## Layout
//! - `<root>/todos/<id>.todo`: one JSON object per todo
//! - `<root>/lists/<id>.list`: one JSON object per list
//!
//! Every operation goes straight to disk. Caching lives in `doablecache`.

#![warn(missing_docs)]

mod error;
mod kind;
mod model;
mod storage;

pub use error::{Error, Result};
pub use kind::{Entity, EntityKind};
pub use model::{HiveIcon, Todo, TodoList, NOT_FOUND_LIST_NAME, NO_LIST_NAME};
pub use storage::EntityStore;
