//! Storage engine implementation
//!
//! File layout:
//! - `<root>/todos/<id>.todo`: one todo per file
//! - `<root>/lists/<id>.list`: one list per file
//!
//! Writes go to a hidden `.<id>.<ext>.tmp` sibling first and are renamed over
//! the target, so readers never see a half-written entity.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::kind::{Entity, EntityKind};

/// Indentation used for entity files, matching the sync clients
const INDENT: &[u8] = b"\t";

/// EntityStore is the handle on a sync directory
#[derive(Debug, Clone)]
pub struct EntityStore {
    /// Sync root holding one directory per entity kind
    root: PathBuf,
}

impl EntityStore {
    /// Create a store rooted at `root`
    ///
    /// Nothing is touched on disk; call [`EntityStore::ensure_layout`] to
    /// bootstrap the directories.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Sync root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding entities of `kind`
    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Create the sync root and every kind directory if missing
    pub fn ensure_layout(&self) -> Result<()> {
        for kind in EntityKind::all() {
            let dir = self.kind_dir(kind);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Read a single entity by id
    ///
    /// # Returns
    /// * `Err(Error::NotFound)` if no file backs the id
    /// * `Err(Error::Decode)` if the file is not a valid entity
    pub fn read_one<E: Entity>(&self, id: &str) -> Result<E> {
        let path = self.entity_path(E::KIND, id)?;
        let data = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            },
            _ => Error::io(&path, e),
        })?;
        decode(&path, &data)
    }

    /// Read every entity of a kind, in directory iteration order
    ///
    /// The first unreadable or undecodable file fails the whole scan; files
    /// removed after the directory listing are skipped.
    pub fn read_all<E: Entity>(&self) -> Result<Vec<E>> {
        let dir = self.kind_dir(E::KIND);
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;

        let mut entities = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();

            if !is_entity_file(&path, E::KIND) {
                debug!(path = %path.display(), "skipping non-entity file");
                continue;
            }

            if let Some(entity) = read_entry(&path)? {
                entities.push(entity);
            }
        }

        if entities.is_empty() {
            warn!(dir = %dir.display(), "no {} files found", E::KIND);
        }

        Ok(entities)
    }

    /// Create or replace an entity's file
    pub fn write_one<E: Entity>(&self, entity: &E) -> Result<()> {
        let path = self.entity_path(E::KIND, entity.id())?;
        let data = encode(entity)?;

        let tmp_path = path.with_file_name(format!(
            ".{}.{}.tmp",
            entity.id(),
            E::KIND.extension()
        ));
        let written = write_file(&tmp_path, &data).and_then(|_| fs::rename(&tmp_path, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::io(&path, e));
        }

        debug!(kind = %E::KIND, id = entity.id(), "entity written");
        Ok(())
    }

    /// Remove an entity's file
    pub fn delete_one<E: Entity>(&self, id: &str) -> Result<()> {
        let path = self.entity_path(E::KIND, id)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            },
            _ => Error::io(&path, e),
        })?;

        debug!(kind = %E::KIND, id, "entity deleted");
        Ok(())
    }

    /// Check whether an entity file exists
    pub fn exists<E: Entity>(&self, id: &str) -> Result<bool> {
        let path = self.entity_path(E::KIND, id)?;
        Ok(path.is_file())
    }

    fn entity_path(&self, kind: EntityKind, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self
            .kind_dir(kind)
            .join(format!("{}.{}", id, kind.extension())))
    }
}

/// Reject ids that are empty, hidden or would escape the kind directory
///
/// A leading dot covers `.` and `..`; inner dots are fine.
fn validate_id(id: &str) -> Result<()> {
    let bad = id.is_empty() || id.starts_with('.') || id.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::InvalidId(id.to_string()));
    }
    Ok(())
}

fn is_entity_file(path: &Path, kind: EntityKind) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(true, |name| name.starts_with('.'));
    let matches_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == kind.extension());
    !hidden && matches_ext && path.is_file()
}

/// Read one scanned file; `None` if it was removed since the listing
fn read_entry<E: Entity>(path: &Path) -> Result<Option<E>> {
    match fs::read(path) {
        Ok(data) => decode(path, &data).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "file vanished during scan, skipping");
            Ok(None)
        }
        Err(e) => Err(Error::io(path, e)),
    }
}

fn decode<E: Entity>(path: &Path, data: &[u8]) -> Result<E> {
    serde_json::from_slice(data).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn encode<E: Entity>(entity: &E) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(512);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entity.serialize(&mut ser).map_err(Error::Encode)?;
    buf.push(b'\n');
    Ok(buf)
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HiveIcon, Todo, TodoList};
    use tempfile::TempDir;

    fn open() -> (TempDir, EntityStore) {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::new(dir.path().join("sync"));
        store.ensure_layout().unwrap();
        (dir, store)
    }

    fn todo(id: &str, title: &str) -> Todo {
        Todo {
            id: id.to_string(),
            title: title.to_string(),
            creation_date: "2024-03-01T10:00:00.000".to_string(),
            last_modified: "2024-03-01T10:00:00.000".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_layout() {
        let (_dir, store) = open();
        assert!(store.root().join("todos").is_dir());
        assert!(store.root().join("lists").is_dir());

        // Idempotent
        store.ensure_layout().unwrap();
    }

    #[test]
    fn test_write_and_read_todo() {
        let (_dir, store) = open();
        let mut original = todo("todo-1", "Buy milk");
        original.is_important = true;
        original.list_id = "list-9".to_string();
        original.description = "semi-skimmed".to_string();

        store.write_one(&original).unwrap();
        assert!(store.root().join("todos/todo-1.todo").is_file());

        let read: Todo = store.read_one("todo-1").unwrap();
        assert_eq!(read, original);
    }

    #[test]
    fn test_write_and_read_list() {
        let (_dir, store) = open();
        let original = TodoList {
            id: "list-9".to_string(),
            name: "Groceries".to_string(),
            hive_icon: HiveIcon {
                code_point: 57_344,
                font_family: "MaterialIcons".to_string(),
                match_text_direction: true,
            },
            color: vec![255, 76, 175, 80],
            is_hidden: true,
            ..Default::default()
        };

        store.write_one(&original).unwrap();
        let read: TodoList = store.read_one("list-9").unwrap();
        assert_eq!(read, original);
    }

    #[test]
    fn test_written_file_is_indented() {
        let (_dir, store) = open();
        store.write_one(&todo("todo-1", "Buy milk")).unwrap();

        let text = fs::read_to_string(store.root().join("todos/todo-1.todo")).unwrap();
        assert!(text.starts_with("{\n\t\"id\": \"todo-1\""));
        assert!(text.contains("\n\t\"title\": \"Buy milk\""));
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let (_dir, store) = open();
        store.write_one(&todo("todo-1", "first")).unwrap();
        store.write_one(&todo("todo-1", "second")).unwrap();

        let read: Todo = store.read_one("todo-1").unwrap();
        assert_eq!(read.title, "second");

        // No temp file left behind
        let names: Vec<_> = fs::read_dir(store.kind_dir(EntityKind::Todo))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_read_not_found() {
        let (_dir, store) = open();
        let result = store.read_one::<Todo>("missing");
        assert!(matches!(result, Err(Error::NotFound { kind: EntityKind::Todo, .. })));

        let result = store.read_one::<TodoList>("missing");
        assert!(matches!(result, Err(Error::NotFound { kind: EntityKind::List, .. })));
    }

    #[test]
    fn test_read_invalid_json() {
        let (_dir, store) = open();
        fs::write(store.root().join("todos/bad.todo"), b"{ not json").unwrap();

        let result = store.read_one::<Todo>("bad");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_read_wrong_shape() {
        let (_dir, store) = open();
        fs::write(store.root().join("todos/bad.todo"), br#"{"isCompleted":"yes"}"#).unwrap();

        let result = store.read_one::<Todo>("bad");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (_dir, store) = open();
        for id in ["", "../secret", "a/b", "a\\b", ".hidden"] {
            let result = store.read_one::<Todo>(id);
            assert!(matches!(result, Err(Error::InvalidId(_))), "id {id:?}");
        }

        for id in ["a..b", "v1.2", "todo-1.backup"] {
            store.write_one(&todo(id, "dotted")).unwrap();
            let read: Todo = store.read_one(id).unwrap();
            assert_eq!(read.id, id);
        }

        let mut bad = todo("x", "t");
        bad.id = "../../etc".to_string();
        assert!(matches!(store.write_one(&bad), Err(Error::InvalidId(_))));
    }

    #[test]
    fn test_read_all_empty() {
        let (_dir, store) = open();
        let todos: Vec<Todo> = store.read_all().unwrap();
        assert!(todos.is_empty());
    }

    #[test]
    fn test_read_all() {
        let (_dir, store) = open();
        for i in 0..3 {
            store.write_one(&todo(&format!("todo-{i}"), "t")).unwrap();
        }

        let mut ids: Vec<String> = store
            .read_all::<Todo>()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["todo-0", "todo-1", "todo-2"]);

        // Lists are a separate directory
        assert!(store.read_all::<TodoList>().unwrap().is_empty());
    }

    #[test]
    fn test_read_all_skips_foreign_files() {
        let (_dir, store) = open();
        store.write_one(&todo("todo-1", "t")).unwrap();
        let todos_dir = store.kind_dir(EntityKind::Todo);
        fs::write(todos_dir.join(".todo-2.todo.tmp"), b"partial").unwrap();
        fs::write(todos_dir.join("notes.txt"), b"hello").unwrap();
        fs::create_dir(todos_dir.join("archive")).unwrap();

        let todos: Vec<Todo> = store.read_all().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, "todo-1");
    }

    #[test]
    fn test_read_entry_vanished_file() {
        let (_dir, store) = open();
        let gone = store.root().join("todos/gone.todo");

        let result = read_entry::<Todo>(&gone).unwrap();
        assert!(result.is_none());

        store.write_one(&todo("here", "t")).unwrap();
        let found = read_entry::<Todo>(&store.root().join("todos/here.todo")).unwrap();
        assert_eq!(found.unwrap().id, "here");
    }

    #[test]
    fn test_read_all_fails_on_bad_file() {
        let (_dir, store) = open();
        store.write_one(&todo("todo-1", "t")).unwrap();
        fs::write(store.root().join("todos/broken.todo"), b"42").unwrap();

        let result = store.read_all::<Todo>();
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_read_all_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::new(dir.path().join("nowhere"));

        let result = store.read_all::<Todo>();
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open();
        store.write_one(&todo("todo-1", "t")).unwrap();
        assert!(store.exists::<Todo>("todo-1").unwrap());

        store.delete_one::<Todo>("todo-1").unwrap();
        assert!(!store.exists::<Todo>("todo-1").unwrap());

        let result = store.read_one::<Todo>("todo-1");
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_not_found() {
        let (_dir, store) = open();
        let result = store.delete_one::<TodoList>("missing");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
