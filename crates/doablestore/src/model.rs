//! Todo and TodoList records as written by the Doable sync clients

use serde::{Deserialize, Serialize};

use crate::kind::{Entity, EntityKind};

/// List name reported for a todo without a list
pub const NO_LIST_NAME: &str = "No list";

/// List name reported when a todo points at a list that does not exist
pub const NOT_FOUND_LIST_NAME: &str = "Not found";

/// A todo item, one `.todo` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Todo {
    /// Stable id, assigned at creation
    pub id: String,
    /// Creation timestamp
    pub creation_date: String,
    /// Title
    pub title: String,
    /// Starred by the user
    pub is_important: bool,
    /// Done
    pub is_completed: bool,
    /// Last modification timestamp
    pub last_modified: String,
    /// Set by the client once it has pushed the todo
    pub had_initial_sync: bool,
    /// Owning list id, empty when unassigned
    pub list_id: String,
    /// Recurrence already spawned for this todo
    pub has_recurred: bool,
    /// Completion timestamp, round-tripped as-is
    pub completed_date: String,
    /// Free-form notes
    pub description: String,
}

impl Todo {
    /// Name of this todo's list among `lists`
    ///
    /// Returns [`NO_LIST_NAME`] when the todo has no list and
    /// [`NOT_FOUND_LIST_NAME`] when its list id matches nothing.
    pub fn list_name<'a, I>(&self, lists: I) -> String
    where
        I: IntoIterator<Item = &'a TodoList>,
    {
        if self.list_id.is_empty() {
            return NO_LIST_NAME.to_string();
        }
        lists
            .into_iter()
            .find(|list| list.id == self.list_id)
            .map(|list| list.name.clone())
            .unwrap_or_else(|| NOT_FOUND_LIST_NAME.to_string())
    }
}

impl Entity for Todo {
    const KIND: EntityKind = EntityKind::Todo;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Icon descriptor used by the Flutter client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HiveIcon {
    /// Glyph code point
    pub code_point: i64,
    /// Icon font family
    pub font_family: String,
    /// Mirror for right-to-left text
    pub match_text_direction: bool,
}

/// A todo list, one `.list` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoList {
    /// Stable id
    pub id: String,
    /// Display name
    pub name: String,
    /// Icon in its normal state
    pub hive_icon: HiveIcon,
    /// Icon when the list is selected
    pub selected_hive_icon: HiveIcon,
    /// Creation timestamp
    pub creation_date: String,
    /// Last modification timestamp
    pub last_modified: String,
    /// Set by the client once it has pushed the list
    pub had_initial_sync: bool,
    /// Color components as the client stores them
    pub color: Vec<i64>,
    /// Hidden from the sidebar
    pub is_hidden: bool,
}

impl Entity for TodoList {
    const KIND: EntityKind = EntityKind::List;

    fn id(&self) -> &str {
        &self.id
    }
}
