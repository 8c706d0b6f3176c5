//! JSON API handlers
//!
//! Multi-entity reads come from the cache. Single-id reads and every write go
//! to the store; writes invalidate the cache before responding so the caller
//! reads its own write, and the directory watcher covers edits made outside
//! the API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use doablecache::{Collection, DoableCache};
use doablestore::{EntityStore, Todo, TodoList};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{store_error, ApiError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub cache: Arc<DoableCache>,
}

impl AppState {
    pub fn new(store: Arc<EntityStore>, cache: Arc<DoableCache>) -> Self {
        Self { store, cache }
    }
}

/// Body of `POST /api/todos`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub has_recurred: bool,
}

/// Form body of the legacy `POST /api/todos/check`
#[derive(Debug, Deserialize)]
pub struct CheckForm {
    #[serde(default)]
    pub id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/formatted", get(list_formatted_todos))
        .route("/api/todos/{id}", get(get_todo).delete(delete_todo))
        .route("/api/todos/{id}/formatted", get(get_formatted_todo))
        .route("/api/todos/{id}/check", put(check_todo))
        .route("/api/todos/{id}/uncheck", put(uncheck_todo))
        .route("/api/lists", get(list_lists))
        .route("/api/lists/{id}", get(get_list))
        // Paths used by earlier frontends
        .route("/api/todos/get", get(list_todos))
        .route("/api/todos/get/formatted", get(list_formatted_todos))
        .route("/api/todos/check", post(check_todo_form))
        .route("/api/lists/get", get(list_lists))
        .with_state(state)
}

/// Timestamp in the format the sync clients write
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.3f")
        .to_string()
}

/// Replace a todo's list id with its list's name
pub fn format_todo(mut todo: Todo, lists: &Collection<TodoList>) -> Todo {
    todo.list_id = todo.list_name(lists);
    todo
}

/// Incomplete todos with list ids resolved to names
pub fn format_todos(todos: &[Todo], lists: &Collection<TodoList>) -> Vec<Todo> {
    todos
        .iter()
        .filter(|todo| !todo.is_completed)
        .map(|todo| format_todo(todo.clone(), lists))
        .collect()
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.cache.todos().map_err(store_error("get todos", "*"))?;
    info!(count = todos.len(), "todos requested");
    Ok(Json(todos.as_slice().to_vec()))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state
        .store
        .read_one::<Todo>(&id)
        .map_err(store_error("read todo", &id))?;
    info!(id = %id, "todo requested");
    Ok(Json(todo))
}

async fn list_formatted_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state
        .cache
        .todos()
        .map_err(store_error("get todos for formatted todos", "*"))?;
    let lists = state
        .cache
        .lists()
        .map_err(store_error("get lists for formatted todos", "*"))?;

    let formatted = format_todos(todos.as_slice(), &lists);
    info!(count = formatted.len(), "formatted todos requested");
    Ok(Json(formatted))
}

async fn get_formatted_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state
        .store
        .read_one::<Todo>(&id)
        .map_err(store_error("read todo", &id))?;
    let lists = state
        .cache
        .lists()
        .map_err(store_error("get lists for formatted todo", &id))?;

    info!(id = %id, "formatted todo requested");
    Ok(Json(format_todo(todo, &lists)))
}

async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        info!(error = %rejection, "bad request: malformed todo body");
        ApiError::BadRequest(rejection.body_text())
    })?;
    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest("No title provided".to_string()));
    }

    let now = timestamp();
    let todo = Todo {
        id: Uuid::new_v4().to_string(),
        creation_date: now.clone(),
        title: input.title,
        is_important: input.is_important,
        is_completed: false,
        last_modified: now,
        had_initial_sync: false,
        list_id: input.list_id,
        has_recurred: input.has_recurred,
        completed_date: String::new(),
        description: input.description,
    };

    state
        .store
        .write_one(&todo)
        .map_err(store_error("save todo", &todo.id))?;
    state.cache.invalidate();

    info!(id = %todo.id, title = %todo.title, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

/// Flip a todo's completion flag, refusing a no-op
fn set_completed(state: &AppState, id: &str, completed: bool) -> Result<Todo, ApiError> {
    let mut todo = state
        .store
        .read_one::<Todo>(id)
        .map_err(store_error("read todo", id))?;

    if todo.is_completed == completed {
        let status = if completed { "already completed" } else { "not completed" };
        info!(id, "bad request: todo is {status}");
        return Err(ApiError::BadRequest(format!(
            "Todo \"{}\" ({}) is {}",
            todo.title, todo.id, status
        )));
    }

    todo.is_completed = completed;
    todo.last_modified = timestamp();
    state
        .store
        .write_one(&todo)
        .map_err(store_error("save todo", id))?;
    state.cache.invalidate();

    info!(id, title = %todo.title, completed, "todo completion changed");
    Ok(todo)
}

async fn check_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_completed(&state, &id, true)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn uncheck_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_completed(&state, &id, false)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_todo_form(
    State(state): State<AppState>,
    Form(form): Form<CheckForm>,
) -> Result<String, ApiError> {
    if form.id.is_empty() {
        info!("bad request: no id provided");
        return Err(ApiError::BadRequest("No id provided".to_string()));
    }

    let todo = set_completed(&state, &form.id, true)?;
    Ok(format!(
        "Todo \"{}\" ({}) checked as completed",
        todo.title, todo.id
    ))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state
        .store
        .read_one::<Todo>(&id)
        .map_err(store_error("read todo", &id))?;
    state
        .store
        .delete_one::<Todo>(&id)
        .map_err(store_error("delete todo", &id))?;

    let report = state.cache.invalidate();
    if !report.is_ok() {
        warn!(id = %id, "cache reload after delete incomplete");
    }

    info!(id = %id, title = %todo.title, "todo deleted");
    Ok(Json(todo))
}

async fn list_lists(State(state): State<AppState>) -> Result<Json<Vec<TodoList>>, ApiError> {
    let lists = state.cache.lists().map_err(store_error("get lists", "*"))?;
    info!(count = lists.len(), "todo lists requested");
    Ok(Json(lists.as_slice().to_vec()))
}

async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoList>, ApiError> {
    let list = state
        .store
        .read_one::<TodoList>(&id)
        .map_err(store_error("read list", &id))?;
    info!(id = %id, "todo list requested");
    Ok(Json(list))
}
