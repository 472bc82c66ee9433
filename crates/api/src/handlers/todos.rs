use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use domain::{DayWindow, NewTodo, Todo, TodoPatch};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, TODO_NOT_FOUND};
use crate::AppState;

/// POST /api/todos リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl From<CreateTodoRequest> for NewTodo {
    fn from(req: CreateTodoRequest) -> Self {
        NewTodo {
            title: req.title,
            description: req.description,
            completed: req.completed,
        }
    }
}

/// PATCH /api/todos/title/:title リクエスト。指定されたフィールドのみ上書きする
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl From<UpdateTodoRequest> for TodoPatch {
    fn from(req: UpdateTodoRequest) -> Self {
        TodoPatch {
            title: req.title,
            description: req.description,
            completed: req.completed,
        }
    }
}

/// GET /api/todos
pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.todos.list().await?;
    Ok(Json(todos))
}

/// GET /api/todos/date/:date
/// 該当なしは空配列ではなく 404
pub async fn todos_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let window = DayWindow::parse(&date)?;
    let todos = state.todos.list_created_within(window).await?;
    if todos.is_empty() {
        return Err(ApiError::NotFound("No todos found for this date"));
    }

    info!(date = %date, count = todos.len(), "Todos found for date");
    Ok(Json(todos))
}

/// GET /api/todos/title/:title
pub async fn todo_by_title(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    state
        .todos
        .find_by_title(&title)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Cannot find todo"))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(req) = payload?;
    let todo = Todo::create(req.into(), Utc::now())?;
    state.todos.insert(&todo).await?;

    info!(todo_id = %todo.id, title = %todo.title, "Todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

/// PATCH /api/todos/title/:title
/// 本文なし（Content-Type なし）は空のパッチとして扱う
pub async fn update_todo(
    State(state): State<AppState>,
    Path(title): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let mut todo = state
        .todos
        .find_by_title(&title)
        .await?
        .ok_or(ApiError::NotFound(TODO_NOT_FOUND))?;

    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => UpdateTodoRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    todo.apply_patch(req.into(), Utc::now())?;
    // 検索から書き込みまでの間に削除された場合も 404
    let updated = state
        .todos
        .replace(&todo)
        .await?
        .ok_or(ApiError::NotFound(TODO_NOT_FOUND))?;

    info!(todo_id = %updated.id, title = %title, "Todo updated");
    Ok(Json(updated))
}

/// DELETE /api/todos/title/:title
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let todo = state
        .todos
        .find_by_title(&title)
        .await
        .map_err(ApiError::server)?
        .ok_or(ApiError::NotFound(TODO_NOT_FOUND))?;

    let removed = state
        .todos
        .remove(&todo.id)
        .await
        .map_err(ApiError::server)?;
    if !removed {
        return Err(ApiError::NotFound(TODO_NOT_FOUND));
    }

    info!(todo_id = %todo.id, title = %title, "Todo deleted");
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}
