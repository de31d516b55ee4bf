//! Todo routes. Every route requires a bearer token and only ever touches the
//! caller's own todos.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use crate::auth::AuthUser;
use crate::config::MAX_TASK_LEN;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::state::AppState;
use crate::store::{Todo, TodoChanges, TodoFilter};

#[derive(Debug, Deserialize)]
pub struct CreateTodo {
    pub task: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodo {
    pub task: Option<String>,
    pub completed: Option<bool>,
}

fn validate_task(task: &str) -> Result<(), AppError> {
    if task.trim().is_empty() || task.chars().count() > MAX_TASK_LEN {
        return Err(AppError::BadRequest(format!(
            "Task must be between 1 and {} characters",
            MAX_TASK_LEN
        )));
    }
    Ok(())
}

async fn list_filtered(
    state: &AppState,
    user: &AuthUser,
    filter: TodoFilter,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = state.store.list_todos(&user.id, filter).await?;
    tracing::debug!(count = todos.len(), ?filter, "Listed todos");
    Ok(Json(todos))
}

#[instrument(name = "todos::list", skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    list_filtered(&state, &user, TodoFilter::All).await
}

#[instrument(name = "todos::completed", skip_all, fields(user_id = %user.id))]
pub async fn completed(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    list_filtered(&state, &user, TodoFilter::Completed).await
}

#[instrument(name = "todos::pending", skip_all, fields(user_id = %user.id))]
pub async fn pending(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    list_filtered(&state, &user, TodoFilter::Pending).await
}

#[instrument(name = "todos::get", skip(state, user), fields(user_id = %user.id))]
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    state
        .store
        .find_todo(&user.id, &todo_id)
        .await?
        .map(Json)
        .ok_or_else(AppError::todo_not_found)
}

#[instrument(name = "todos::create", skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    validate_task(&body.task)?;
    let todo = state.store.create_todo(&user.id, &body.task).await?;
    tracing::info!(todo_id = %todo.id, "Todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(name = "todos::update", skip(state, user, body), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
    JsonBody(body): JsonBody<UpdateTodo>,
) -> Result<Json<Todo>, AppError> {
    if let Some(task) = &body.task {
        validate_task(task)?;
    }

    let changes = TodoChanges {
        task: body.task,
        completed: body.completed,
    };

    state
        .store
        .update_todo(&user.id, &todo_id, &changes)
        .await?
        .map(Json)
        .ok_or_else(AppError::todo_not_found)
}

#[instrument(name = "todos::toggle", skip(state, user), fields(user_id = %user.id))]
pub async fn toggle_complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    state
        .store
        .toggle_todo(&user.id, &todo_id)
        .await?
        .map(Json)
        .ok_or_else(AppError::todo_not_found)
}

#[instrument(name = "todos::delete", skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let removed = state
        .store
        .delete_todo(&user.id, &todo_id)
        .await?
        .ok_or_else(AppError::todo_not_found)?;
    tracing::info!("Todo deleted");
    Ok(Json(removed))
}
