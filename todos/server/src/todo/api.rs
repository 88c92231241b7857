use crate::todo::validation::{Rejection, TodoPayload, validate};
use crate::todo::{StoreError, Todo, TodoStore};
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared state for the to-do handlers.
#[derive(Clone)]
pub struct TodoState {
    pub store: Arc<dyn TodoStore>,
}

/// JSON representation of a to-do for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TodoJson {
    /// Unique identifier for the to-do
    pub id: String,
    /// Title, 1 to 40 characters
    pub title: String,
    /// Description, empty when none was given
    pub description: String,
    /// Creation time in epoch milliseconds, key-value storage only
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Owning user, relational storage only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id().to_string(),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            created_at: todo.created_at(),
            user_id: todo.user_id(),
        }
    }
}

/// API response for update and delete.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodoMessageResponse {
    /// What happened
    pub message: String,
    /// The to-do after an update, or before a delete
    pub todo: TodoJson,
}

/// Error type for to-do handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoApiError {
    /// The payload failed validation.
    #[error(transparent)]
    Validation(#[from] Rejection),
    /// The body could not be read as JSON.
    #[error("Request body must be valid JSON")]
    MalformedBody(#[from] JsonRejection),
    /// No to-do has the requested id.
    #[error("To-do not found")]
    NotFound,
    /// The configured backend lacks the operation.
    #[error("Updating to-dos is not supported by this storage backend")]
    Unsupported,
    /// The backend failed; `message` is what the client sees.
    #[error("{message}")]
    Backend {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl TodoApiError {
    /// Wraps a store failure, logging the details that are kept from the client.
    fn from_store(message: &'static str, err: StoreError) -> Self {
        if let StoreError::Unsupported { backend, operation } = &err {
            tracing::warn!("{} backend does not support {}", backend, operation);
            return TodoApiError::Unsupported;
        }
        tracing::error!("{}: {}", message, err);
        TodoApiError::Backend {
            message,
            source: err,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            TodoApiError::Validation(_) | TodoApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            TodoApiError::NotFound => StatusCode::NOT_FOUND,
            TodoApiError::Unsupported => StatusCode::NOT_IMPLEMENTED,
            TodoApiError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TodoApiError {
    fn into_response(self) -> Response {
        if let TodoApiError::Validation(rejection) = &self {
            tracing::debug!("Rejected to-do payload: {}", rejection.code());
        }
        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Handler for GET /api/to-dos - Returns all to-dos.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/to-dos",
    responses(
        (status = 200, description = "Successfully retrieved to-dos", body = [TodoJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "To-dos"
)]
pub async fn list_todos_handler(
    State(state): State<TodoState>,
) -> Result<Json<Vec<TodoJson>>, TodoApiError> {
    let todos = state
        .store
        .list()
        .await
        .map_err(|err| TodoApiError::from_store("Failed to fetch to-dos", err))?;
    Ok(Json(todos.into_iter().map(TodoJson::from).collect()))
}

/// Handler for POST /api/to-dos/add - Validates and stores a new to-do.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/to-dos/add",
    request_body = TodoPayload,
    responses(
        (status = 201, description = "To-do created", body = TodoJson),
        (status = 400, description = "Invalid title or description", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "To-dos"
)]
pub async fn create_todo_handler(
    State(state): State<TodoState>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoJson>), TodoApiError> {
    let Json(payload) = payload?;
    let input = validate(&payload)?;
    let created = state
        .store
        .create(input)
        .await
        .map_err(|err| TodoApiError::from_store("Failed to create to-do", err))?;
    tracing::info!("Created to-do {}", created.id());
    Ok((StatusCode::CREATED, Json(TodoJson::from(created))))
}

/// Handler for PUT /api/to-dos/{id} - Replaces title and description.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/api/to-dos/{id}",
    params(
        ("id" = String, Path, description = "Identifier of the to-do")
    ),
    request_body = TodoPayload,
    responses(
        (status = 200, description = "To-do updated", body = TodoMessageResponse),
        (status = 400, description = "Invalid title or description", body = ErrorResponse),
        (status = 404, description = "To-do not found", body = ErrorResponse),
        (status = 501, description = "Storage backend cannot update", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "To-dos"
)]
pub async fn update_todo_handler(
    State(state): State<TodoState>,
    Path(id): Path<String>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<Json<TodoMessageResponse>, TodoApiError> {
    let Json(payload) = payload?;
    let input = validate(&payload)?;
    let updated = state
        .store
        .update(&id, input)
        .await
        .map_err(|err| TodoApiError::from_store("Failed to update to-do", err))?
        .ok_or(TodoApiError::NotFound)?;
    Ok(Json(TodoMessageResponse {
        message: "To-do updated successfully".to_string(),
        todo: TodoJson::from(updated),
    }))
}

/// Handler for DELETE /api/to-dos/{id} - Removes a to-do and returns it.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/to-dos/{id}",
    params(
        ("id" = String, Path, description = "Identifier of the to-do")
    ),
    responses(
        (status = 200, description = "To-do deleted", body = TodoMessageResponse),
        (status = 404, description = "To-do not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "To-dos"
)]
pub async fn delete_todo_handler(
    State(state): State<TodoState>,
    Path(id): Path<String>,
) -> Result<Json<TodoMessageResponse>, TodoApiError> {
    let deleted = state
        .store
        .delete(&id)
        .await
        .map_err(|err| TodoApiError::from_store("Failed to delete to-do", err))?
        .ok_or(TodoApiError::NotFound)?;
    tracing::info!("Deleted to-do {}", deleted.id());
    Ok(Json(TodoMessageResponse {
        message: "To-do deleted successfully".to_string(),
        todo: TodoJson::from(deleted),
    }))
}

/// Creates and returns the to-do API router.
pub fn create_api_router(state: TodoState) -> Router {
    Router::new()
        .route("/api/to-dos", get(list_todos_handler))
        .route("/api/todos", get(list_todos_handler))
        .route("/api/to-dos/add", post(create_todo_handler))
        .route(
            "/api/to-dos/{id}",
            put(update_todo_handler).delete(delete_todo_handler),
        )
        .with_state(state)
}
