use std::sync::Arc;

use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::todo::TodoStore;
use crate::todo::api::{TodoJson, TodoMessageResponse, TodoState};
use crate::todo::validation::TodoPayload;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorResponse {
    /// Human-readable description of what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Liveness message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::todo::api::list_todos_handler,
        crate::todo::api::create_todo_handler,
        crate::todo::api::update_todo_handler,
        crate::todo::api::delete_todo_handler,
    ),
    components(schemas(TodoJson, TodoMessageResponse, TodoPayload, ErrorResponse)),
    tags((name = "To-dos", description = "Create, list, update and delete to-dos"))
)]
pub struct ApiDoc;

/// Creates the JSON API routes together with their OpenAPI documentation.
pub fn create_api_router(store: Arc<dyn TodoStore>) -> Router {
    let todo_router = crate::todo::api::create_api_router(TodoState { store });
    Router::new()
        .route("/api/", get(super::welcome_handler))
        .merge(todo_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
