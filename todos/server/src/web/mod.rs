pub mod api;
pub mod middleware;
pub mod rate_limit;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::{self, Config, StorageBackend};
use crate::todo::{DynamoStore, MemoryStore, RelationalStore, TodoStore};
use crate::web::api::{ErrorResponse, WelcomeResponse};
use crate::web::middleware::{CorsPolicy, reject_disallowed_origin_middleware};
use crate::web::rate_limit::{RateLimitConfig, RateLimiter, rate_limit_middleware};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TodoStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Creates the state for `config` around an already connected store.
    pub fn new(config: Config, store: Arc<dyn TodoStore>) -> Self {
        let rate_limit = RateLimitConfig::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        let rate_limiter = Arc::new(RateLimiter::new(rate_limit, config.trust_proxy));
        Self {
            config: Arc::new(config),
            store,
            rate_limiter,
        }
    }
}

/// Opens the storage backend selected by the configuration.
#[tracing::instrument(skip(config))]
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn TodoStore>> {
    let store: Arc<dyn TodoStore> = match config.storage {
        StorageBackend::Memory if config.seed_sample_todos => {
            Arc::new(MemoryStore::with_sample_todos())
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Relational => {
            let db_url = config
                .db_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DB_URL is required for relational storage"))?;
            Arc::new(RelationalStore::connect(db_url).await?)
        }
        StorageBackend::Dynamodb => Arc::new(
            DynamoStore::new(config.dynamodb_table.clone(), config.aws_region.clone()).await,
        ),
    };
    tracing::info!("Using {} storage", store.backend());
    Ok(store)
}

/// Builds the application router with all middleware installed.
///
/// CORS is only handled here in development; in production a gateway in
/// front of the service takes care of it.
pub fn create_app(state: AppState) -> axum::Router {
    use axum::Router;

    let app = Router::new()
        .route("/", axum::routing::get(welcome_handler))
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(state.store.clone()))
        .fallback(not_found_handler)
        .layer(from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let app = if state.config.environment.handles_cors() {
        let policy = CorsPolicy::new(state.config.allowed_origins());
        let app = app.layer(policy.layer());
        if state.config.cors_strict_origin {
            app.layer(from_fn_with_state(
                Arc::new(policy),
                reject_disallowed_origin_middleware,
            ))
        } else {
            app
        }
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!(
        "Web server running on http://{} in {:?} mode",
        server_address,
        config.environment
    );

    let store = connect_store(&config).await?;
    let app = create_app(AppState::new(config, store));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[tracing::instrument]
pub async fn welcome_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "To-do API is running".to_string(),
    })
}

pub async fn not_found_handler() -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}
