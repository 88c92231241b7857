use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::web::api::ErrorResponse;

/// How long browsers may cache a preflight response.
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(10);

/// Browser origins allowed to call the API.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<HeaderValue>,
    allow_any: bool,
}

impl CorsPolicy {
    /// Builds a policy from exact origin strings. `*` allows every origin.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_origins = Vec::new();
        let mut allow_any = false;
        for origin in origins {
            let origin = origin.as_ref();
            if origin == "*" {
                allow_any = true;
                continue;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed_origins.push(value),
                Err(e) => tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e),
            }
        }
        Self {
            allowed_origins,
            allow_any,
        }
    }

    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.allow_any || self.allowed_origins.contains(origin)
    }

    /// Returns the tower-http layer that answers preflights and adds CORS headers.
    pub fn layer(&self) -> CorsLayer {
        let allow_origin = if self.allow_any {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(self.allowed_origins.clone())
        };
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(PREFLIGHT_MAX_AGE)
    }
}

/// Middleware that rejects browser requests from origins outside the policy.
/// Requests without an `Origin` header, such as curl or server-to-server
/// calls, pass through.
pub async fn reject_disallowed_origin_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !policy.is_allowed(origin) {
            tracing::warn!("Rejected request from origin {:?}", origin);
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Not allowed by CORS")),
            )
                .into_response();
        }
    }

    next.run(request).await
}
