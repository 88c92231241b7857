use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::web::api::ErrorResponse;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Key used when the client address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Expired windows are swept once this many clients are tracked.
const SWEEP_THRESHOLD: usize = 10_000;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitConfig {
    /// 30 requests per 15 minutes.
    fn default() -> Self {
        Self::new(30, Duration::from_secs(15 * 60))
    }
}

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of counting one request against its client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time left until the client's window resets.
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Whole seconds until reset, rounded up.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(self.reset_secs()));
    }
}

/// Fixed-window request counter keyed by client address.
///
/// Counters live for the lifetime of the process and are not shared between
/// instances.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    trust_proxy: bool,
    windows: Mutex<HashMap<String, WindowEntry>>,
}

impl RateLimiter {
    /// Creates a limiter. With `trust_proxy` the client key is taken from
    /// `X-Forwarded-For` when present.
    pub fn new(config: RateLimitConfig, trust_proxy: bool) -> Self {
        Self {
            config,
            trust_proxy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request for `key` and decides whether it may proceed.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.windows.lock().await;

        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, entry| now.duration_since(entry.window_start) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        let allowed = entry.count < self.config.max_requests;
        if allowed {
            entry.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit: self.config.max_requests,
            remaining: self.config.max_requests - entry.count,
            reset_after: window.saturating_sub(now.duration_since(entry.window_start)),
        }
    }

    /// Derives the client key for a request.
    ///
    /// Order: left-most `X-Forwarded-For` entry (only with `trust_proxy`),
    /// then the peer socket address, then [`UNKNOWN_CLIENT`].
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy {
            if let Some(forwarded) = forwarded_client(request.headers()) {
                return forwarded;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded_for = headers.get("x-forwarded-for")?.to_str().ok()?;
    let client = forwarded_for.split(',').next()?.trim();
    if client.is_empty() {
        None
    } else {
        Some(client.to_string())
    }
}

/// Middleware that rejects clients exceeding their request budget with 429.
/// Every response carries the `RateLimit-*` headers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.client_key(&request);
    let decision = limiter.check(&client).await;

    if !decision.allowed {
        tracing::warn!("Rate limit exceeded for client {}", client);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(
                "Too many requests, please try again later.",
            )),
        )
            .into_response();
        decision.apply_headers(response.headers_mut());
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(decision.reset_secs()),
        );
        return response;
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
