use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use insta::assert_json_snapshot;
use serde_json::json;
use std::sync::Arc;
use todos_server::config::{AppEnv, Config};
use todos_server::todo::MemoryStore;

mod common;

use common::{create_test_app, get, send};

const FRONTEND: &str = "http://localhost:5173";

fn app_with(config: Config) -> axum::Router {
    create_test_app(config, Arc::new(MemoryStore::new()))
}

fn with_origin(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("origin", origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn can_report_liveness() {
    let app = app_with(Config::default());

    for uri in ["/", "/api/"] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_json_snapshot!(body, @r#"
        {
          "message": "To-do API is running"
        }
        "#);
    }
}

#[tokio::test]
async fn can_check_health_endpoint() {
    let app = app_with(Config::default());

    let (status, _, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn can_answer_unknown_routes_with_json() {
    let app = app_with(Config::default());

    let (status, _, body) = send(&app, get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn can_serve_openapi_document() {
    let app = app_with(Config::default());

    let (status, _, body) = send(&app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/to-dos/add"]["post"].is_object());
}

#[tokio::test(start_paused = true)]
async fn can_limit_requests_per_client() {
    let app = app_with(Config::default());

    for request_number in 1..=30 {
        let (status, headers, _) = send(&app, get("/api/to-dos")).await;
        assert_eq!(status, StatusCode::OK, "request {}", request_number);
        assert_eq!(
            headers["ratelimit-remaining"],
            (30 - request_number).to_string().as_str()
        );
    }

    let (status, headers, body) = send(&app, get("/api/to-dos")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers["ratelimit-limit"], "30");
    assert!(headers.contains_key("retry-after"));
    assert_eq!(
        body,
        json!({ "error": "Too many requests, please try again later." })
    );

    tokio::time::advance(std::time::Duration::from_secs(15 * 60)).await;
    let (status, _, _) = send(&app, get("/api/to-dos")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn can_limit_forwarded_clients_separately_behind_proxy() {
    let app = app_with(Config {
        trust_proxy: true,
        rate_limit_max_requests: 1,
        ..Config::default()
    });
    let from = |client: &str| {
        Request::builder()
            .uri("/api/to-dos")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&app, from("203.0.113.1")).await.0, StatusCode::OK);
    assert_eq!(
        send(&app, from("203.0.113.1")).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send(&app, from("203.0.113.2")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn can_allow_listed_origin_in_development() {
    let app = app_with(Config::default());

    let (status, headers, _) = send(&app, with_origin("/api/to-dos", FRONTEND)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["access-control-allow-origin"], FRONTEND);
}

#[tokio::test]
async fn can_answer_preflight_in_development() {
    let app = app_with(Config::default());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/to-dos/add")
        .header("origin", FRONTEND)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["access-control-max-age"], "10");
    assert_eq!(headers["access-control-allow-origin"], FRONTEND);
}

#[tokio::test]
async fn can_reject_unknown_origin_in_development() {
    let app = app_with(Config::default());

    let (status, _, body) = send(&app, with_origin("/api/to-dos", "http://evil.example")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Not allowed by CORS" }));
}

#[tokio::test]
async fn can_leave_unknown_origin_to_browser_when_not_strict() {
    let app = app_with(Config {
        cors_strict_origin: false,
        ..Config::default()
    });

    let (status, headers, _) = send(&app, with_origin("/api/to-dos", "http://evil.example")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!headers.contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn can_delegate_cors_to_gateway_in_production() {
    let app = app_with(Config {
        environment: AppEnv::Production,
        ..Config::default()
    });

    let (status, headers, _) = send(&app, with_origin("/api/to-dos", "http://evil.example")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!headers.contains_key("access-control-allow-origin"));
}
