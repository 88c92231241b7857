#![allow(dead_code)]

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ImageExt;
use testcontainers_modules::{localstack, postgres, testcontainers};
use todos_server::config::Config;
use todos_server::todo::{DynamoStore, TodoStore};
use todos_server::web::{AppState, create_app};
use tower::ServiceExt;

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_localstack()
-> anyhow::Result<testcontainers::ContainerAsync<localstack::LocalStack>> {
    let container = localstack::LocalStack::default()
        .with_env_var("SERVICES", "dynamodb")
        .start()
        .await?;
    Ok(container)
}

/// Creates an empty `table_name` table in LocalStack and returns a store on it.
pub async fn setup_dynamo(
    container: &testcontainers::ContainerAsync<localstack::LocalStack>,
    table_name: &str,
) -> anyhow::Result<DynamoStore> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(4566).await?;
    let config = aws_sdk_dynamodb::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(format!("http://{}:{}", host, port))
        .credentials_provider(Credentials::new("test", "test", None, None, "localstack"))
        .build();
    let client = Client::from_conf(config);

    client
        .create_table()
        .table_name(table_name)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("id")
                .key_type(KeyType::Hash)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("id")
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await?;

    Ok(DynamoStore::with_client(client, table_name))
}

/// Opens a fresh in-memory SQLite database with migrations applied.
pub async fn setup_sqlite() -> anyhow::Result<DatabaseConnection> {
    // Every pooled connection would open its own empty in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Builds the full application, middleware included, around `store`.
pub fn create_test_app(config: Config, store: Arc<dyn TodoStore>) -> Router {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    create_app(AppState::new(config, store))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends a request and returns status, headers and the body as JSON.
/// Bodies that are not JSON come back as a JSON string.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, headers, body)
}
