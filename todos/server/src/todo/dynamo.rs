//! Key-value store backed by a DynamoDB table.
//!
//! # Table Schema
//!
//! - Partition Key: `id` (String)
//! - Attributes:
//!   - `title` (String)
//!   - `description` (String)
//!   - `createdAt` (Number): epoch milliseconds, used to order listings
//!
//! DynamoDB scans come back in no particular order, so listings are sorted by
//! `createdAt` after the scan completes.

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    operation::update_item::UpdateItemError,
    types::{AttributeValue, ReturnValue},
};
use std::collections::HashMap;

use crate::todo::{StoreError, Todo, TodoInput, TodoStore};

const ID_ATTRIBUTE: &str = "id";
const TITLE_ATTRIBUTE: &str = "title";
const DESCRIPTION_ATTRIBUTE: &str = "description";
const CREATED_AT_ATTRIBUTE: &str = "createdAt";

type Item = HashMap<String, AttributeValue>;

pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl DynamoStore {
    /// Creates a store using the default AWS configuration chain
    /// (environment, profile files, instance metadata).
    pub async fn new(table_name: impl Into<String>, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let aws_config = loader.load().await;
        Self::with_client(Client::new(&aws_config), table_name)
    }

    pub fn with_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn string_attribute<'a>(item: &'a Item, name: &str) -> Result<&'a str, StoreError> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value),
        _ => Err(StoreError::MalformedItem(format!(
            "missing string attribute '{}'",
            name
        ))),
    }
}

/// Decodes a table item into a to-do.
///
/// `description` may be absent; `createdAt` must be a number when present.
fn todo_from_item(item: &Item) -> Result<Todo, StoreError> {
    let id = string_attribute(item, ID_ATTRIBUTE)?;
    let title = string_attribute(item, TITLE_ATTRIBUTE)?;
    let description = match item.get(DESCRIPTION_ATTRIBUTE) {
        Some(AttributeValue::S(description)) => description.clone(),
        _ => String::new(),
    };

    let todo = Todo::new(id.to_string(), title.to_string(), description);
    match item.get(CREATED_AT_ATTRIBUTE) {
        Some(AttributeValue::N(created_at)) => {
            let created_at = created_at.parse::<i64>().map_err(|e| {
                StoreError::MalformedItem(format!("invalid '{}': {}", CREATED_AT_ATTRIBUTE, e))
            })?;
            Ok(todo.with_created_at(created_at))
        }
        Some(_) => Err(StoreError::MalformedItem(format!(
            "'{}' is not a number",
            CREATED_AT_ATTRIBUTE
        ))),
        None => Ok(todo),
    }
}

/// Decodes scanned items and orders them by creation time, oldest first.
fn todos_from_scan(items: &[Item]) -> Result<Vec<Todo>, StoreError> {
    let mut todos = items
        .iter()
        .map(todo_from_item)
        .collect::<Result<Vec<_>, _>>()?;
    todos.sort_by_key(|todo| todo.created_at());
    Ok(todos)
}

fn item_from_todo(todo: &Todo) -> Item {
    let mut item = HashMap::new();
    item.insert(
        ID_ATTRIBUTE.to_string(),
        AttributeValue::S(todo.id().to_string()),
    );
    item.insert(
        TITLE_ATTRIBUTE.to_string(),
        AttributeValue::S(todo.title().to_string()),
    );
    item.insert(
        DESCRIPTION_ATTRIBUTE.to_string(),
        AttributeValue::S(todo.description().to_string()),
    );
    if let Some(created_at) = todo.created_at() {
        item.insert(
            CREATED_AT_ATTRIBUTE.to_string(),
            AttributeValue::N(created_at.to_string()),
        );
    }
    item
}

#[async_trait]
impl TodoStore for DynamoStore {
    fn backend(&self) -> &'static str {
        "dynamodb"
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name))]
    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| StoreError::KeyValue(format!("scan failed: {}", e)))?;

            items.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        todos_from_scan(&items)
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name))]
    async fn create(&self, input: TodoInput) -> Result<Todo, StoreError> {
        let todo = Todo::new(
            uuid::Uuid::new_v4().to_string(),
            input.title,
            input.description,
        )
        .with_created_at(now_millis());

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_todo(&todo)))
            .send()
            .await
            .map_err(|e| StoreError::KeyValue(format!("put failed: {}", e)))?;

        Ok(todo)
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name))]
    async fn update(&self, id: &str, input: TodoInput) -> Result<Option<Todo>, StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .update_expression("SET #title = :title, #description = :description")
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .expression_attribute_names("#title", TITLE_ATTRIBUTE)
            .expression_attribute_names("#description", DESCRIPTION_ATTRIBUTE)
            .expression_attribute_values(":title", AttributeValue::S(input.title))
            .expression_attribute_values(":description", AttributeValue::S(input.description))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes.as_ref().map(todo_from_item).transpose(),
            Err(e) => match e.into_service_error() {
                UpdateItemError::ConditionalCheckFailedException(_) => Ok(None),
                other => Err(StoreError::KeyValue(format!("update failed: {}", other))),
            },
        }
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name))]
    async fn delete(&self, id: &str) -> Result<Option<Todo>, StoreError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| StoreError::KeyValue(format!("delete failed: {}", e)))?;

        output.attributes.as_ref().map(todo_from_item).transpose()
    }
}
