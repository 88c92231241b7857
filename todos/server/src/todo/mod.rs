use async_trait::async_trait;

pub mod api;
pub mod dynamo;
pub mod memory;
pub mod relational;
pub mod validation;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;
pub use relational::RelationalStore;

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: String,
    title: String,
    description: String,
    created_at: Option<i64>,
    user_id: Option<i32>,
}

impl Todo {
    pub fn new(id: String, title: String, description: String) -> Self {
        Self {
            id,
            title,
            description,
            created_at: None,
            user_id: None,
        }
    }

    /// Sets the creation timestamp, in epoch milliseconds.
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the owning user.
    pub fn with_user_id(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns the identifier of the to-do.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, empty when none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the creation timestamp in epoch milliseconds, if the backend records one.
    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    /// Returns the owning user, if the backend records one.
    pub fn user_id(&self) -> Option<i32> {
        self.user_id
    }
}

/// Title and description that passed validation and are ready to be persisted.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct TodoInput {
    pub title: String,
    pub description: String,
}

impl TodoInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Error type for TodoStore operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Represents a relational database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a failed call to the key-value table.
    #[error("Key-value store error: {0}")]
    KeyValue(String),
    /// Represents an item in the key-value table that does not look like a to-do.
    #[error("Malformed item: {0}")]
    MalformedItem(String),
    /// The backend does not implement the requested operation.
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// Persistence backend for to-dos.
///
/// `update` and `delete` return `Ok(None)` when no record has the given id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Returns every to-do in the backend's listing order.
    async fn list(&self) -> Result<Vec<Todo>, StoreError>;

    /// Persists a new to-do and returns it with its assigned identifier.
    async fn create(&self, input: TodoInput) -> Result<Todo, StoreError>;

    /// Replaces title and description and returns the updated to-do.
    async fn update(&self, id: &str, input: TodoInput) -> Result<Option<Todo>, StoreError>;

    /// Removes a to-do and returns it as it was before removal.
    async fn delete(&self, id: &str) -> Result<Option<Todo>, StoreError>;
}
