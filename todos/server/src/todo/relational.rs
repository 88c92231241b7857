use async_trait::async_trait;
use migration::MigratorTrait;
use sea_orm::*;

use crate::entities::*;
use crate::todo::{StoreError, Todo, TodoInput, TodoStore};

/// Owner assigned to every to-do until users exist.
pub const DEFAULT_USER_ID: i32 = 1;

/// Store backed by the `todos` table of a relational database.
///
/// This backend has no update operation; `update` always reports
/// [`StoreError::Unsupported`].
pub struct RelationalStore {
    db: DatabaseConnection,
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(model.id.to_string(), model.title, model.description).with_user_id(model.user_id)
    }
}

impl RelationalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects to the database at `db_url` and applies pending migrations.
    #[tracing::instrument(skip(db_url))]
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        let db = Database::connect(db_url).await?;
        migration::Migrator::up(&db, None).await?;
        tracing::info!("Database migrations applied successfully");
        Ok(Self::new(db))
    }
}

/// Parses a path identifier into a primary key; anything else cannot match a row.
fn parse_id(id: &str) -> Option<i32> {
    id.parse().ok()
}

#[async_trait]
impl TodoStore for RelationalStore {
    fn backend(&self) -> &'static str {
        "relational"
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let todos = todo::Entity::find()
            .order_by_asc(todo::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, input: TodoInput) -> Result<Todo, StoreError> {
        let active_model = todo::ActiveModel {
            title: ActiveValue::Set(input.title),
            description: ActiveValue::Set(input.description),
            user_id: ActiveValue::Set(DEFAULT_USER_ID),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        Ok(Todo::from(created_model))
    }

    async fn update(&self, _id: &str, _input: TodoInput) -> Result<Option<Todo>, StoreError> {
        Err(StoreError::Unsupported {
            backend: self.backend(),
            operation: "update",
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<Option<Todo>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let Some(todo_to_delete) = todo::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let result = todo::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        Ok(Some(Todo::from(todo_to_delete)))
    }
}
