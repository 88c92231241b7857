use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::todo::{StoreError, Todo, TodoInput, TodoStore};

/// Process-local store that keeps to-dos in insertion order.
///
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    todos: Mutex<Vec<Todo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with a few example to-dos.
    pub fn with_sample_todos() -> Self {
        let samples = [
            ("To Do Title", "To Do Description"),
            ("To Do Title 2", ""),
            ("To Do Title 3", "To Do Description 3"),
        ];
        let todos = samples
            .into_iter()
            .map(|(title, description)| {
                Todo::new(new_id(), title.to_string(), description.to_string())
            })
            .collect();
        Self {
            todos: Mutex::new(todos),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl TodoStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.todos.lock().await.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, input: TodoInput) -> Result<Todo, StoreError> {
        let todo = Todo::new(new_id(), input.title, input.description);
        self.todos.lock().await.push(todo.clone());
        Ok(todo)
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: &str, input: TodoInput) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.lock().await;
        let Some(todo) = todos.iter_mut().find(|todo| todo.id == id) else {
            return Ok(None);
        };
        todo.title = input.title;
        todo.description = input.description;
        Ok(Some(todo.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.lock().await;
        let removed = todos
            .iter()
            .position(|todo| todo.id == id)
            .map(|index| todos.remove(index));
        Ok(removed)
    }
}
