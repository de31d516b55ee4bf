//! Persistence for users and their todos.
//!
//! Handlers talk to a [`Store`] trait object so the same routes run against
//! MySQL in deployment and against [`MemoryStore`] in tests or the `memory`
//! backend. Every todo operation takes the owning user's id; a todo that
//! belongs to someone else is indistinguishable from one that does not exist.

mod memory;
mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// A registered account. The password is only ever held as a bcrypt hash.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A todo item as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Todo {
    pub id: String,
    pub task: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub user_id: String,
}

/// Which todos a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoFilter {
    All,
    Completed,
    Pending,
}

impl TodoFilter {
    /// The `completed` value rows must have, if any
    pub fn completed(self) -> Option<bool> {
        match self {
            TodoFilter::All => None,
            TodoFilter::Completed => Some(true),
            TodoFilter::Pending => Some(false),
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self.completed() {
            Some(completed) => todo.completed == completed,
            None => true,
        }
    }
}

/// Partial update for a todo; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub task: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn apply(&self, todo: &mut Todo) {
        if let Some(task) = &self.task {
            todo.task = task.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// Current time at the precision MySQL `DATETIME(6)` stores
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Generate a new record id (UUID v4, hyphenated, 36 characters)
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate username)
    #[error("{0}")]
    Conflict(String),

    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backend can serve queries
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new user. Fails with [`StoreError::Conflict`] if the name is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Replace a user's name and password hash.
    async fn update_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    /// Remove a user together with all of their todos, returning the removed user.
    async fn delete_user(&self, id: &str) -> Result<User, StoreError>;

    /// A user's todos in creation order
    async fn list_todos(&self, user_id: &str, filter: TodoFilter) -> Result<Vec<Todo>, StoreError>;

    async fn find_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError>;

    async fn create_todo(&self, user_id: &str, task: &str) -> Result<Todo, StoreError>;

    async fn update_todo(
        &self,
        user_id: &str,
        id: &str,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;

    /// Flip `completed`
    async fn toggle_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError>;

    /// Remove a todo, returning it as it was before deletion
    async fn delete_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError>;
}
