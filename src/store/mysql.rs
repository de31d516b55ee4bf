//! MySQL store backed by a `sqlx` connection pool.
//!
//! Schema migrations live in `migrations/` and are embedded into the binary.
//! Timestamps are written by the application so both backends agree on them.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, Transaction};
use std::time::Duration;

use super::{new_id, now, Store, StoreError, Todo, TodoChanges, TodoFilter, User};
use crate::config::DatabaseConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str = "id, username, password, created_at, updated_at";
const TODO_COLUMNS: &str = "id, task, completed, created_at, updated_at, user_id";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Open a connection pool. Fails if the server cannot be reached within
    /// the configured acquire timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(config.url())
            .await?;
        Ok(Self { pool })
    }

    /// Apply any pending schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn todo_in_tx(
        tx: &mut Transaction<'_, MySql>,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ? FOR UPDATE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(todo)
    }

    async fn write_todo(tx: &mut Transaction<'_, MySql>, todo: &Todo) -> Result<(), StoreError> {
        sqlx::query("UPDATE todos SET task = ?, completed = ?, updated_at = ? WHERE id = ?")
            .bind(&todo.task)
            .bind(todo.completed)
            .bind(todo.updated_at)
            .bind(&todo.id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Map a unique-key violation onto [`StoreError::Conflict`]
fn conflict_on_duplicate(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict("User already exists".to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let created = now();
        let user = User {
            id: new_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: created,
            updated_at: created,
        };

        sqlx::query(
            "INSERT INTO users (id, username, password, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_duplicate)?;

        Ok(user)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        user.username = username.to_string();
        user.password_hash = password_hash.to_string();
        user.updated_at = now();

        sqlx::query("UPDATE users SET username = ?, password = ?, updated_at = ? WHERE id = ?")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.updated_at)
            .bind(&user.id)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_duplicate)?;

        tx.commit().await?;
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        // The foreign key cascades too; deleting explicitly keeps this
        // correct on schemas created before the constraint existed.
        sqlx::query("DELETE FROM todos WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn list_todos(&self, user_id: &str, filter: TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let todos = match filter.completed() {
            Some(completed) => {
                sqlx::query_as::<_, Todo>(&format!(
                    "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? AND completed = ? \
                     ORDER BY created_at, id"
                ))
                .bind(user_id)
                .bind(completed)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Todo>(&format!(
                    "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? ORDER BY created_at, id"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(todos)
    }

    async fn find_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    async fn create_todo(&self, user_id: &str, task: &str) -> Result<Todo, StoreError> {
        let created = now();
        let todo = Todo {
            id: new_id(),
            task: task.to_string(),
            completed: false,
            created_at: created,
            updated_at: created,
            user_id: user_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO todos (id, task, completed, created_at, updated_at, user_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&todo.id)
        .bind(&todo.task)
        .bind(todo.completed)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .bind(&todo.user_id)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
            _ => StoreError::Database(err),
        })?;

        Ok(todo)
    }

    async fn update_todo(
        &self,
        user_id: &str,
        id: &str,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut todo) = Self::todo_in_tx(&mut tx, user_id, id).await? else {
            return Ok(None);
        };

        changes.apply(&mut todo);
        todo.updated_at = now();
        Self::write_todo(&mut tx, &todo).await?;

        tx.commit().await?;
        Ok(Some(todo))
    }

    async fn toggle_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut todo) = Self::todo_in_tx(&mut tx, user_id, id).await? else {
            return Ok(None);
        };

        todo.completed = !todo.completed;
        todo.updated_at = now();
        Self::write_todo(&mut tx, &todo).await?;

        tx.commit().await?;
        Ok(Some(todo))
    }

    async fn delete_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(todo) = Self::todo_in_tx(&mut tx, user_id, id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(&todo.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(todo))
    }
}
