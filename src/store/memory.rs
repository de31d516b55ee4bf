//! In-process store.
//!
//! Keeps users and todos behind a single `RwLock` so multi-step operations
//! (cascade delete, uniqueness checks) are atomic. Todos are kept in insertion
//! order, which is also creation order.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{new_id, now, Store, StoreError, Todo, TodoChanges, TodoFilter, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    todos: Vec<Todo>,
}

impl Inner {
    fn username_taken(&self, username: &str, except_id: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id.as_str()) != except_id)
    }

    fn todo_mut(&mut self, user_id: &str, id: &str) -> Option<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_exists_error() -> StoreError {
    StoreError::Conflict("User already exists".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(username, None) {
            return Err(user_exists_error());
        }

        let created = now();
        let user = User {
            id: new_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: created,
            updated_at: created,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(username, Some(id)) {
            return Err(user_exists_error());
        }

        let user = inner.users.get_mut(id).ok_or(StoreError::NotFound)?;
        user.username = username.to_string();
        user.password_hash = password_hash.to_string();
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.remove(id).ok_or(StoreError::NotFound)?;
        inner.todos.retain(|t| t.user_id != id);
        Ok(user)
    }

    async fn list_todos(&self, user_id: &str, filter: TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .iter()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .cloned()
            .collect())
    }

    async fn find_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn create_todo(&self, user_id: &str, task: &str) -> Result<Todo, StoreError> {
        let mut inner = self.inner.write().await;
        // Mirrors the foreign key on todos.user_id
        if !inner.users.contains_key(user_id) {
            return Err(StoreError::NotFound);
        }

        let created = now();
        let todo = Todo {
            id: new_id(),
            task: task.to_string(),
            completed: false,
            created_at: created,
            updated_at: created,
            user_id: user_id.to_string(),
        };
        inner.todos.push(todo.clone());
        Ok(todo)
    }

    async fn update_todo(
        &self,
        user_id: &str,
        id: &str,
        changes: &TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.todo_mut(user_id, id).map(|todo| {
            changes.apply(todo);
            todo.updated_at = now();
            todo.clone()
        }))
    }

    async fn toggle_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.todo_mut(user_id, id).map(|todo| {
            todo.completed = !todo.completed;
            todo.updated_at = now();
            todo.clone()
        }))
    }

    async fn delete_todo(&self, user_id: &str, id: &str) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.write().await;
        let position = inner
            .todos
            .iter()
            .position(|t| t.id == id && t.user_id == user_id);
        Ok(position.map(|i| inner.todos.remove(i)))
    }
}
