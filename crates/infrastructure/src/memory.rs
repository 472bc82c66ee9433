//! 開発・テスト用のインメモリ実装

use crate::{RepositoryError, TodoRepository, UserRepository};
use async_trait::async_trait;
use domain::{first_match, DayWindow, Todo, TodoId, User};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Backend("in-memory store poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryTodoRepository {
    todos: Mutex<Vec<Todo>>,
}

impl InMemoryTodoRepository {
    pub fn len(&self) -> usize {
        self.todos.lock().map(|todos| todos.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError> {
        Ok(lock(&self.todos)?.clone())
    }

    async fn list_created_within(&self, window: DayWindow) -> Result<Vec<Todo>, RepositoryError> {
        Ok(lock(&self.todos)?
            .iter()
            .filter(|todo| window.contains(todo.created_at))
            .cloned()
            .collect())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, RepositoryError> {
        let todos = lock(&self.todos)?;
        Ok(first_match(
            todos.iter().filter(|todo| todo.matches_title(title)).cloned(),
        ))
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        lock(&self.todos)?.push(todo.clone());
        Ok(())
    }

    async fn replace(&self, todo: &Todo) -> Result<Option<Todo>, RepositoryError> {
        let mut todos = lock(&self.todos)?;
        match todos.iter_mut().find(|stored| stored.id == todo.id) {
            Some(stored) => {
                // created_at は作成時の値を保持する
                let created_at = stored.created_at;
                *stored = Todo {
                    created_at,
                    ..todo.clone()
                };
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        let mut todos = lock(&self.todos)?;
        let before = todos.len();
        todos.retain(|todo| &todo.id != id);
        Ok(todos.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = lock(&self.users)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate {
                field: "email",
                value: user.email.clone(),
            });
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Duplicate {
                field: "username",
                value: user.username.clone(),
            });
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users)?
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}
