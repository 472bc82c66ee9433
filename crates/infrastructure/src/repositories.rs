use crate::RepositoryError;
use async_trait::async_trait;
use domain::{DayWindow, Todo, TodoId, User};

/// Todo コレクションへのアクセス
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// 全件取得（順序は保証しない）
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError>;

    /// `created_at` が `[window.start, window.end)` に入るものを取得
    async fn list_created_within(&self, window: DayWindow) -> Result<Vec<Todo>, RepositoryError>;

    /// 大文字小文字を区別しないタイトル完全一致。複数ある場合は `domain::first_match` の規則で 1 件選ぶ
    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, RepositoryError>;

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError>;

    /// 既存ドキュメントを上書きする。対象が既に存在しなければ `None`
    async fn replace(&self, todo: &Todo) -> Result<Option<Todo>, RepositoryError>;

    /// 削除できた場合は `true`
    async fn remove(&self, id: &TodoId) -> Result<bool, RepositoryError>;
}

/// User コレクションへのアクセス
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `username` / `email` が既に使われている場合は `RepositoryError::Duplicate`
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
}
