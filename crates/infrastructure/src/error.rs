use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 一意制約違反
    #[error("duplicate key: {field} '{value}' already exists")]
    Duplicate { field: &'static str, value: String },

    /// 保存済みアイテムを復元できない
    #[error("malformed item: {0}")]
    Malformed(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
