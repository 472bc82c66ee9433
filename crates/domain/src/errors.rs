use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 必須フィールドの欠落や空文字など、スキーマレベルの検証失敗
    #[error("{entity} validation failed: {field} is required")]
    Validation {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl DomainError {
    pub fn required(entity: &'static str, field: &'static str) -> Self {
        Self::Validation { entity, field }
    }
}
