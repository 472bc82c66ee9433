use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::DomainError;
use infrastructure::RepositoryError;
use serde_json::json;
use thiserror::Error;

pub const TODO_NOT_FOUND: &str = "Todo not found";

/// HTTP レスポンスへ変換されるエラー。本文は `{"message": ...}` のフラットな JSON
#[derive(Debug, Error)]
pub enum ApiError {
    /// 必須フィールド欠落・一意制約違反・不正な本文 (400)
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(&'static str),

    /// 未登録のメールアドレスとパスワード不一致を区別しない (400)
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Internal(String),

    /// 削除処理の失敗。`{"message": "Server error", "error": ...}` を返す (500)
    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn server(err: impl Into<ApiError>) -> Self {
        match err.into() {
            ApiError::Internal(message) => ApiError::Server(message),
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                json!({ "message": self.to_string() }),
            ),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": message }),
                )
            }
            ApiError::Server(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Server error", "error": message }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation { .. } => ApiError::Validation(e.to_string()),
            // 日付の解釈失敗はクエリ失敗と同じ扱い (500)
            DomainError::InvalidDate(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Duplicate { .. } => ApiError::Validation(e.to_string()),
            RepositoryError::Malformed(_) | RepositoryError::Backend(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
