//! HTTP API（axum）
//!
//! `/api/todos` と `/api/users` を提供します。永続化はリポジトリ経由で
//! 注入されるため、テストではインメモリ実装に差し替えられます。

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use domain::{CredentialPolicy, PlaintextCredentials};
use infrastructure::{InMemoryTodoRepository, InMemoryUserRepository, TodoRepository, UserRepository};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;

pub use error::ApiError;

use handlers::{todos, users};

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub todos: Arc<dyn TodoRepository>,
    pub users: Arc<dyn UserRepository>,
    pub credentials: Arc<dyn CredentialPolicy>,
}

impl AppState {
    /// 平文の資格情報ポリシーで状態を組み立てる
    pub fn new(todos: Arc<dyn TodoRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            todos,
            users,
            credentials: Arc::new(PlaintextCredentials),
        }
    }

    /// 開発/テスト用
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTodoRepository::default()),
            Arc::new(InMemoryUserRepository::default()),
        )
    }
}

/// ルータを構築して返します。全レスポンスに許可的な CORS ヘッダを付与します。
pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/date/:date", get(todos::todos_by_date))
        .route(
            "/todos/title/:title",
            get(todos::todo_by_title)
                .patch(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// ヘルスチェック用ハンドラ
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthBody { status: "ok" }))
}
