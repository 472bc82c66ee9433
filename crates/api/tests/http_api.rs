use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use domain::{NewTodo, Todo};
use infrastructure::{InMemoryTodoRepository, InMemoryUserRepository, TodoRepository};
use serde_json::{json, Value};
use std::sync::Arc;
use todo_api::{app_with_state, AppState};
use tower::ServiceExt; // for `oneshot`

struct TestApp {
    router: Router,
    todos: Arc<InMemoryTodoRepository>,
}

impl TestApp {
    fn new() -> Self {
        let todos = Arc::new(InMemoryTodoRepository::default());
        let state = AppState::new(todos.clone(), Arc::new(InMemoryUserRepository::default()));
        Self {
            router: app_with_state(state),
            todos,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(&self, title: &str) -> Value {
        let (status, json) = self
            .send(
                "POST",
                "/api/todos",
                Some(json!({ "title": title, "description": "テスト用" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json
    }

    /// `created_at` を指定して直接保存する
    async fn seed(&self, title: &str, created_at: DateTime<Utc>) {
        let todo = Todo::create(
            NewTodo {
                title: Some(title.to_string()),
                description: Some("seed".to_string()),
                completed: None,
            },
            created_at,
        )
        .unwrap();
        self.todos.insert(&todo).await.unwrap();
    }
}

fn timestamp(json: &Value, field: &str) -> DateTime<Utc> {
    json[field].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn get_health_returns_ok() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_todo_returns_201_and_defaults_completed() {
    // Arrange
    let app = TestApp::new();

    // Act
    let (status, json) = app
        .send(
            "POST",
            "/api/todos",
            Some(json!({ "title": "Buy Milk", "description": "2 litres" })),
        )
        .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["title"], "Buy Milk");
    assert_eq!(json["description"], "2 litres");
    assert_eq!(json["completed"], false);
    assert!(json["id"].is_string());
    assert_eq!(json["created_at"], json["updated_at"]);
    assert_eq!(app.todos.len(), 1);
}

#[tokio::test]
async fn create_todo_honours_completed_flag() {
    let app = TestApp::new();

    let (status, json) = app
        .send(
            "POST",
            "/api/todos",
            Some(json!({ "title": "Done", "description": "d", "completed": true })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["completed"], true);
}

#[tokio::test]
async fn create_todo_without_required_fields_returns_400() {
    let app = TestApp::new();

    for body in [
        json!({ "description": "no title" }),
        json!({ "title": "no description" }),
        json!({ "title": "", "description": "empty title" }),
    ] {
        let (status, json) = app.send("POST", "/api/todos", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("is required"));
    }
    assert!(app.todos.is_empty());
}

#[tokio::test]
async fn create_todo_with_malformed_body_returns_400() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/todos")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_returns_every_created_todo() {
    let app = TestApp::new();
    for title in ["A", "B", "C"] {
        app.create(title).await;
    }

    let (status, json) = app.send("GET", "/api/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 3);
    for title in ["A", "B", "C"] {
        assert!(titles.contains(&title));
    }
}

#[tokio::test]
async fn list_on_empty_collection_is_an_empty_array() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/api/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn filter_by_date_returns_only_that_day() {
    // Arrange: 境界をまたぐ 4 件
    let app = TestApp::new();
    app.seed("before", Utc.with_ymd_and_hms(2024, 1, 14, 23, 59, 59).unwrap())
        .await;
    app.seed("midnight", Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        .await;
    app.seed("evening", Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap())
        .await;
    app.seed("next day", Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap())
        .await;

    // Act
    let (status, json) = app.send("GET", "/api/todos/date/2024-01-15", None).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["evening", "midnight"]);
}

#[tokio::test]
async fn filter_by_date_without_matches_returns_404() {
    let app = TestApp::new();
    app.seed("other day", Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap())
        .await;

    let (status, json) = app.send("GET", "/api/todos/date/2024-01-15", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "No todos found for this date");
}

#[tokio::test]
async fn filter_by_malformed_date_returns_500() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/api/todos/date/yesterday", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Invalid date: yesterday");
}

#[tokio::test]
async fn get_by_title_ignores_case() {
    let app = TestApp::new();
    app.create("Buy Milk").await;

    let (status, json) = app.send("GET", "/api/todos/title/buy%20milk", None).await;
    let (missing, body) = app.send("GET", "/api/todos/title/buy", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Buy Milk");
    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cannot find todo");
}

#[tokio::test]
async fn update_unknown_title_returns_404() {
    let app = TestApp::new();

    let (status, json) = app
        .send(
            "PATCH",
            "/api/todos/title/nothing",
            Some(json!({ "completed": true })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Todo not found");
}

#[tokio::test]
async fn update_without_body_on_unknown_title_returns_404() {
    let app = TestApp::new();

    let (status, json) = app.send("PATCH", "/api/todos/title/nothing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Todo not found");
}

#[tokio::test]
async fn update_without_body_keeps_fields_and_refreshes_updated_at() {
    let app = TestApp::new();
    let created = app.create("Buy Milk").await;

    let (status, json) = app.send("PATCH", "/api/todos/title/Buy%20Milk", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);
    assert_eq!(json["title"], "Buy Milk");
    assert_eq!(json["completed"], false);
    assert!(timestamp(&json, "updated_at") > timestamp(&created, "updated_at"));
}

#[tokio::test]
async fn update_with_malformed_body_returns_400() {
    let app = TestApp::new();
    app.create("Buy Milk").await;
    let request = Request::builder()
        .method("PATCH")
        .uri("/api/todos/title/Buy%20Milk")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_existing_title_in_any_case_refreshes_updated_at() {
    // Arrange
    let app = TestApp::new();
    let created = app.create("Buy Milk").await;

    // Act
    let (status, json) = app
        .send(
            "PATCH",
            "/api/todos/title/BUY%20MILK",
            Some(json!({ "completed": true })),
        )
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);
    assert_eq!(json["completed"], true);
    assert_eq!(json["title"], "Buy Milk");
    assert_eq!(json["description"], created["description"]);
    assert_eq!(json["created_at"], created["created_at"]);
    assert!(timestamp(&json, "updated_at") > timestamp(&created, "updated_at"));
}

#[tokio::test]
async fn update_can_rename_and_new_title_is_searchable() {
    let app = TestApp::new();
    app.create("Buy Milk").await;

    let (status, _) = app
        .send(
            "PATCH",
            "/api/todos/title/buy%20milk",
            Some(json!({ "title": "Buy Oat Milk" })),
        )
        .await;
    let (old, _) = app.send("GET", "/api/todos/title/buy%20milk", None).await;
    let (new, json) = app.send("GET", "/api/todos/title/buy%20oat%20milk", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(old, StatusCode::NOT_FOUND);
    assert_eq!(new, StatusCode::OK);
    assert_eq!(json["title"], "Buy Oat Milk");
}

#[tokio::test]
async fn update_with_empty_field_returns_400_and_keeps_document() {
    let app = TestApp::new();
    app.create("Buy Milk").await;

    let (status, json) = app
        .send(
            "PATCH",
            "/api/todos/title/buy%20milk",
            Some(json!({ "description": "" })),
        )
        .await;
    let (_, stored) = app.send("GET", "/api/todos/title/buy%20milk", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Todo validation failed: description is required");
    assert_eq!(stored["description"], "テスト用");
}

#[tokio::test]
async fn update_with_wrong_field_type_returns_400() {
    let app = TestApp::new();
    app.create("Buy Milk").await;

    let (status, _) = app
        .send(
            "PATCH",
            "/api/todos/title/buy%20milk",
            Some(json!({ "completed": "yes" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_with_duplicate_titles_targets_the_oldest() {
    let app = TestApp::new();
    app.seed("Dup", Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        .await;
    app.seed("dup", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .await;

    let (status, json) = app
        .send("PATCH", "/api/todos/title/DUP", Some(json!({ "completed": true })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "dup");
    assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn delete_removes_one_then_returns_404() {
    // Arrange: 同じタイトルを 2 件
    let app = TestApp::new();
    app.create("Walk dog").await;
    app.create("walk dog").await;

    // Act
    let (first, json) = app.send("DELETE", "/api/todos/title/Walk%20Dog", None).await;

    // Assert
    assert_eq!(first, StatusCode::OK);
    assert_eq!(json["message"], "Todo deleted successfully");
    assert_eq!(app.todos.len(), 1);

    let (second, _) = app.send("DELETE", "/api/todos/title/walk%20dog", None).await;
    assert_eq!(second, StatusCode::OK);
    let (third, json) = app.send("DELETE", "/api/todos/title/walk%20dog", None).await;
    assert_eq!(third, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Todo not found");
    assert!(app.todos.is_empty());
}

#[tokio::test]
async fn register_returns_201_with_user_document() {
    let app = TestApp::new();

    let (status, json) = app
        .send(
            "POST",
            "/api/users/register",
            Some(json!({ "username": "alice", "email": "alice@example.com", "password": "hunter2" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["email"], "alice@example.com");
    assert!(json["id"].is_string());
    assert!(json["created_at"].is_string());
}

#[tokio::test]
async fn register_duplicate_email_or_username_returns_400() {
    let app = TestApp::new();
    let (first, _) = app
        .send(
            "POST",
            "/api/users/register",
            Some(json!({ "username": "alice", "email": "alice@example.com", "password": "a" })),
        )
        .await;
    assert_eq!(first, StatusCode::CREATED);

    let (same_email, json) = app
        .send(
            "POST",
            "/api/users/register",
            Some(json!({ "username": "bob", "email": "alice@example.com", "password": "b" })),
        )
        .await;
    let (same_name, _) = app
        .send(
            "POST",
            "/api/users/register",
            Some(json!({ "username": "alice", "email": "other@example.com", "password": "c" })),
        )
        .await;

    assert_eq!(same_email, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("email"));
    assert_eq!(same_name, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_missing_field_returns_400() {
    let app = TestApp::new();

    let (status, json) = app
        .send(
            "POST",
            "/api/users/register",
            Some(json!({ "username": "alice", "email": "alice@example.com" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "User validation failed: password is required");
}

#[tokio::test]
async fn login_succeeds_with_matching_credentials() {
    let app = TestApp::new();
    app.send(
        "POST",
        "/api/users/register",
        Some(json!({ "username": "alice", "email": "alice@example.com", "password": "hunter2" })),
    )
    .await;

    let (status, json) = app
        .send(
            "POST",
            "/api/users/login",
            Some(json!({ "email": "alice@example.com", "password": "hunter2" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Login successful");
    assert_eq!(json["user"]["username"], "alice");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.send(
        "POST",
        "/api/users/register",
        Some(json!({ "username": "alice", "email": "alice@example.com", "password": "hunter2" })),
    )
    .await;

    let (wrong_password, wrong_body) = app
        .send(
            "POST",
            "/api/users/login",
            Some(json!({ "email": "alice@example.com", "password": "hunter3" })),
        )
        .await;
    let (unknown_email, unknown_body) = app
        .send(
            "POST",
            "/api/users/login",
            Some(json!({ "email": "bob@example.com", "password": "hunter2" })),
        )
        .await;
    let (missing, missing_body) = app
        .send(
            "POST",
            "/api/users/login",
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;

    assert_eq!(wrong_password, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email, StatusCode::BAD_REQUEST);
    assert_eq!(missing, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_body, json!({ "message": "Invalid credentials" }));
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body, missing_body);
}

#[tokio::test]
async fn login_with_malformed_or_missing_body_returns_invalid_credentials() {
    let app = TestApp::new();
    let malformed = Request::builder()
        .method("POST")
        .uri("/api/users/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(malformed).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let (no_body, no_body_json) = app.send("POST", "/api/users/login", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::from_slice::<Value>(&bytes).unwrap(),
        json!({ "message": "Invalid credentials" })
    );
    assert_eq!(no_body, StatusCode::BAD_REQUEST);
    assert_eq!(no_body_json, json!({ "message": "Invalid credentials" }));
}

#[tokio::test]
async fn responses_carry_permissive_cors_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("GET")
        .uri("/api/todos")
        .header("origin", "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn preflight_options_is_allowed_for_any_origin_and_method() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/todos/title/Buy%20Milk")
        .header("origin", "http://example.com")
        .header("access-control-request-method", "PATCH")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "*");
    assert_eq!(headers["access-control-allow-headers"], "*");
}

#[tokio::test]
async fn state_can_be_built_in_memory() {
    let app = app_with_state(AppState::in_memory());
    let request = Request::builder()
        .method("GET")
        .uri("/api/todos")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
