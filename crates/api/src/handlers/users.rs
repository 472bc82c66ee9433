use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use domain::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<RegisterRequest> for NewUser {
    fn from(req: RegisterRequest) -> Self {
        NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: User,
}

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload?;
    let user = User::register(req.into(), state.credentials.as_ref(), Utc::now())?;
    state.users.insert(&user).await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    // 本文の不備も他のログイン失敗と同じ応答にする
    let Json(req) = payload.map_err(|_| ApiError::InvalidCredentials)?;
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::InvalidCredentials);
    };

    match state.users.find_by_email(&email).await? {
        Some(user) if user.verify_password(&password, state.credentials.as_ref()) => {
            info!(user_id = %user.id, "Login succeeded");
            Ok(Json(LoginResponse {
                message: "Login successful",
                user,
            }))
        }
        _ => {
            debug!("Login rejected");
            Err(ApiError::InvalidCredentials)
        }
    }
}
