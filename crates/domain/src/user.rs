use crate::credentials::CredentialPolicy;
use crate::errors::DomainError;
use crate::todo::storage_precision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const ENTITY: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 登録済みユーザー。`password` はポリシーで変換済みの値を保持する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl User {
    pub fn register(
        input: NewUser,
        policy: &dyn CredentialPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let username = required("username", input.username)?;
        let email = required("email", input.email)?;
        let password = required("password", input.password)?;

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            password: policy.seal(&password),
            created_at: storage_precision(now),
        })
    }

    pub fn verify_password(&self, supplied: &str, policy: &dyn CredentialPolicy) -> bool {
        policy.verify(&self.password, supplied)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::required(ENTITY, field)),
    }
}
