use crate::RepositoryError;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{Todo, TodoId, User, UserId};
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;

/// DynamoDB アイテムのエンティティタイプ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Todo,
    User,
    UsernameClaim,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Todo => "Todo",
            EntityType::User => "User",
            EntityType::UsernameClaim => "UsernameClaim",
        }
    }
}

/// Single Table Design のキー構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String,
    pub sk: String,
}

impl DynamoDbKeys {
    pub fn for_todo(todo_id: &TodoId) -> Self {
        Self {
            pk: format!("TODO#{}", todo_id.as_str()),
            sk: "TODO".to_string(),
        }
    }

    /// ユーザーはメールアドレスをキーに保存し、ログイン時は GetItem 1 回で引ける
    pub fn for_user(email: &str) -> Self {
        Self {
            pk: format!("USER#{email}"),
            sk: "PROFILE".to_string(),
        }
    }

    /// username の一意性を担保するための予約アイテム
    pub fn for_username_claim(username: &str) -> Self {
        Self {
            pk: format!("USERNAME#{username}"),
            sk: "UNIQUE".to_string(),
        }
    }

    pub fn to_key_map(&self) -> Item {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk.clone())),
            ("SK".to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }

    fn into_item(self, entity_type: EntityType) -> Item {
        let mut item = self.to_key_map();
        item.insert(
            "EntityType".to_string(),
            AttributeValue::S(entity_type.as_str().to_string()),
        );
        item
    }
}

/// マイクロ秒精度の RFC 3339（UTC）。文字列比較が時刻順と一致する
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Malformed(format!("timestamp '{raw}': {e}")))
}

pub fn todo_to_item(todo: &Todo) -> Item {
    let mut item = DynamoDbKeys::for_todo(&todo.id).into_item(EntityType::Todo);
    item.insert("id".to_string(), AttributeValue::S(todo.id.as_str().to_string()));
    item.insert("title".to_string(), AttributeValue::S(todo.title.clone()));
    item.insert("title_key".to_string(), AttributeValue::S(todo.title_key()));
    item.insert(
        "description".to_string(),
        AttributeValue::S(todo.description.clone()),
    );
    item.insert("completed".to_string(), AttributeValue::Bool(todo.completed));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(format_timestamp(todo.created_at)),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(format_timestamp(todo.updated_at)),
    );
    item
}

pub fn item_to_todo(item: &Item) -> Result<Todo, RepositoryError> {
    Ok(Todo {
        id: TodoId::from_string(get_s(item, "id")?.to_string()),
        title: get_s(item, "title")?.to_string(),
        description: get_s(item, "description")?.to_string(),
        completed: get_bool(item, "completed")?,
        created_at: parse_timestamp(get_s(item, "created_at")?)?,
        updated_at: parse_timestamp(get_s(item, "updated_at")?)?,
    })
}

pub fn user_to_item(user: &User) -> Item {
    let mut item = DynamoDbKeys::for_user(&user.email).into_item(EntityType::User);
    item.insert("id".to_string(), AttributeValue::S(user.id.as_str().to_string()));
    item.insert("username".to_string(), AttributeValue::S(user.username.clone()));
    item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
    item.insert("password".to_string(), AttributeValue::S(user.password.clone()));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(format_timestamp(user.created_at)),
    );
    item
}

pub fn username_claim_item(user: &User) -> Item {
    let mut item =
        DynamoDbKeys::for_username_claim(&user.username).into_item(EntityType::UsernameClaim);
    item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
    item
}

pub fn item_to_user(item: &Item) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId::from_string(get_s(item, "id")?.to_string()),
        username: get_s(item, "username")?.to_string(),
        email: get_s(item, "email")?.to_string(),
        password: get_s(item, "password")?.to_string(),
        created_at: parse_timestamp(get_s(item, "created_at")?)?,
    })
}

fn get_s<'a>(item: &'a Item, name: &str) -> Result<&'a str, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| RepositoryError::Malformed(format!("missing string attribute '{name}'")))
}

fn get_bool(item: &Item, name: &str) -> Result<bool, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| RepositoryError::Malformed(format!("missing bool attribute '{name}'")))
}
