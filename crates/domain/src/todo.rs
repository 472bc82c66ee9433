use crate::errors::DomainError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const ENTITY: &str = "Todo";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
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

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Todo 作成時の入力（欠落フィールドは `None`）
#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// 部分更新。`None` のフィールドは既存の値を保持する
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl Todo {
    /// 入力を検証して新しい Todo を生成する。
    /// `created_at` と `updated_at` は同じ時刻で初期化される。
    pub fn create(input: NewTodo, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let title = required("title", input.title)?;
        let description = required("description", input.description)?;
        let now = storage_precision(now);

        Ok(Self {
            id: TodoId::new(),
            title,
            description,
            completed: input.completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// パッチを適用し、結合後のドキュメントを再検証する。
    /// 検証に失敗した場合は自身を変更しない。
    pub fn apply_patch(&mut self, patch: TodoPatch, now: DateTime<Utc>) -> Result<(), DomainError> {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = title;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(completed) = patch.completed {
            next.completed = completed;
        }
        next.validate()?;
        next.touch(now);

        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.is_empty() {
            return Err(DomainError::required(ENTITY, "title"));
        }
        if self.description.is_empty() {
            return Err(DomainError::required(ENTITY, "description"));
        }
        Ok(())
    }

    /// `updated_at` を更新する。時計の分解能内で連続しても必ず前の値より大きくなる。
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let now = storage_precision(now);
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    pub fn title_key(&self) -> String {
        title_key(&self.title)
    }

    pub fn matches_title(&self, title: &str) -> bool {
        self.title_key() == title_key(title)
    }
}

/// タイトル検索用の正規化キー（大文字小文字を区別しない完全一致）
pub fn title_key(title: &str) -> String {
    title.to_lowercase()
}

/// 同一タイトルが複数ある場合の決定的な選択: `created_at` が最も古いもの、次に `id` が最小のもの
pub fn first_match<I>(candidates: I) -> Option<Todo>
where
    I: IntoIterator<Item = Todo>,
{
    candidates
        .into_iter()
        .min_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
}

/// 保存時の精度（マイクロ秒）に丸める
pub fn storage_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// 日付フィルタの半開区間 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// `YYYY-MM-DD`（UTC 0 時）または RFC 3339 のタイムスタンプを受け付ける。
    /// 区間は 0000 年から 9999 年の範囲に収まらなければならない
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let start = if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            date.and_hms_opt(0, 0, 0)
                .ok_or_else(|| DomainError::InvalidDate(raw.to_string()))?
                .and_utc()
        } else {
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| DomainError::InvalidDate(raw.to_string()))?
                .with_timezone(&Utc)
        };

        let window = Self::starting_at(start);
        // 保存形式の文字列比較は 4 桁の年でのみ時刻順と一致する
        if window.start.year() < 0 || window.end.year() > 9999 {
            return Err(DomainError::InvalidDate(raw.to_string()));
        }
        Ok(window)
    }

    /// `start` は保存時の精度に丸める
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        let start = storage_precision(start);
        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::required(ENTITY, field)),
    }
}
