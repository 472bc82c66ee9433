use std::env;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub dynamodb_table: String,
    /// DynamoDB Local などへの接続先上書き
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を組み立てる（テストでは環境変数を書き換えない）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        // 接続先は必須。ハードコードされた既定値には戻さない
        let dynamodb_table = get("DYNAMODB_TABLE").ok_or(ConfigError::Missing("DYNAMODB_TABLE"))?;

        Ok(Config {
            port,
            dynamodb_table,
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "ap-northeast-1".to_string()),
            environment: get("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
        })
    }
}
