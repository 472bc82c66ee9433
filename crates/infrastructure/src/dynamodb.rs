use crate::RepositoryError;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::Client;
use shared::Config;
use tracing::error;

/// プロセス全体で共有する DynamoDB クライアント
#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 認証情報は AWS の標準プロバイダチェーンから取得する
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Self::from_client(Client::new(&aws_config), &config.dynamodb_table)
    }

    pub fn from_client(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub(crate) fn convert_error<E>(&self, operation: &'static str, err: E) -> RepositoryError
    where
        E: std::error::Error + 'static,
    {
        let message = DisplayErrorContext(&err).to_string();
        error!(operation, table = %self.table_name, error = %message, "DynamoDB request failed");
        RepositoryError::Backend(message)
    }
}
