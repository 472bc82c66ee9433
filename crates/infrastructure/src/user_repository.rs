use crate::{
    item_to_user, user_to_item, username_claim_item, DynamoDbClient, DynamoDbKeys,
    RepositoryError, UserRepository,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{Put, TransactWriteItem};
use domain::User;
use tracing::{debug, info};

/// DynamoDB 上の User コレクション
#[derive(Clone)]
pub struct DynamoUserRepository {
    db: DynamoDbClient,
}

impl DynamoUserRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }

    fn conditional_put(&self, item: crate::Item) -> Result<TransactWriteItem, RepositoryError> {
        let put = Put::builder()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(PK)")
            .build()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(TransactWriteItem::builder().put(put).build())
    }
}

#[async_trait]
impl UserRepository for DynamoUserRepository {
    /// ユーザー本体（email キー）と username 予約を 1 トランザクションで書き込む
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let result = self
            .db
            .client()
            .transact_write_items()
            .transact_items(self.conditional_put(user_to_item(user))?)
            .transact_items(self.conditional_put(username_claim_item(user))?)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(user_id = %user.id, "User registered");
                Ok(())
            }
            Err(err) => {
                if let Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) =
                    err.as_service_error()
                {
                    // 理由の並びは transact_items の順（0: email, 1: username）
                    let failed = |index: usize| {
                        cancelled
                            .cancellation_reasons()
                            .get(index)
                            .and_then(|reason| reason.code())
                            == Some("ConditionalCheckFailed")
                    };
                    if failed(0) {
                        return Err(RepositoryError::Duplicate {
                            field: "email",
                            value: user.email.clone(),
                        });
                    }
                    if failed(1) {
                        return Err(RepositoryError::Duplicate {
                            field: "username",
                            value: user.username.clone(),
                        });
                    }
                }
                Err(self.db.convert_error("transact_write_items", err))
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let output = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_user(email).to_key_map()))
            .send()
            .await
            .map_err(|e| self.db.convert_error("get_item", e))?;

        match output.item {
            Some(item) => item_to_user(&item).map(Some),
            None => {
                debug!("No user for email");
                Ok(None)
            }
        }
    }
}
