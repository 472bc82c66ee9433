use crate::{
    format_timestamp, item_to_todo, todo_to_item, DynamoDbClient, DynamoDbKeys, EntityType,
    Item, RepositoryError, TodoRepository,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use domain::{first_match, title_key, DayWindow, Todo, TodoId};
use std::collections::HashMap;
use tracing::debug;

/// DynamoDB 上の Todo コレクション
#[derive(Clone)]
pub struct DynamoTodoRepository {
    db: DynamoDbClient,
}

impl DynamoTodoRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }

    /// `EntityType = Todo` に追加条件を AND で絞り込んでスキャンする。
    /// `LastEvaluatedKey` がなくなるまでページを辿る
    async fn scan_todos(
        &self,
        extra_filter: Option<&str>,
        mut names: HashMap<String, String>,
        mut values: Item,
    ) -> Result<Vec<Todo>, RepositoryError> {
        names.insert("#entity".to_string(), "EntityType".to_string());
        values.insert(
            ":entity".to_string(),
            AttributeValue::S(EntityType::Todo.as_str().to_string()),
        );
        let filter = match extra_filter {
            Some(extra) => format!("#entity = :entity AND {extra}"),
            None => "#entity = :entity".to_string(),
        };

        let mut todos = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .filter_expression(&filter)
                .set_expression_attribute_names(Some(names.clone()))
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.db.convert_error("scan", e))?;

            for item in output.items.unwrap_or_default() {
                todos.push(item_to_todo(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(count = todos.len(), "Scanned todos");
        Ok(todos)
    }
}

#[async_trait]
impl TodoRepository for DynamoTodoRepository {
    async fn list(&self) -> Result<Vec<Todo>, RepositoryError> {
        self.scan_todos(None, HashMap::new(), HashMap::new()).await
    }

    async fn list_created_within(&self, window: DayWindow) -> Result<Vec<Todo>, RepositoryError> {
        let names = HashMap::from([("#created_at".to_string(), "created_at".to_string())]);
        let values = HashMap::from([
            (
                ":start".to_string(),
                AttributeValue::S(format_timestamp(window.start)),
            ),
            (
                ":end".to_string(),
                AttributeValue::S(format_timestamp(window.end)),
            ),
        ]);

        self.scan_todos(
            Some("#created_at >= :start AND #created_at < :end"),
            names,
            values,
        )
        .await
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Todo>, RepositoryError> {
        let names = HashMap::from([("#title_key".to_string(), "title_key".to_string())]);
        let values = HashMap::from([(
            ":title_key".to_string(),
            AttributeValue::S(title_key(title)),
        )]);

        let candidates = self
            .scan_todos(Some("#title_key = :title_key"), names, values)
            .await?;
        Ok(first_match(candidates))
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(todo_to_item(todo)))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(|e| self.db.convert_error("put_item", e))?;

        debug!(todo_id = %todo.id, "Todo inserted");
        Ok(())
    }

    async fn replace(&self, todo: &Todo) -> Result<Option<Todo>, RepositoryError> {
        let mut update_parts = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        // キーと不変の属性（id, created_at）以外を上書きする
        for (attribute, value) in todo_to_item(todo) {
            if matches!(attribute.as_str(), "PK" | "SK" | "EntityType" | "id" | "created_at") {
                continue;
            }
            update_parts.push(format!("#{attribute} = :{attribute}"));
            names.insert(format!("#{attribute}"), attribute.clone());
            values.insert(format!(":{attribute}"), value);
        }
        update_parts.sort();

        let result = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_todo(&todo.id).to_key_map()))
            .update_expression(format!("SET {}", update_parts.join(", ")))
            .condition_expression("attribute_exists(PK)")
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                let item = output.attributes.ok_or_else(|| {
                    RepositoryError::Malformed("update_item returned no attributes".to_string())
                })?;
                item_to_todo(&item).map(Some)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                debug!(todo_id = %todo.id, "Todo vanished before update");
                Ok(None)
            }
            Err(err) => Err(self.db.convert_error("update_item", err)),
        }
    }

    async fn remove(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        let result = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(DynamoDbKeys::for_todo(id).to_key_map()))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(self.db.convert_error("delete_item", err)),
        }
    }
}
