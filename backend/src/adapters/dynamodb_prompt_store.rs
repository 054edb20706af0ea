use crate::domain::prompt_store::{PromptDocument, PromptStore, PromptStoreError, PromptUpdate};
use crate::domain::trend_category::TrendCategory;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use serde_dynamo::{from_item, from_items};

/// Prompts live in one table: partition key `category`, sort key `id`.
#[derive(Debug, Clone)]
pub struct DynamoDbPromptStore {
    client: Client,
    table_name: String,
}

impl DynamoDbPromptStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

fn category_key(category: TrendCategory) -> AttributeValue {
    AttributeValue::S(category.as_str().to_string())
}

#[async_trait]
impl PromptStore for DynamoDbPromptStore {
    #[tracing::instrument(name = "Listing prompts", skip(self))]
    async fn list_prompts(
        &self,
        category: TrendCategory,
    ) -> Result<Vec<PromptDocument>, PromptStoreError> {
        let query_res = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#category = :category")
            .expression_attribute_names("#category", "category")
            .expression_attribute_values(":category", category_key(category))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failure querying prompts for {}. Using table {}",
                    category, &self.table_name
                )
            })?;

        let items = query_res.items.unwrap_or_default();
        from_items(items).map_err(|e| PromptStoreError::InvalidDocument(e.to_string()))
    }

    #[tracing::instrument(name = "Retrieving prompt", skip(self))]
    async fn get_prompt(
        &self,
        category: TrendCategory,
        id: &str,
    ) -> Result<Option<PromptDocument>, PromptStoreError> {
        let get_res = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("category", category_key(category))
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failure retrieving prompt {}/{}. Using table {}",
                    category, id, &self.table_name
                )
            })?;

        match get_res.item {
            None => Ok(None),
            Some(item) => from_item(item)
                .map(Some)
                .map_err(|e| PromptStoreError::InvalidDocument(e.to_string())),
        }
    }

    #[tracing::instrument(name = "Updating prompt", skip(self, update))]
    async fn update_prompt(
        &self,
        category: TrendCategory,
        id: &str,
        update: &PromptUpdate,
    ) -> Result<Option<PromptDocument>, PromptStoreError> {
        let mut assignments = vec!["#updated_at = :updated_at"];
        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("category", category_key(category))
            .key("id", AttributeValue::S(id.to_string()))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", "id")
            .expression_attribute_names("#updated_at", "updated_at")
            .expression_attribute_values(":updated_at", AttributeValue::S(Utc::now().to_rfc3339()))
            .return_values(ReturnValue::AllNew);

        if let Some(name) = &update.name {
            assignments.push("#name = :name");
            builder = builder
                .expression_attribute_names("#name", "name")
                .expression_attribute_values(":name", AttributeValue::S(name.clone()));
        }
        if let Some(prompt) = &update.prompt {
            assignments.push("#prompt = :prompt");
            builder = builder
                .expression_attribute_names("#prompt", "prompt")
                .expression_attribute_values(":prompt", AttributeValue::S(prompt.clone()));
        }

        let update_res = builder
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await;

        let output = match update_res {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    return Ok(None);
                }
                return Err(anyhow::Error::new(service_error)
                    .context(format!(
                        "Failure updating prompt {}/{}. Using table {}",
                        category, id, &self.table_name
                    ))
                    .into());
            }
        };

        match output.attributes {
            None => Ok(None),
            Some(item) => from_item(item)
                .map(Some)
                .map_err(|e| PromptStoreError::InvalidDocument(e.to_string())),
        }
    }
}
