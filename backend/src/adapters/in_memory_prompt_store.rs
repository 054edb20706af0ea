use crate::domain::prompt_store::{PromptDocument, PromptStore, PromptStoreError, PromptUpdate};
use crate::domain::trend_category::TrendCategory;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Prompt store kept in process memory, for local runs without DynamoDB.
#[derive(Debug, Default)]
pub struct InMemoryPromptStore {
    prompts: RwLock<BTreeMap<(TrendCategory, String), PromptDocument>>,
}

impl InMemoryPromptStore {
    pub fn new(prompts: impl IntoIterator<Item = PromptDocument>) -> Self {
        Self {
            prompts: RwLock::new(
                prompts
                    .into_iter()
                    .map(|prompt| ((prompt.category, prompt.id.clone()), prompt))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PromptStore for InMemoryPromptStore {
    async fn list_prompts(
        &self,
        category: TrendCategory,
    ) -> Result<Vec<PromptDocument>, PromptStoreError> {
        Ok(self
            .prompts
            .read()
            .await
            .values()
            .filter(|prompt| prompt.category == category)
            .cloned()
            .collect())
    }

    async fn get_prompt(
        &self,
        category: TrendCategory,
        id: &str,
    ) -> Result<Option<PromptDocument>, PromptStoreError> {
        Ok(self
            .prompts
            .read()
            .await
            .get(&(category, id.to_string()))
            .cloned())
    }

    async fn update_prompt(
        &self,
        category: TrendCategory,
        id: &str,
        update: &PromptUpdate,
    ) -> Result<Option<PromptDocument>, PromptStoreError> {
        let mut prompts = self.prompts.write().await;
        let Some(prompt) = prompts.get_mut(&(category, id.to_string())) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            prompt.name = name.clone();
        }
        if let Some(text) = &update.prompt {
            prompt.prompt = text.clone();
        }
        prompt.updated_at = Utc::now();

        Ok(Some(prompt.clone()))
    }
}
