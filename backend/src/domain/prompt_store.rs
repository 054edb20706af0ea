use crate::domain::trend_category::TrendCategory;
use crate::utils::error_chain_fmt;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error)]
pub enum PromptStoreError {
    #[error("{0}")]
    InvalidDocument(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for PromptStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// A research prompt, keyed by category and subcategory id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDocument {
    pub category: TrendCategory,
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a prompt that can be edited. At least one must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub prompt: Option<String>,
}

impl PromptUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.prompt.is_none()
    }
}

#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn list_prompts(
        &self,
        category: TrendCategory,
    ) -> Result<Vec<PromptDocument>, PromptStoreError>;

    async fn get_prompt(
        &self,
        category: TrendCategory,
        id: &str,
    ) -> Result<Option<PromptDocument>, PromptStoreError>;

    /// Returns `None` when no prompt with this id exists.
    async fn update_prompt(
        &self,
        category: TrendCategory,
        id: &str,
        update: &PromptUpdate,
    ) -> Result<Option<PromptDocument>, PromptStoreError>;
}
