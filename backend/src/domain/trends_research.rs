use crate::domain::trend_category::TrendCategory;
use crate::utils::error_chain_fmt;
use async_trait::async_trait;
use serde::Serialize;

#[derive(thiserror::Error)]
pub enum TrendsError {
    #[error("{0}")]
    MissingConfiguration(String),
    #[error("Research API request failed with status {status}: {body}")]
    UpstreamRequestFailed { status: u16, body: String },
    #[error("Research API returned invalid JSON: {0}")]
    InvalidResponseFormat(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for TrendsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchRequest {
    #[serde(rename = "type")]
    pub research_type: String,
    pub prompt: String,
    pub images_num: u32,
    pub trend_category: TrendCategory,
}

/// Body of a trends overview request. The overview covers every
/// subcategory of a category in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewRequest {
    pub language: String,
    pub production: bool,
}

#[async_trait]
pub trait TrendsResearch: Send + Sync {
    /// Runs one research request and returns the parsed, still untyped, payload.
    async fn research(&self, request: &ResearchRequest) -> Result<serde_json::Value, TrendsError>;

    /// Fetches the overview of `category` from its dedicated endpoint.
    async fn overview(
        &self,
        category: TrendCategory,
        request: &OverviewRequest,
    ) -> Result<serde_json::Value, TrendsError>;
}
