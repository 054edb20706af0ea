use crate::configuration::ResearchApiSettings;
use crate::domain::trend_category::TrendCategory;
use crate::domain::trends_research::{
    OverviewRequest, ResearchRequest, TrendsError, TrendsResearch,
};
use crate::normalizer::parse_payload;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

/// HTTP client for the trends research API.
#[derive(Clone, Debug)]
pub struct TrendsResearchClient {
    http_client: Client,
    endpoint: String,
    overview_endpoint: Option<String>,
    bakery_overview_endpoint: Option<String>,
    api_key: Secret<String>,
}

impl TrendsResearchClient {
    /// Fails before any network traffic when the endpoint or key is missing.
    pub fn new(settings: &ResearchApiSettings) -> Result<Self, TrendsError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| {
                TrendsError::MissingConfiguration("The research API endpoint is not set".into())
            })?
            .to_string();

        let api_key = settings
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                TrendsError::MissingConfiguration("The research API key is not set".into())
            })?;

        let http_client = Client::builder()
            .timeout(settings.timeout())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .context("Failed to build the research API HTTP client")?;

        Ok(Self {
            http_client,
            endpoint,
            overview_endpoint: settings.overview_endpoint_for(TrendCategory::Fashion),
            bakery_overview_endpoint: settings.overview_endpoint_for(TrendCategory::Bakery),
            api_key,
        })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<serde_json::Value, TrendsError> {
        let response = self
            .http_client
            .post(endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .context("Failed to reach the research API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read the research API response")?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Research API returned an error");
            return Err(TrendsError::UpstreamRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        parse_payload(&body)
    }
}

#[async_trait]
impl TrendsResearch for TrendsResearchClient {
    #[tracing::instrument(
        name = "Requesting trends research",
        skip(self, request),
        fields(
            trend_category = %request.trend_category,
            research_type = %request.research_type,
            images_num = request.images_num
        )
    )]
    async fn research(&self, request: &ResearchRequest) -> Result<serde_json::Value, TrendsError> {
        self.post_json(&self.endpoint, request).await
    }

    #[tracing::instrument(
        name = "Requesting trends overview",
        skip(self, category, request),
        fields(
            trend_category = %category,
            language = %request.language,
            production = request.production
        )
    )]
    async fn overview(
        &self,
        category: TrendCategory,
        request: &OverviewRequest,
    ) -> Result<serde_json::Value, TrendsError> {
        let endpoint = match category {
            TrendCategory::Bakery => self.bakery_overview_endpoint.as_deref(),
            _ => self.overview_endpoint.as_deref(),
        }
        .ok_or_else(|| {
            TrendsError::MissingConfiguration(format!(
                "The {} overview endpoint is not set",
                category
            ))
        })?;

        self.post_json(endpoint, request).await
    }
}
