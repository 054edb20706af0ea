use crate::configuration::Settings;
use crate::routes::{parse_category, PipelineError};
use crate::startup::DigestServices;
use actix_web::{web, HttpResponse};
use backend::digest::{fetch_trends, load_prompt, NewsletterError};
use backend::domain::trend_entry::TrendEntry;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct TrendsRequest {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Replaces the stored prompt for this request only.
    pub prompt: Option<String>,
    pub images_num: Option<u32>,
}

#[derive(Serialize)]
struct TrendsResponse {
    success: bool,
    category: String,
    subcategory: String,
    total_trends: usize,
    trends: Vec<TrendEntry>,
    generated_at: Option<String>,
    research_model: Option<String>,
}

#[tracing::instrument(
    name = "Researching trends",
    skip(body, services, configuration),
    fields(category = ?body.category, subcategory = ?body.subcategory)
)]
pub async fn research_trends(
    body: web::Json<TrendsRequest>,
    services: web::Data<DigestServices>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PipelineError> {
    let request = body.into_inner();
    let category = parse_category(
        request.category.as_deref(),
        configuration.newsletter.default_category,
    )
    .map_err(PipelineError::ValidationError)?;
    let subcategory = category
        .resolve_subcategory(request.subcategory.as_deref())
        .to_string();

    let prompt = match request.prompt.filter(|prompt| !prompt.trim().is_empty()) {
        Some(prompt) => prompt,
        None => {
            load_prompt(services.prompts.as_ref(), category, &subcategory)
                .await?
                .prompt
        }
    };

    let report = fetch_trends(
        services.research.as_ref(),
        &services.research_settings,
        category,
        &prompt,
        request.images_num,
    )
    .await
    .map_err(NewsletterError::from)?;

    Ok(HttpResponse::Ok().json(TrendsResponse {
        success: true,
        category: category.to_string(),
        subcategory,
        total_trends: report.total_trends(),
        trends: report.trends,
        generated_at: report.generated_at,
        research_model: report.research_model,
    }))
}
