use crate::configuration::Settings;
use crate::routes::{error_chain_fmt, parse_category};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use backend::domain::prompt_store::{PromptStore, PromptStoreError, PromptUpdate};
use backend::domain::trend_category::TrendCategory;
use serde::Deserialize;
use serde_json::json;

#[derive(thiserror::Error)]
pub enum PromptsError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Prompt {0} was not found")]
    NotFound(String),
    #[error(transparent)]
    StoreError(#[from] PromptStoreError),
}

impl std::fmt::Debug for PromptsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PromptsError {
    fn status_code(&self) -> StatusCode {
        match self {
            PromptsError::ValidationError(_) => StatusCode::BAD_REQUEST,
            PromptsError::NotFound(_) => StatusCode::NOT_FOUND,
            PromptsError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

impl CategoryQuery {
    fn category(&self, default: TrendCategory) -> Result<TrendCategory, PromptsError> {
        parse_category(self.category.as_deref(), default).map_err(PromptsError::ValidationError)
    }
}

#[derive(Deserialize)]
pub struct UpdatePromptBody {
    pub category: Option<String>,
    pub name: Option<String>,
    pub prompt: Option<String>,
}

#[tracing::instrument(name = "Listing prompts", skip(query, store, configuration))]
pub async fn list_prompts(
    query: web::Query<CategoryQuery>,
    store: web::Data<dyn PromptStore>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PromptsError> {
    let category = query.category(configuration.newsletter.default_category)?;

    let prompts = store.list_prompts(category).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "category": category,
        "prompts": prompts,
    })))
}

#[tracing::instrument(name = "Retrieving prompt", skip(query, store, configuration))]
pub async fn get_prompt(
    id: web::Path<String>,
    query: web::Query<CategoryQuery>,
    store: web::Data<dyn PromptStore>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PromptsError> {
    let category = query.category(configuration.newsletter.default_category)?;
    let id = id.into_inner();

    let prompt = store
        .get_prompt(category, &id)
        .await?
        .ok_or(PromptsError::NotFound(id))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "prompt": prompt })))
}

#[tracing::instrument(name = "Updating prompt", skip(body, store, configuration))]
pub async fn update_prompt(
    id: web::Path<String>,
    body: web::Json<UpdatePromptBody>,
    store: web::Data<dyn PromptStore>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PromptsError> {
    let body = body.into_inner();
    let category = parse_category(
        body.category.as_deref(),
        configuration.newsletter.default_category,
    )
    .map_err(PromptsError::ValidationError)?;

    let update = PromptUpdate {
        name: non_blank(body.name),
        prompt: non_blank(body.prompt),
    };
    if update.is_empty() {
        return Err(PromptsError::ValidationError(
            "Provide a name or a prompt to update".to_string(),
        ));
    }

    let id = id.into_inner();
    let prompt = store
        .update_prompt(category, &id, &update)
        .await?
        .ok_or(PromptsError::NotFound(id))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "prompt": prompt })))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
