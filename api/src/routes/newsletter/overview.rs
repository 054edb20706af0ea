use super::send::authorize_cron;
use crate::configuration::Settings;
use crate::routes::{parse_category, PipelineError};
use crate::startup::DigestServices;
use actix_web::{web, HttpRequest, HttpResponse};
use backend::digest::{send_overview_to_all, send_test_overview, DEFAULT_OVERVIEW_CATEGORY};
use backend::dispatcher::SendInterval;
use backend::domain::subscriber_email::SubscriberEmail;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Default)]
pub struct SendOverviewBody {
    pub category: Option<String>,
    pub language: Option<String>,
    pub interval_seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct TestOverviewBody {
    pub email: String,
    pub category: Option<String>,
    pub language: Option<String>,
}

#[tracing::instrument(
    name = "Sending overview to all recipients",
    skip(request, body, services, configuration)
)]
pub async fn send_overview_newsletter(
    request: HttpRequest,
    body: Option<web::Json<SendOverviewBody>>,
    services: web::Data<DigestServices>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PipelineError> {
    authorize_cron(&request, &configuration)?;

    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let category = parse_category(body.category.as_deref(), DEFAULT_OVERVIEW_CATEGORY)
        .map_err(PipelineError::ValidationError)?;
    let interval = body
        .interval_seconds
        .map(SendInterval::parse)
        .transpose()
        .map_err(PipelineError::ValidationError)?;

    let mut rng = StdRng::from_entropy();
    let summary = send_overview_to_all(
        &services.context(),
        category,
        body.language.as_deref(),
        interval,
        &mut rng,
    )
    .await?;

    Ok(HttpResponse::Ok().json(summary))
}

#[tracing::instrument(
    name = "Sending test overview",
    skip(body, services),
    fields(recipient = %body.email)
)]
pub async fn send_test_overview_newsletter(
    body: web::Json<TestOverviewBody>,
    services: web::Data<DigestServices>,
) -> Result<HttpResponse, PipelineError> {
    let body = body.into_inner();
    let email = SubscriberEmail::parse(body.email).map_err(PipelineError::ValidationError)?;
    let category = parse_category(body.category.as_deref(), DEFAULT_OVERVIEW_CATEGORY)
        .map_err(PipelineError::ValidationError)?;

    let result = send_test_overview(
        &services.context(),
        category,
        body.language.as_deref(),
        email.as_ref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "category": category,
        "result": result,
    })))
}
