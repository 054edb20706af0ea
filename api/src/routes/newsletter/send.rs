use crate::configuration::Settings;
use crate::routes::{parse_category, PipelineError};
use crate::startup::DigestServices;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use anyhow::{anyhow, Context};
use backend::digest::{send_digest_to_all, NewsletterError};
use backend::dispatcher::SendInterval;
use rand::rngs::StdRng;
use rand::SeedableRng;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct SendNewsletterBody {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub interval_seconds: Option<u64>,
}

#[tracing::instrument(
    name = "Sending newsletter to all recipients",
    skip(request, body, services, configuration)
)]
pub async fn send_newsletter(
    request: HttpRequest,
    body: Option<web::Json<SendNewsletterBody>>,
    services: web::Data<DigestServices>,
    configuration: web::Data<Settings>,
) -> Result<HttpResponse, PipelineError> {
    authorize_cron(&request, &configuration)?;

    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let category = parse_category(
        body.category.as_deref(),
        configuration.newsletter.default_category,
    )
    .map_err(PipelineError::ValidationError)?;
    let interval = body
        .interval_seconds
        .map(SendInterval::parse)
        .transpose()
        .map_err(PipelineError::ValidationError)?;

    let mut rng = StdRng::from_entropy();
    let summary = send_digest_to_all(
        &services.context(),
        category,
        body.subcategory.as_deref(),
        interval,
        &mut rng,
    )
    .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// Scheduled sends require `Authorization: Bearer <cron secret>`.
pub(super) fn authorize_cron(
    request: &HttpRequest,
    configuration: &Settings,
) -> Result<(), PipelineError> {
    let cron_secret = configuration.application.cron_secret.as_ref().ok_or_else(|| {
        NewsletterError::MissingConfiguration("The newsletter cron secret is not set".into())
    })?;
    validate_bearer(request, cron_secret).map_err(PipelineError::AuthError)
}

fn validate_bearer(request: &HttpRequest, expected: &Secret<String>) -> Result<(), anyhow::Error> {
    let header_value = request
        .headers()
        .get(AUTHORIZATION)
        .context("The 'Authorization' header was missing")?
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string")?;

    let token = header_value
        .strip_prefix("Bearer ")
        .context("The authorization scheme was not 'Bearer'")?;

    if token.is_empty() || token != expected.expose_secret() {
        return Err(anyhow!("Invalid bearer token"));
    }
    Ok(())
}
