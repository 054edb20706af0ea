use crate::configuration::Settings;
use actix_web::{web, HttpResponse};
use backend::domain::trend_category::TrendCategory;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct EnvironmentReport {
    research_endpoint: bool,
    overview_endpoints: bool,
    research_api_key: bool,
    email_api_token: bool,
    sender: bool,
    cron_secret: bool,
    prompts_table: bool,
    recipient_lists: BTreeMap<&'static str, bool>,
    all_present: bool,
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

fn has_secret(value: Option<&Secret<String>>) -> bool {
    has_text(value.map(|secret| secret.expose_secret().as_str()))
}

/// Reports which settings are present. Values are never echoed.
#[tracing::instrument(name = "Checking environment", skip(configuration))]
pub async fn check_env(configuration: web::Data<Settings>) -> HttpResponse {
    let recipients = configuration.newsletter.recipient_list();
    let recipient_lists: BTreeMap<&'static str, bool> =
        [TrendCategory::Fashion, TrendCategory::Military, TrendCategory::Bakery]
            .into_iter()
            .map(|category| (category.as_str(), recipients.path_for(category).is_file()))
            .collect();

    let mut report = EnvironmentReport {
        research_endpoint: has_text(configuration.research.endpoint.as_deref()),
        overview_endpoints: [TrendCategory::Fashion, TrendCategory::Bakery]
            .into_iter()
            .all(|category| configuration.research.overview_endpoint_for(category).is_some()),
        research_api_key: has_secret(configuration.research.api_key.as_ref()),
        email_api_token: has_secret(Some(&configuration.email_settings.authorization_token)),
        sender: configuration.email_settings.sender().is_ok(),
        cron_secret: has_secret(configuration.application.cron_secret.as_ref()),
        prompts_table: has_text(Some(configuration.prompts.table_name.as_str())),
        recipient_lists,
        all_present: false,
    };
    report.all_present = report.research_endpoint
        && report.overview_endpoints
        && report.research_api_key
        && report.email_api_token
        && report.sender
        && report.cron_secret
        && report.prompts_table
        && report.recipient_lists.values().all(|present| *present);

    HttpResponse::Ok().json(report)
}
