use backend::configuration::{
    load_configuration, EmailClientSettings, NewsletterSettings, PromptStoreSettings,
    ResearchApiSettings,
};
use secrecy::Secret;
use serde::Deserialize;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub telemetry: TelemetrySettings,
    pub email_settings: EmailClientSettings,
    pub research: ResearchApiSettings,
    pub prompts: PromptStoreSettings,
    pub newsletter: NewsletterSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub application_port: u16,
    pub host_name: String,
    /// Bearer secret the scheduler presents to `POST /newsletter/send`.
    pub cron_secret: Option<Secret<String>>,
}

pub async fn get_configuration() -> Result<Settings, config::ConfigError> {
    load_configuration().await
}
