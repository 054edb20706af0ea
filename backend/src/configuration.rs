use crate::adapters::dynamodb_prompt_store::DynamoDbPromptStore;
use crate::adapters::json_recipient_list::JsonFileRecipientList;
use crate::adapters::postmark_email_client::PostmarkEmailClient;
use crate::dispatcher::{SendInterval, DEFAULT_SEND_INTERVAL_SECONDS};
use crate::domain::sender::{Sender, SenderName};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::trend_category::TrendCategory;
use aws_config::BehaviorVersion;
use config::{ConfigError, FileFormat};
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub telemetry: TelemetrySettings,
    pub email_settings: EmailClientSettings,
    pub research: ResearchApiSettings,
    pub prompts: PromptStoreSettings,
    pub newsletter: NewsletterSettings,
}

#[derive(Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub authorization_token: Secret<String>,
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn sender(&self) -> Result<Sender, String> {
        Ok(Sender::new(
            SubscriberEmail::parse(self.sender_email.clone())?,
            SenderName::parse(self.sender_name.clone())?,
        ))
    }

    pub fn client(&self) -> Result<PostmarkEmailClient, anyhow::Error> {
        PostmarkEmailClient::new(
            self.base_url.clone(),
            self.authorization_token.clone(),
            self.timeout_duration(),
        )
    }
}

#[derive(Deserialize, Clone)]
pub struct ResearchApiSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<Secret<String>>,
    #[serde(default = "default_research_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_images_num")]
    pub images_num: u32,
    #[serde(default = "default_research_type")]
    pub research_type: String,
    #[serde(default = "default_keep_last")]
    pub keep_last: usize,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub overview_endpoint: Option<String>,
    #[serde(default)]
    pub bakery_overview_endpoint: Option<String>,
    #[serde(default = "default_overview_language")]
    pub overview_language: String,
    #[serde(default = "default_production")]
    pub production: bool,
}

impl ResearchApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Endpoint of the overview research for `category`.
    ///
    /// Without an explicit setting it is the research endpoint with its last
    /// path segment replaced by `trends-overview`, or by
    /// `bakery-trends-overview` for bakery.
    pub fn overview_endpoint_for(&self, category: TrendCategory) -> Option<String> {
        let (configured, segment) = match category {
            TrendCategory::Bakery => (&self.bakery_overview_endpoint, "bakery-trends-overview"),
            _ => (&self.overview_endpoint, "trends-overview"),
        };

        if let Some(endpoint) = non_blank(configured.as_deref()) {
            return Some(endpoint.to_string());
        }

        let mut url = reqwest::Url::parse(non_blank(self.endpoint.as_deref())?).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .pop()
            .push(segment);
        Some(url.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn default_overview_language() -> String {
    "English".to_string()
}

fn default_production() -> bool {
    true
}

fn default_research_timeout() -> u64 {
    300
}

fn default_images_num() -> u32 {
    1
}

fn default_research_type() -> String {
    "reasoning".to_string()
}

fn default_keep_last() -> usize {
    3
}

#[derive(Deserialize, Clone)]
pub struct PromptStoreSettings {
    pub table_name: String,
    pub use_local: bool,
}

impl PromptStoreSettings {
    pub async fn store(&self) -> DynamoDbPromptStore {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let conf_builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        let dynamo_config = match self.use_local {
            true => conf_builder.endpoint_url("http://localhost:8000").build(),
            false => conf_builder.build(),
        };

        DynamoDbPromptStore::new(
            aws_sdk_dynamodb::Client::from_conf(dynamo_config),
            self.table_name.clone(),
        )
    }
}

#[derive(Deserialize, Clone)]
pub struct NewsletterSettings {
    pub recipients_directory: String,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub default_category: TrendCategory,
}

impl NewsletterSettings {
    pub fn interval(&self) -> SendInterval {
        SendInterval::from_secs(self.interval_seconds)
    }

    pub fn recipient_list(&self) -> JsonFileRecipientList {
        JsonFileRecipientList::new(&self.recipients_directory)
    }
}

fn default_interval_seconds() -> u64 {
    DEFAULT_SEND_INTERVAL_SECONDS
}

pub async fn get_configuration() -> Result<Settings, ConfigError> {
    load_configuration().await
}

/// Reads any settings document from the configuration sources of the current
/// environment.
///
/// Locally the document is `configuration/base.yaml` overlaid with
/// `configuration/<environment>.yaml`. In production it is the YAML stored in
/// the SSM parameter named by `CONFIG_PARAMETER_NAME`. `APP_`-prefixed
/// environment variables are applied last in both cases.
pub async fn load_configuration<T: DeserializeOwned>() -> Result<T, ConfigError> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let builder = match environment {
        Environment::Local => {
            let configuration_directory = std::env::current_dir()
                .map_err(|e| ConfigError::Foreign(Box::new(e)))?
                .join("configuration");

            let environment_filename = format!("{}.yaml", environment.as_str());

            config::Config::builder()
                .add_source(config::File::from(
                    configuration_directory.join("base.yaml"),
                ))
                .add_source(config::File::from(
                    configuration_directory.join(environment_filename),
                ))
        }
        Environment::Production => {
            let document = read_ssm_parameter().await?;

            config::Config::builder().add_source(config::File::from_str(
                document.as_str(),
                FileFormat::Yaml,
            ))
        }
    };

    // E.g. `APP_NEWSLETTER__INTERVAL_SECONDS=5` sets `newsletter.interval_seconds`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

async fn read_ssm_parameter() -> Result<String, ConfigError> {
    let parameter_name = std::env::var("CONFIG_PARAMETER_NAME")
        .map_err(|_| ConfigError::NotFound("CONFIG_PARAMETER_NAME".into()))?;

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let ssm_client = aws_sdk_ssm::Client::new(&sdk_config);

    let parameter = ssm_client
        .get_parameter()
        .name(&parameter_name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| ConfigError::Foreign(Box::new(e.into_service_error())))?;

    parameter
        .parameter
        .and_then(|p| p.value)
        .ok_or(ConfigError::NotFound(parameter_name))
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either local or production",
                other
            )),
        }
    }
}
