use async_trait::async_trait;
use backend::adapters::in_memory_prompt_store::InMemoryPromptStore;
use backend::adapters::json_recipient_list::JsonFileRecipientList;
use backend::adapters::postmark_email_client::PostmarkEmailClient;
use backend::adapters::trends_research_client::TrendsResearchClient;
use backend::configuration::ResearchApiSettings;
use backend::digest::DigestContext;
use backend::dispatcher::{Delay, SendInterval};
use backend::domain::email_client::{EmailBody, EmailClient};
use backend::domain::prompt_store::PromptDocument;
use backend::domain::sender::{Sender, SenderName};
use backend::domain::subscriber_email::SubscriberEmail;
use backend::domain::trend_category::TrendCategory;
use chrono::Utc;
use once_cell::sync::Lazy;
use opentelemetry_sdk::trace::TracerProvider;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use telemetry::{get_subscriber, init_subscriber, TelemetrySettings, EXPORT_DISABLED};
use tempfile::TempDir;
use wiremock::MockServer;

static TRACING: Lazy<()> = Lazy::new(|| {
    let settings = TelemetrySettings {
        otlp_endpoint: EXPORT_DISABLED.to_string(),
        honeycomb_api_key: Secret::new(String::new()),
        dataset_name: "test-trend-digest-backend".to_string(),
    };
    let default_filter = "info".to_string();
    let subscriber_name = "test".to_string();
    let default_trace_provider = TracerProvider::builder().build();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::stdout,
            &settings,
            &default_trace_provider,
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::sink,
            &settings,
            &default_trace_provider,
        );
        init_subscriber(subscriber);
    }
});

pub fn sender() -> Sender {
    Sender::new(
        SubscriberEmail::parse("digest@trenddigest.dev".into()).unwrap(),
        SenderName::parse("Trend Digest".into()).unwrap(),
    )
}

/// Records every requested pause instead of sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Email client that succeeds unless the call index is listed in `fail_at`.
#[derive(Default)]
pub struct ScriptedEmailClient {
    pub fail_at: Vec<usize>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedEmailClient {
    pub fn failing_at(fail_at: Vec<usize>) -> Self {
        Self {
            fail_at,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailClient for ScriptedEmailClient {
    async fn send_email_to(
        &self,
        _sender: &Sender,
        recipient: &SubscriberEmail,
        _subject: &str,
        _body: &EmailBody,
    ) -> Result<String, anyhow::Error> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(recipient.to_string());

        if self.fail_at.contains(&index) {
            anyhow::bail!("mailbox {} is unavailable", recipient)
        }
        Ok(format!("message-{}", index))
    }
}

pub fn recipients(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("reader{}@example.com", i))
        .collect()
}

pub fn prompt(category: TrendCategory, id: &str, name: &str) -> PromptDocument {
    PromptDocument {
        category,
        id: id.to_string(),
        name: name.to_string(),
        prompt: format!("Research the latest {} trends", id),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn research_payload(count: usize) -> Value {
    let trends: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "number": i,
                "description_english": format!("**Trend {}** is rising", i),
                "references": [format!("https://source.example/{}", i), "https://source.example/shared"],
                "image_urls": [format!("https://img.example/{}.png", i)]
            })
        })
        .collect();

    json!({
        "success": true,
        "data": { "trends": trends, "research_model": "deep-research" },
        "request_info": { "generated_at": "2025-10-20T08:00:00Z" }
    })
}

pub fn overview_payload(names: &[&str], language: &str) -> Value {
    let categories: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "category_id": name.to_lowercase().replace(' ', "-"),
                "category_name": name,
                "description_english": format!("**{}** lead the week", name),
                "description_translated": "",
                "language": language,
                "image_url": format!("https://img.example/{}.png", name.len()),
                "references": ["https://source.example/overview"]
            })
        })
        .collect();

    json!({
        "success": true,
        "data": { "categories": categories, "research_model": "deep-research" },
        "request_info": {
            "language": language,
            "production": true,
            "generated_at": "2025-10-20T08:00:00Z"
        }
    })
}

/// Digest collaborators backed by mock HTTP servers and a temporary
/// recipient directory.
pub struct TestApp {
    pub research_server: MockServer,
    pub email_server: MockServer,
    pub email_client: PostmarkEmailClient,
    pub research_client: TrendsResearchClient,
    pub research_settings: ResearchApiSettings,
    pub prompts: InMemoryPromptStore,
    pub recipients_dir: TempDir,
    pub recipient_list: JsonFileRecipientList,
    pub delay: RecordingDelay,
    pub sender: Sender,
}

impl TestApp {
    pub fn digest_context(&self) -> DigestContext<'_> {
        DigestContext {
            email_client: &self.email_client,
            research: &self.research_client,
            prompts: &self.prompts,
            recipients: &self.recipient_list,
            delay: &self.delay,
            sender: &self.sender,
            research_settings: &self.research_settings,
            interval: SendInterval::from_secs(45),
        }
    }

    pub fn write_recipients(&self, category: TrendCategory, entries: Value) {
        std::fs::write(
            self.recipient_list.path_for(category),
            json!({ "recipients": entries }).to_string(),
        )
        .unwrap();
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let research_server = MockServer::start().await;
    let email_server = MockServer::start().await;

    let research_settings = ResearchApiSettings {
        endpoint: Some(format!("{}/api/research", research_server.uri())),
        api_key: Some(Secret::new("research-key".to_string())),
        timeout_seconds: 5,
        images_num: 1,
        research_type: "reasoning".to_string(),
        keep_last: 3,
        accept_invalid_certs: false,
        overview_endpoint: None,
        bakery_overview_endpoint: None,
        overview_language: "English".to_string(),
        production: true,
    };

    let recipients_dir = tempfile::tempdir().unwrap();
    let recipient_list = JsonFileRecipientList::new(recipients_dir.path());

    TestApp {
        email_client: PostmarkEmailClient::new(
            email_server.uri(),
            Secret::new("email-token".to_string()),
            Duration::from_secs(2),
        )
        .unwrap(),
        research_client: TrendsResearchClient::new(&research_settings).unwrap(),
        research_settings,
        prompts: InMemoryPromptStore::new([
            prompt(TrendCategory::Fashion, "high-fashion", "High Fashion"),
            prompt(TrendCategory::Bakery, "hosting-platters", "Hosting Platters"),
        ]),
        recipients_dir,
        recipient_list,
        delay: RecordingDelay::default(),
        sender: sender(),
        research_server,
        email_server,
    }
}
