use crate::configuration::Settings;
use crate::middleware::RequestDoneSignal;
use crate::routes::{
    check_env, get_prompt, health_check, list_prompts, research_trends, send_newsletter,
    send_overview_newsletter, send_test_newsletter, send_test_overview_newsletter,
    update_prompt,
};
use crate::telemetry::CustomLevelRootSpanBuilder;
use actix_web::dev::{Server, Service};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::web::Data;
use actix_web::{web, App, HttpMessage, HttpServer};
use async_trait::async_trait;
use backend::adapters::trends_research_client::TrendsResearchClient;
use backend::configuration::ResearchApiSettings;
use backend::digest::DigestContext;
use backend::dispatcher::{Delay, SendInterval, TokioDelay};
use backend::domain::email_client::EmailClient;
use backend::domain::prompt_store::PromptStore;
use backend::domain::recipient_source::RecipientSource;
use backend::domain::sender::Sender;
use backend::domain::trend_category::TrendCategory;
use backend::domain::trends_research::{
    OverviewRequest, ResearchRequest, TrendsError, TrendsResearch,
};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing_actix_web::{RequestId, TracingLogger};

/// Collaborators of the newsletter pipeline, shared by all workers.
pub struct DigestServices {
    pub email_client: Arc<dyn EmailClient>,
    pub research: Arc<dyn TrendsResearch>,
    pub prompts: Arc<dyn PromptStore>,
    pub recipients: Arc<dyn RecipientSource>,
    pub delay: Arc<dyn Delay>,
    pub sender: Sender,
    pub research_settings: ResearchApiSettings,
    pub interval: SendInterval,
}

impl DigestServices {
    pub fn context(&self) -> DigestContext<'_> {
        DigestContext {
            email_client: self.email_client.as_ref(),
            research: self.research.as_ref(),
            prompts: self.prompts.as_ref(),
            recipients: self.recipients.as_ref(),
            delay: self.delay.as_ref(),
            sender: &self.sender,
            research_settings: &self.research_settings,
            interval: self.interval,
        }
    }
}

/// Stands in for the research client when its settings are incomplete, so
/// the API still starts and reports the problem per request.
struct UnconfiguredResearch(String);

#[async_trait]
impl TrendsResearch for UnconfiguredResearch {
    async fn research(&self, _request: &ResearchRequest) -> Result<serde_json::Value, TrendsError> {
        Err(TrendsError::MissingConfiguration(self.0.clone()))
    }

    async fn overview(
        &self,
        _category: TrendCategory,
        _request: &OverviewRequest,
    ) -> Result<serde_json::Value, TrendsError> {
        Err(TrendsError::MissingConfiguration(self.0.clone()))
    }
}

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(
        configuration: Settings,
        request_done_sender: Option<UnboundedSender<()>>,
    ) -> Result<Self, anyhow::Error> {
        let prompt_store = configuration.prompts.store().await;
        Self::build_with_prompt_store(configuration, Arc::new(prompt_store), request_done_sender)
            .await
    }

    pub async fn build_with_prompt_store(
        configuration: Settings,
        prompts: Arc<dyn PromptStore>,
        request_done_sender: Option<UnboundedSender<()>>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host_name, configuration.application.application_port
        ))?;
        let port = listener.local_addr()?.port();

        let research: Arc<dyn TrendsResearch> =
            match TrendsResearchClient::new(&configuration.research) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error.message = %e, "Research API is not configured");
                    Arc::new(UnconfiguredResearch(e.to_string()))
                }
            };

        let services = DigestServices {
            email_client: Arc::new(configuration.email_settings.client()?),
            research,
            prompts,
            recipients: Arc::new(configuration.newsletter.recipient_list()),
            delay: Arc::new(TokioDelay),
            sender: configuration
                .email_settings
                .sender()
                .map_err(anyhow::Error::msg)?,
            research_settings: configuration.research.clone(),
            interval: configuration.newsletter.interval(),
        };

        let server = run(listener, services, configuration, request_done_sender)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

fn run(
    listener: TcpListener,
    services: DigestServices,
    configuration: Settings,
    request_done_sender: Option<UnboundedSender<()>>,
) -> Result<Server, anyhow::Error> {
    let prompt_store_data: Data<dyn PromptStore> = Data::from(services.prompts.clone());
    let services = Data::new(services);
    let configuration = Data::new(configuration);

    let server = HttpServer::new(move || {
        App::new()
            .wrap_fn(|req, srv| {
                let request_id = req.extensions().get::<RequestId>().copied();
                let res = srv.call(req);
                async move {
                    let mut res = res.await?;
                    if let Some(request_id) = request_id {
                        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                            res.headers_mut()
                                .insert(HeaderName::from_static("x-request-id"), value);
                        }
                    }
                    Ok(res)
                }
            })
            .wrap(TracingLogger::<CustomLevelRootSpanBuilder>::new())
            .wrap(RequestDoneSignal::new(request_done_sender.clone()))
            .route("/health_check", web::get().to(health_check))
            .route("/trends", web::post().to(research_trends))
            .route("/prompts", web::get().to(list_prompts))
            .route("/prompts/{id}", web::get().to(get_prompt))
            .route("/prompts/{id}", web::put().to(update_prompt))
            .service(
                web::scope("/newsletter")
                    .route("/send", web::post().to(send_newsletter))
                    .route("/test", web::post().to(send_test_newsletter))
                    .route("/overview/send", web::post().to(send_overview_newsletter))
                    .route(
                        "/overview/test",
                        web::post().to(send_test_overview_newsletter),
                    )
                    .route("/check-env", web::get().to(check_env)),
            )
            .app_data(prompt_store_data.clone())
            .app_data(services.clone())
            .app_data(configuration.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
