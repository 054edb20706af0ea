use std::sync::Arc;

use backend::adapters::trends_research_client::TrendsResearchClient;
use backend::configuration::get_configuration;
use backend::digest::DigestContext;
use backend::dispatcher::TokioDelay;
use backend::send_newsletter_handler::{ScheduledDigestEvent, SendNewsletterEventHandler};
use lambda_extension::Extension;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use telemetry::{get_subscriber, init_subscriber, init_tracer, TraceFlushExtension};
use tokio::sync::mpsc::unbounded_channel;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let configuration = get_configuration().await?;

    let tracer = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
        &tracer,
    );

    init_subscriber(subscriber);

    let email_client = configuration.email_settings.client()?;
    let sender = configuration.email_settings.sender()?;
    let research_client = TrendsResearchClient::new(&configuration.research)?;
    let prompt_store = configuration.prompts.store().await;
    let recipient_list = configuration.newsletter.recipient_list();
    let delay = TokioDelay;

    let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

    let flush_extension = Arc::new(TraceFlushExtension::new(request_done_receiver));

    let arc_tracer = Arc::new(tracer);
    let extension = Extension::new()
        // Internal extensions only support INVOKE events.
        .with_events(&["INVOKE"])
        .with_events_processor(service_fn(|event| {
            let cloned_tracer = arc_tracer.clone();

            let flush_extension = flush_extension.clone();
            async move { flush_extension.invoke(event, cloned_tracer).await }
        }))
        // Internal extension names MUST be unique within a given Lambda function.
        .with_extension_name("internal-flush")
        // Extensions MUST be registered before calling lambda_runtime::run(), which ends the Init
        // phase and begins the Invoke phase.
        .register()
        .await?;

    let handler = Arc::new(SendNewsletterEventHandler::new(
        request_done_sender,
        configuration.newsletter.default_category,
    ));

    let ctx = DigestContext {
        email_client: &email_client,
        research: &research_client,
        prompts: &prompt_store,
        recipients: &recipient_list,
        delay: &delay,
        sender: &sender,
        research_settings: &configuration.research,
        interval: configuration.newsletter.interval(),
    };
    let ctx = &ctx;

    tokio::try_join!(
        run(service_fn(|event: LambdaEvent<ScheduledDigestEvent>| {
            let handler = handler.clone();

            async move { handler.invoke(event, ctx).await }
        })),
        extension.run(),
    )?;

    Ok(())
}
