use anyhow::anyhow;
use lambda_extension::{Error, NextEvent};
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::subscriber::set_global_default;
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Endpoint value that switches span export off entirely.
pub const EXPORT_DISABLED: &str = "disabled";

const LOCAL_COLLECTOR: &str = "http://localhost:4318";

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    pub otlp_endpoint: String,
    pub honeycomb_api_key: Secret<String>,
    pub dataset_name: String,
}

/// Compose multiple layers into a tracing subscriber.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    config: &TelemetrySettings,
    trace_provider: &TracerProvider,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(trace_provider.tracer(config.dataset_name.clone())),
        )
        .with(LevelFilter::DEBUG)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    let _ = LogTracer::init();
    global::set_text_map_propagator(TraceContextPropagator::new());

    let _ = set_global_default(subscriber);
}

pub fn init_tracer(trace_config: &TelemetrySettings) -> Result<TracerProvider, TraceError> {
    let resource = Config::default().with_resource(Resource::new(vec![KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME.to_string(),
        trace_config.dataset_name.clone(),
    )]));

    let span_exporter = match trace_config.otlp_endpoint.as_str() {
        EXPORT_DISABLED | "" => {
            return Ok(TracerProvider::builder().with_config(resource).build());
        }
        LOCAL_COLLECTOR => opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(trace_config.otlp_endpoint.clone())
            .with_http_client(reqwest::Client::default())
            .with_timeout(Duration::from_secs(2)),
        _ => opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(trace_config.otlp_endpoint.clone())
            .with_http_client(reqwest::Client::default())
            .with_headers(HashMap::from([
                (
                    "x-honeycomb-dataset".into(),
                    trace_config.dataset_name.clone(),
                ),
                (
                    "x-honeycomb-team".into(),
                    trace_config.honeycomb_api_key.expose_secret().into(),
                ),
            ]))
            .with_timeout(Duration::from_secs(2)),
    };

    let exporter = SpanExporterBuilder::Http(span_exporter).build_span_exporter()?;

    Ok(TracerProvider::builder()
        .with_config(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build())
}

/// Internal Lambda extension that flushes spans once the runtime reports an
/// invocation as done.
pub struct TraceFlushExtension {
    pub request_done_receiver: Mutex<UnboundedReceiver<()>>,
}

impl TraceFlushExtension {
    pub fn new(request_done_receiver: UnboundedReceiver<()>) -> Self {
        Self {
            request_done_receiver: Mutex::new(request_done_receiver),
        }
    }

    pub async fn invoke(
        &self,
        event: lambda_extension::LambdaEvent,
        tracer_provider: Arc<TracerProvider>,
    ) -> Result<(), Error> {
        match event.next {
            // NB: Internal extensions only support the INVOKE event.
            NextEvent::Shutdown(shutdown) => {
                return Err(
                    anyhow!("extension received unexpected SHUTDOWN event: {:?}", shutdown).into(),
                );
            }
            NextEvent::Invoke(_e) => {}
        }

        tracing::debug!("[extension] waiting for event to be processed");

        self.request_done_receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| anyhow!("channel is closed"))?;

        tracing::debug!("[extension] flushing logs and telemetry");

        for result in tracer_provider.force_flush() {
            if let Err(e) = result {
                tracing::warn!(error.message = %e, "Failed to flush spans");
            }
        }

        Ok(())
    }
}
