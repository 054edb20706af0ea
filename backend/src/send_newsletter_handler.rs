use crate::digest::{send_digest_to_all, send_overview_to_all, DigestContext, DigestSummary};
use crate::dispatcher::SendInterval;
use crate::domain::trend_category::TrendCategory;
use aws_lambda_events::event::eventbridge::EventBridgeEvent;
use lambda_runtime::{Error, LambdaEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// EventBridge event the schedule fires with.
pub type ScheduledDigestEvent = EventBridgeEvent<DigestTrigger>;

/// `detail` of the scheduled event. A schedule can put a category,
/// subcategory or interval there to override the defaults, or ask for the
/// overview digest instead of a prompt digest. `{}` keeps every default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestTrigger {
    pub category: Option<TrendCategory>,
    pub subcategory: Option<String>,
    pub interval_seconds: Option<u64>,
    pub overview: bool,
    pub language: Option<String>,
}

/// Runs one digest per scheduled invocation, then signals the flush extension.
pub struct SendNewsletterEventHandler {
    request_done_sender: UnboundedSender<()>,
    default_category: TrendCategory,
}

impl SendNewsletterEventHandler {
    pub fn new(request_done_sender: UnboundedSender<()>, default_category: TrendCategory) -> Self {
        Self {
            request_done_sender,
            default_category,
        }
    }

    pub async fn invoke(
        &self,
        event: LambdaEvent<ScheduledDigestEvent>,
        ctx: &DigestContext<'_>,
    ) -> Result<DigestSummary, Error> {
        let result = self.handle(event.payload.detail, ctx).await;

        let _ = self.request_done_sender.send(()).map_err(Box::new);

        result
    }

    #[tracing::instrument(name = "handle_scheduled_digest", skip(self, ctx))]
    pub async fn handle(
        &self,
        trigger: DigestTrigger,
        ctx: &DigestContext<'_>,
    ) -> Result<DigestSummary, Error> {
        let interval = trigger
            .interval_seconds
            .map(SendInterval::parse)
            .transpose()
            .map_err(|e| {
                tracing::error!(error.message = %e, "Rejected the scheduled interval");
                e
            })?;
        let category = trigger.category.unwrap_or(self.default_category);
        let mut rng = StdRng::from_entropy();

        let outcome = match trigger.overview {
            true => {
                send_overview_to_all(ctx, category, trigger.language.as_deref(), interval, &mut rng)
                    .await
            }
            false => {
                send_digest_to_all(
                    ctx,
                    category,
                    trigger.subcategory.as_deref(),
                    interval,
                    &mut rng,
                )
                .await
            }
        };

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    total = summary.total,
                    successful = summary.successful,
                    failed = summary.failed,
                    "Scheduled {} digest finished",
                    category
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    stage = e.stage(),
                    "Scheduled {} digest failed",
                    category
                );
                Err(e.into())
            }
        }
    }
}
