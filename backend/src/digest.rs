//! The newsletter pipeline: prompt, research, normalize, render, dispatch.

use crate::configuration::ResearchApiSettings;
use crate::dispatcher::{Delay, DispatchResult, Dispatcher, Message, SendInterval};
use crate::domain::email_client::{EmailBody, EmailClient};
use crate::domain::prompt_store::{PromptDocument, PromptStore};
use crate::domain::recipient_source::RecipientSource;
use crate::domain::sender::Sender;
use crate::domain::trend_category::TrendCategory;
use crate::domain::trend_entry::TrendsReport;
use crate::domain::trends_research::{
    OverviewRequest, ResearchRequest, TrendsError, TrendsResearch,
};
use crate::normalizer::normalize_report;
use crate::template::{render_newsletter_html, render_overview_html};
use crate::utils::error_chain_fmt;
use anyhow::Context;
use rand::Rng;
use serde::Serialize;

#[derive(thiserror::Error)]
pub enum NewsletterError {
    #[error("No prompt {subcategory} exists for {category}")]
    PromptNotFound {
        category: TrendCategory,
        subcategory: String,
    },
    #[error("{0}")]
    MissingConfiguration(String),
    #[error(transparent)]
    Trends(#[from] TrendsError),
    #[error("Failed to load the recipient list")]
    RecipientsUnavailable(#[source] anyhow::Error),
    #[error("Failed to send to {recipient}: {reason}")]
    RecipientSendFailed { recipient: String, reason: String },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for NewsletterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl NewsletterError {
    /// Pipeline stage the error was raised in.
    pub fn stage(&self) -> &'static str {
        match self {
            NewsletterError::PromptNotFound { .. } => "prompt",
            NewsletterError::MissingConfiguration(_) => "configuration",
            NewsletterError::Trends(TrendsError::MissingConfiguration(_)) => "configuration",
            NewsletterError::Trends(TrendsError::InvalidResponseFormat(_)) => "parse",
            NewsletterError::Trends(_) => "fetch",
            NewsletterError::RecipientsUnavailable(_) => "recipients",
            NewsletterError::RecipientSendFailed { .. } => "send",
            NewsletterError::UnexpectedError(_) => "send",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestSummary {
    pub category: TrendCategory,
    pub subcategory: String,
    pub subject: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<DispatchResult>,
    pub trends_count: usize,
    pub generated_at: Option<String>,
}

/// Everything one digest run needs. Collaborators are borrowed so the HTTP
/// API and the scheduled job can each hand in their own.
pub struct DigestContext<'a> {
    pub email_client: &'a dyn EmailClient,
    pub research: &'a dyn TrendsResearch,
    pub prompts: &'a dyn PromptStore,
    pub recipients: &'a dyn RecipientSource,
    pub delay: &'a dyn Delay,
    pub sender: &'a Sender,
    pub research_settings: &'a ResearchApiSettings,
    pub interval: SendInterval,
}

/// Subcategory label of overview digests, which cover a whole category.
pub const OVERVIEW_SUBCATEGORY: &str = "overview";

/// Category the overview is sent for when a caller names none.
pub const DEFAULT_OVERVIEW_CATEGORY: TrendCategory = TrendCategory::Bakery;

/// A rendered digest, ready to send.
pub struct Digest {
    pub category: TrendCategory,
    pub subcategory: String,
    pub subject: String,
    pub report: TrendsReport,
    pub html: String,
}

#[tracing::instrument(name = "Loading prompt", skip(prompts))]
pub async fn load_prompt(
    prompts: &dyn PromptStore,
    category: TrendCategory,
    subcategory: &str,
) -> Result<PromptDocument, NewsletterError> {
    prompts
        .get_prompt(category, subcategory)
        .await
        .context("Failed to read the prompt store")?
        .ok_or_else(|| NewsletterError::PromptNotFound {
            category,
            subcategory: subcategory.to_string(),
        })
}

/// Runs the research API for `prompt` and normalizes what comes back.
#[tracing::instrument(name = "Fetching trends", skip(research, prompt, settings))]
pub async fn fetch_trends(
    research: &dyn TrendsResearch,
    settings: &ResearchApiSettings,
    category: TrendCategory,
    prompt: &str,
    images_num: Option<u32>,
) -> Result<TrendsReport, TrendsError> {
    let request = ResearchRequest {
        research_type: settings.research_type.clone(),
        prompt: prompt.to_string(),
        images_num: images_num.unwrap_or(settings.images_num),
        trend_category: category,
    };

    let payload = research.research(&request).await?;
    let report = normalize_report(&payload, Some(settings.keep_last));

    tracing::info!(
        trends = report.total_trends(),
        "Research returned {} trends",
        report.total_trends()
    );

    Ok(report)
}

#[tracing::instrument(name = "Building digest", skip(ctx))]
pub async fn build_digest(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    subcategory: &str,
) -> Result<Digest, NewsletterError> {
    let prompt = load_prompt(ctx.prompts, category, subcategory).await?;
    let report = fetch_trends(
        ctx.research,
        ctx.research_settings,
        category,
        &prompt.prompt,
        None,
    )
    .await?;
    let html = render_newsletter_html(category, &prompt.name, &report);

    Ok(Digest {
        category,
        subcategory: subcategory.to_string(),
        subject: format!(
            "Weekly {} Trends - {}",
            category.display_name(),
            prompt.name
        ),
        report,
        html,
    })
}

/// Runs the overview research of `category`. Every entry of the overview is
/// kept.
#[tracing::instrument(name = "Fetching trends overview", skip(research, settings))]
pub async fn fetch_overview(
    research: &dyn TrendsResearch,
    settings: &ResearchApiSettings,
    category: TrendCategory,
    language: Option<&str>,
) -> Result<TrendsReport, TrendsError> {
    let language = language
        .map(str::trim)
        .filter(|language| !language.is_empty())
        .unwrap_or(settings.overview_language.as_str());
    let request = OverviewRequest {
        language: language.to_string(),
        production: settings.production,
    };

    let payload = research.overview(category, &request).await?;
    let mut report = normalize_report(&payload, None);
    report.language.get_or_insert(request.language);

    tracing::info!(
        categories = report.total_trends(),
        "Overview returned {} categories",
        report.total_trends()
    );

    Ok(report)
}

#[tracing::instrument(name = "Building overview digest", skip(ctx))]
pub async fn build_overview(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    language: Option<&str>,
) -> Result<Digest, NewsletterError> {
    let report = fetch_overview(ctx.research, ctx.research_settings, category, language).await?;
    let language = report
        .language
        .as_deref()
        .unwrap_or(ctx.research_settings.overview_language.as_str());
    let html = render_overview_html(category, language, &report);

    Ok(Digest {
        category,
        subcategory: OVERVIEW_SUBCATEGORY.to_string(),
        subject: format!("Weekly {} Trends Overview", category.display_name()),
        report,
        html,
    })
}

/// Sends the digest of `category` to every active recipient, pausing
/// between sends.
#[tracing::instrument(name = "Sending digest to all recipients", skip(ctx, rng))]
pub async fn send_digest_to_all<R: Rng + Send>(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    subcategory: Option<&str>,
    interval_override: Option<SendInterval>,
    rng: &mut R,
) -> Result<DigestSummary, NewsletterError> {
    let subcategory = category.resolve_subcategory(subcategory);
    let digest = build_digest(ctx, category, subcategory).await?;
    deliver_to_all(ctx, digest, interval_override, rng).await
}

/// Sends the overview of `category` to every active recipient of that
/// category, pausing between sends.
#[tracing::instrument(name = "Sending overview to all recipients", skip(ctx, rng))]
pub async fn send_overview_to_all<R: Rng + Send>(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    language: Option<&str>,
    interval_override: Option<SendInterval>,
    rng: &mut R,
) -> Result<DigestSummary, NewsletterError> {
    let digest = build_overview(ctx, category, language).await?;
    deliver_to_all(ctx, digest, interval_override, rng).await
}

/// Sends one digest to `email` only, without pacing.
#[tracing::instrument(name = "Sending test digest", skip(ctx))]
pub async fn send_test_digest(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    subcategory: Option<&str>,
    email: &str,
) -> Result<DispatchResult, NewsletterError> {
    let subcategory = category.resolve_subcategory(subcategory);
    let digest = build_digest(ctx, category, subcategory).await?;
    deliver_test(ctx, digest, email).await
}

#[tracing::instrument(name = "Sending test overview", skip(ctx))]
pub async fn send_test_overview(
    ctx: &DigestContext<'_>,
    category: TrendCategory,
    language: Option<&str>,
    email: &str,
) -> Result<DispatchResult, NewsletterError> {
    let digest = build_overview(ctx, category, language).await?;
    deliver_test(ctx, digest, email).await
}

async fn deliver_to_all<R: Rng + Send>(
    ctx: &DigestContext<'_>,
    digest: Digest,
    interval_override: Option<SendInterval>,
    rng: &mut R,
) -> Result<DigestSummary, NewsletterError> {
    let recipients = ctx
        .recipients
        .active_recipients(digest.category)
        .await
        .map_err(NewsletterError::RecipientsUnavailable)?;

    let body = EmailBody::Html(digest.html);
    let message = Message {
        sender: ctx.sender,
        subject: &digest.subject,
        body: &body,
    };
    let interval = interval_override.unwrap_or(ctx.interval);

    let details = Dispatcher::new(ctx.email_client, ctx.delay)
        .dispatch(&recipients, &message, interval, rng)
        .await;

    let successful = details.iter().filter(|result| result.success).count();

    Ok(DigestSummary {
        category: digest.category,
        subcategory: digest.subcategory,
        subject: digest.subject,
        total: details.len(),
        successful,
        failed: details.len() - successful,
        details,
        trends_count: digest.report.total_trends(),
        generated_at: digest.report.generated_at,
    })
}

async fn deliver_test(
    ctx: &DigestContext<'_>,
    digest: Digest,
    email: &str,
) -> Result<DispatchResult, NewsletterError> {
    let subject = format!("[TEST] {}", digest.subject);
    let body = EmailBody::Html(digest.html);
    let message = Message {
        sender: ctx.sender,
        subject: &subject,
        body: &body,
    };

    // A single recipient never waits, so the rng is never drawn from.
    let mut rng = rand::rngs::mock::StepRng::new(0, 0);
    let result = Dispatcher::new(ctx.email_client, ctx.delay)
        .dispatch(&[email.to_string()], &message, SendInterval::from_secs(0), &mut rng)
        .await
        .pop()
        .context("The dispatcher returned no result")?;

    match result.success {
        true => Ok(result),
        false => Err(NewsletterError::RecipientSendFailed {
            recipient: result.recipient,
            reason: result.error.unwrap_or_default(),
        }),
    }
}
