use crate::helpers::{overview_payload, research_payload, spawn_app};
use backend::domain::trend_category::TrendCategory;
use backend::send_newsletter_handler::{DigestTrigger, SendNewsletterEventHandler};
use claims::{assert_err, assert_ok};
use serde_json::json;
use tokio::sync::mpsc::unbounded_channel;
use wiremock::matchers::{any, path};
use wiremock::{Mock, ResponseTemplate};

fn accepted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "MessageID": "msg-1", "ErrorCode": 0 }))
}

#[tokio::test]
async fn oversized_scheduled_interval_fails_before_research() {
    let app = spawn_app().await;
    let (sender, _receiver) = unbounded_channel();
    let handler = SendNewsletterEventHandler::new(sender, TrendCategory::Fashion);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.research_server)
        .await;

    let trigger = DigestTrigger {
        interval_seconds: Some(u64::MAX / 4),
        ..DigestTrigger::default()
    };

    assert_err!(handler.handle(trigger, &app.digest_context()).await);
    assert!(app.delay.waits().is_empty());
}

#[tokio::test]
async fn scheduled_digest_uses_the_default_category() {
    let app = spawn_app().await;
    let (sender, _receiver) = unbounded_channel();
    let handler = SendNewsletterEventHandler::new(sender, TrendCategory::Fashion);
    app.write_recipients(
        TrendCategory::Fashion,
        json!([{ "email": "ana@example.com", "active": true }]),
    );

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(2)))
        .expect(1)
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(accepted())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let summary = assert_ok!(
        handler
            .handle(DigestTrigger::default(), &app.digest_context())
            .await
    );

    assert_eq!(summary.category, TrendCategory::Fashion);
    assert_eq!(summary.subcategory, "high-fashion");
}

#[tokio::test]
async fn scheduled_overview_goes_to_the_overview_endpoint() {
    let app = spawn_app().await;
    let (sender, _receiver) = unbounded_channel();
    let handler = SendNewsletterEventHandler::new(sender, TrendCategory::Fashion);
    app.write_recipients(
        TrendCategory::Bakery,
        json!([{ "email": "noa@example.com", "active": true }]),
    );

    Mock::given(path("/api/bakery-trends-overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_payload(&["Cakes"], "English")))
        .expect(1)
        .mount(&app.research_server)
        .await;
    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(accepted())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let trigger = DigestTrigger {
        category: Some(TrendCategory::Bakery),
        overview: true,
        interval_seconds: Some(0),
        ..DigestTrigger::default()
    };

    let summary = assert_ok!(handler.handle(trigger, &app.digest_context()).await);

    assert_eq!(summary.subject, "Weekly Bakery Trends Overview");
    assert_eq!(summary.trends_count, 1);
}
