use crate::helpers::{research_payload, spawn_app};
use backend::digest::{send_digest_to_all, send_test_digest, NewsletterError};
use backend::dispatcher::SendInterval;
use backend::domain::trend_category::TrendCategory;
use claims::{assert_err, assert_matches, assert_ok};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn accepted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "MessageID": "msg-1", "ErrorCode": 0 }))
}

#[tokio::test]
async fn digest_is_sent_to_every_active_recipient() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Fashion,
        json!([
            { "email": "ana@example.com", "active": true },
            { "email": "ben@example.com", "active": false },
            { "email": "cho@example.com", "active": true }
        ]),
    );

    Mock::given(path("/api/research"))
        .and(method("POST"))
        .and(header("x-api-key", "research-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(5)))
        .expect(1)
        .mount(&app.research_server)
        .await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(accepted())
        .expect(2)
        .mount(&app.email_server)
        .await;

    let summary = assert_ok!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            Some(SendInterval::from_secs(0)),
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    assert_eq!(summary.subcategory, "high-fashion");
    assert_eq!(summary.subject, "Weekly Fashion Trends - High Fashion");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.trends_count, 3);
    assert_eq!(summary.generated_at.as_deref(), Some("2025-10-20T08:00:00Z"));
    assert_eq!(
        summary
            .details
            .iter()
            .map(|d| d.recipient.as_str())
            .collect::<Vec<_>>(),
        vec!["ana@example.com", "cho@example.com"]
    );
    assert_eq!(app.delay.waits(), vec![std::time::Duration::ZERO]);

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
    let html = body["HtmlBody"].as_str().unwrap();
    assert!(html.contains("Trend #1"));
    assert!(html.contains("Trend #3"));
    assert!(!html.contains("Trend #4"));
    assert_eq!(html.matches(">https://source.example/shared</a>").count(), 1);
}

#[tokio::test]
async fn configured_interval_is_used_without_an_override() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Fashion,
        json!([
            { "email": "ana@example.com", "active": true },
            { "email": "cho@example.com", "active": true }
        ]),
    );

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(1)))
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(accepted())
        .mount(&app.email_server)
        .await;

    assert_ok!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            None,
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    let waits = app.delay.waits();
    assert_eq!(waits.len(), 1);
    assert!(waits[0].as_secs() >= 36 && waits[0].as_secs() <= 54);
}

#[tokio::test]
async fn email_failures_are_reported_per_recipient() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Fashion,
        json!([
            { "email": "ana@example.com", "active": true },
            { "email": "cho@example.com", "active": true }
        ]),
    );

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(2)))
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let summary = assert_ok!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            Some(SendInterval::from_secs(0)),
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 2);
    assert!(summary.details.iter().all(|d| d.error.is_some()));
}

#[tokio::test]
async fn unknown_prompt_stops_before_research() {
    let app = spawn_app().await;

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(1)))
        .expect(0)
        .mount(&app.research_server)
        .await;

    let outcome = send_digest_to_all(
        &app.digest_context(),
        TrendCategory::Fashion,
        Some("streetwear"),
        Some(SendInterval::from_secs(0)),
        &mut StdRng::seed_from_u64(3),
    )
    .await;

    let error = assert_err!(outcome);
    assert_eq!(error.stage(), "prompt");
    assert_matches!(error, NewsletterError::PromptNotFound { .. });
}

#[tokio::test]
async fn research_errors_stop_before_any_email() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Fashion,
        json!([{ "email": "ana@example.com", "active": true }]),
    );

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(accepted())
        .expect(0)
        .mount(&app.email_server)
        .await;

    let error = assert_err!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            Some(SendInterval::from_secs(0)),
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    assert_eq!(error.stage(), "fetch");
}

#[tokio::test]
async fn unparseable_research_response_is_a_parse_error() {
    let app = spawn_app().await;

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"trends\": ["))
        .mount(&app.research_server)
        .await;

    let error = assert_err!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            Some(SendInterval::from_secs(0)),
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    assert_eq!(error.stage(), "parse");
}

#[tokio::test]
async fn missing_recipient_list_is_a_recipients_error() {
    let app = spawn_app().await;

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(1)))
        .mount(&app.research_server)
        .await;

    let error = assert_err!(
        send_digest_to_all(
            &app.digest_context(),
            TrendCategory::Bakery,
            None,
            Some(SendInterval::from_secs(0)),
            &mut StdRng::seed_from_u64(3),
        )
        .await
    );

    assert_eq!(error.stage(), "recipients");
}

#[tokio::test]
async fn test_digest_goes_to_one_address_with_a_test_subject() {
    let app = spawn_app().await;

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(2)))
        .mount(&app.research_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(accepted())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let result = assert_ok!(
        send_test_digest(
            &app.digest_context(),
            TrendCategory::Bakery,
            None,
            "tester@example.com",
        )
        .await
    );

    assert_eq!(result.recipient, "tester@example.com");
    assert_eq!(result.message_id.as_deref(), Some("msg-1"));
    assert!(app.delay.waits().is_empty());

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
    assert_eq!(body["Subject"], "[TEST] Weekly Bakery Trends - Hosting Platters");
    assert_eq!(body["To"], "tester@example.com");
}

#[tokio::test]
async fn test_digest_to_an_invalid_address_is_a_send_error() {
    let app = spawn_app().await;

    Mock::given(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(research_payload(1)))
        .mount(&app.research_server)
        .await;

    let error = assert_err!(
        send_test_digest(
            &app.digest_context(),
            TrendCategory::Fashion,
            None,
            "definitely-not-email",
        )
        .await
    );

    assert_eq!(error.stage(), "send");
    assert_matches!(error, NewsletterError::RecipientSendFailed { .. });
}
