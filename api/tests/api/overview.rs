use crate::helpers::{overview_payload, spawn_app, TestApp, CRON_SECRET};
use backend::domain::trend_category::TrendCategory;
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use serde_json::{json, Value};
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

const BAKERY_CATEGORIES: [&str; 4] = ["Artisan Breads", "Hosting Platters", "Cakes", "Pastries"];

async fn mount_accepting_email_server(app: &TestApp, expected: u64) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "MessageID": "msg-1", "ErrorCode": 0 })),
        )
        .expect(expected)
        .mount(&app.email_server)
        .await;
}

async fn sent_html(app: &TestApp) -> String {
    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let sent: Value = serde_json::from_slice(&email_request.body).unwrap();
    sent["HtmlBody"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn bakery_overview_is_delivered_to_bakery_recipients() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Bakery,
        json!([
            { "email": "noa@example.com", "active": true },
            { "email": "ori@example.com", "active": false },
            { "email": "reut@example.com", "active": true }
        ]),
    );

    Mock::given(path("/api/bakery-trends-overview"))
        .and(method("POST"))
        .and(header("x-api-key", "research-key"))
        .and(body_json(json!({ "language": "English", "production": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(overview_payload(&BAKERY_CATEGORIES, "English")),
        )
        .expect(1)
        .mount(&app.research_server)
        .await;
    mount_accepting_email_server(&app, 2).await;

    let response = app.post_send_overview(&json!({}), Some(CRON_SECRET)).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["category"], "bakery");
    assert_eq!(body["subcategory"], "overview");
    assert_eq!(body["subject"], "Weekly Bakery Trends Overview");
    assert_eq!(body["total"], 2);
    assert_eq!(body["successful"], 2);
    // Every overview category is kept.
    assert_eq!(body["trends_count"], 4);

    let html = sent_html(&app).await;
    for name in BAKERY_CATEGORIES {
        assert!(html.contains(&format!(">{}</h2>", name)), "missing {}", name);
    }
    assert!(html.contains("Artisan Breads (English)"));
    assert!(html.contains(r#"dir="ltr""#));
}

#[tokio::test]
async fn overview_send_requires_the_cron_secret() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.research_server)
        .await;

    let response = app.post_send_overview(&json!({}), Some("wrong")).await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(r#"Bearer"#, response.headers()["WWW-Authenticate"]);
}

#[tokio::test]
async fn overview_send_rejects_an_oversized_interval() {
    let app = spawn_app().await;

    let response = app
        .post_send_overview(&json!({ "interval_seconds": u64::MAX }), Some(CRON_SECRET))
        .await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stage"], "validation");
}

#[tokio::test]
async fn overview_research_failures_are_bad_gateway() {
    let app = spawn_app().await;
    app.write_recipients(
        TrendCategory::Bakery,
        json!([{ "email": "noa@example.com", "active": true }]),
    );

    Mock::given(path("/api/bakery-trends-overview"))
        .respond_with(ResponseTemplate::new(500).set_body_string("research crashed"))
        .mount(&app.research_server)
        .await;
    mount_accepting_email_server(&app, 0).await;

    let response = app.post_send_overview(&json!({}), Some(CRON_SECRET)).await;

    assert_eq!(502, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stage"], "fetch");
}

#[tokio::test]
async fn hebrew_test_overview_is_right_to_left() {
    let app = spawn_app().await;
    let email: String = SafeEmail().fake();

    Mock::given(path("/api/trends-overview"))
        .and(body_json(json!({ "language": "Hebrew", "production": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(overview_payload(&["Street Style", "Tailoring"], "Hebrew")),
        )
        .expect(1)
        .mount(&app.research_server)
        .await;
    mount_accepting_email_server(&app, 1).await;

    let response = app
        .post_test_overview(&json!({
            "email": email,
            "category": "fashion",
            "language": "Hebrew"
        }))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["category"], "fashion");
    assert_eq!(body["result"]["recipient"], email.as_str());

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let sent: Value = serde_json::from_slice(&email_request.body).unwrap();
    assert_eq!(sent["Subject"], "[TEST] Weekly Fashion Trends Overview");
    let html = sent["HtmlBody"].as_str().unwrap();
    assert!(html.contains(r#"<html lang="he" dir="rtl">"#));
    assert!(html.contains("Street Style (Hebrew)"));
}

#[tokio::test]
async fn test_overview_returns_400_for_invalid_addresses() {
    let app = spawn_app().await;

    let response = app.post_test_overview(&json!({ "email": "nope" })).await;

    assert_eq!(400, response.status().as_u16());
}
