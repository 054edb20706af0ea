use crate::domain::email_client::{EmailBody, EmailClient};
use crate::domain::sender::Sender;
use crate::domain::subscriber_email::SubscriberEmail;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct PostmarkEmailClient {
    http_client: Client,
    base_url: String,
    authorization_token: Secret<String>,
}

impl PostmarkEmailClient {
    pub fn new(
        base_url: String,
        authorization_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the email API HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            authorization_token,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_body: Option<&'a str>,
    message_stream: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    #[serde(rename = "MessageID")]
    message_id: String,
}

#[async_trait]
impl EmailClient for PostmarkEmailClient {
    #[tracing::instrument(
        name = "Sending email through Postmark",
        skip(self, sender, body),
        fields(recipient = %recipient)
    )]
    async fn send_email_to(
        &self,
        sender: &Sender,
        recipient: &SubscriberEmail,
        subject: &str,
        body: &EmailBody,
    ) -> Result<String, anyhow::Error> {
        let url = format!("{}/email", self.base_url);
        let from = sender.mailbox();

        let (html_body, text_body) = match body {
            EmailBody::Html(content) => (Some(content.as_str()), None),
            EmailBody::Text(content) => (None, Some(content.as_str())),
        };

        let request_body = SendEmailRequest {
            from: &from,
            to: recipient.as_ref(),
            subject,
            html_body,
            text_body,
            message_stream: "outbound",
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await
            .context("Failed to reach the email API")?
            .error_for_status()
            .context("The email API rejected the message")?;

        let response: SendEmailResponse = response
            .json()
            .await
            .context("The email API response did not contain a message id")?;

        Ok(response.message_id)
    }
}
