use crate::domain::sender::Sender;
use crate::domain::subscriber_email::SubscriberEmail;
use async_trait::async_trait;

/// A pre-rendered message body. The variant is the is-formatted flag.
#[derive(Debug, Clone)]
pub enum EmailBody {
    Html(String),
    Text(String),
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    /// Sends one message and returns the provider's message identifier.
    async fn send_email_to(
        &self,
        sender: &Sender,
        recipient: &SubscriberEmail,
        subject: &str,
        body: &EmailBody,
    ) -> Result<String, anyhow::Error>;
}
