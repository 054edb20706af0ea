use crate::domain::subscriber_email::SubscriberEmail;
use unicode_segmentation::UnicodeSegmentation;

/// Display name shown in the `From` header of outgoing mail.
#[derive(Debug, Clone)]
pub struct SenderName(String);

impl SenderName {
    pub fn parse(s: String) -> Result<SenderName, String> {
        let is_empty_or_whitespace = s.trim().is_empty();

        let is_too_long = s.graphemes(true).count() > 256;

        // These would break the `Name <address>` mailbox syntax.
        let forbidden_characters = ['<', '>', '"', '\\', '\r', '\n'];
        let contains_forbidden_characters = s.chars().any(|g| forbidden_characters.contains(&g));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
            Err(format!("{} is not a valid sender name", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for SenderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Sender {
    pub email: SubscriberEmail,
    pub name: SenderName,
}

impl Sender {
    pub fn new(email: SubscriberEmail, name: SenderName) -> Self {
        Self { email, name }
    }

    /// `Name <address>` as expected in a `From` header.
    pub fn mailbox(&self) -> String {
        format!("{} <{}>", self.name.as_ref(), self.email)
    }
}
