pub mod email_client;
pub mod prompt_store;
pub mod recipient_source;
pub mod sender;
pub mod subscriber_email;
pub mod trend_category;
pub mod trend_entry;
pub mod trends_research;
