pub mod adapters;
pub mod configuration;
pub mod digest;
pub mod dispatcher;
pub mod domain;
pub mod normalizer;
#[cfg(feature = "lambda")]
pub mod send_newsletter_handler;
pub mod template;
pub mod utils;
