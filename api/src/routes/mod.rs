mod health_check;
mod newsletter;
mod prompts;
mod trends;

pub use health_check::*;
pub use newsletter::*;
pub use prompts::*;
pub use trends::*;

use actix_web::http::header::{HeaderValue, WWW_AUTHENTICATE};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use backend::digest::NewsletterError;
use backend::domain::trend_category::TrendCategory;
pub use backend::utils::error_chain_fmt;
use serde_json::json;

/// Errors of the routes that run the research and newsletter pipeline.
#[derive(thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error(transparent)]
    Newsletter(#[from] NewsletterError),
}

impl std::fmt::Debug for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::ValidationError(_) => "validation",
            PipelineError::AuthError(_) => "authentication",
            PipelineError::Newsletter(e) => e.stage(),
        }
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::ValidationError(_) => StatusCode::BAD_REQUEST,
            PipelineError::AuthError(_) => StatusCode::UNAUTHORIZED,
            PipelineError::Newsletter(e) => match e.stage() {
                "prompt" => StatusCode::NOT_FOUND,
                "fetch" | "parse" => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            PipelineError::Newsletter(e) => std::error::Error::source(e)
                .map(|source| source.to_string())
                .unwrap_or_else(|| e.to_string()),
            other => other.to_string(),
        };

        let mut response = HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
            "stage": self.stage(),
            "details": details,
        }));

        if let PipelineError::AuthError(_) = self {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Parses an optional category, falling back to `default` when absent.
pub fn parse_category(
    category: Option<&str>,
    default: TrendCategory,
) -> Result<TrendCategory, String> {
    match category.map(str::trim) {
        None | Some("") => Ok(default),
        Some(category) => category.parse(),
    }
}
