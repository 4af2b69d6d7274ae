use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failures while driving the document session. Each variant has a fixed
/// recovery scope, decided by the pipeline stage that observes it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Nested root host missing or exposing no shadow root.
    #[error("nested root <{0}> unavailable")]
    RootUnavailable(String),

    /// Element handle invalidated by a re-render between resolution and use.
    #[error("stale element reference: {0}")]
    StaleReference(String),

    #[error("navigation did not reach the expected location within {0:?}")]
    NavigationTimeout(Duration),

    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// Any other WebDriver-level error (session gone, script error, bad response).
    #[error("session error: {0}")]
    Session(String),

    #[error("WebDriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ScrapeError {
    pub fn is_stale(&self) -> bool {
        matches!(self, ScrapeError::StaleReference(_))
    }
}

/// Odds factor text that does not parse as a decimal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("odds text {0:?} is not numeric")]
pub struct ParseFailure(pub String);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("messaging transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("messaging API rejected request ({code}): {description}")]
    Api { code: i64, description: String },
}
