//! Completion failure classification.
//!
//! Transport outcomes are classified from the HTTP status or the `reqwest`
//! error kind. Free-text diagnostics without a status (e.g. an error event in
//! the middle of a stream) fall back to keyword matching, which can misfire on
//! messages that happen to mention one of the keywords.

use reqwest::StatusCode;
use thiserror::Error;

const DIAGNOSTIC_LIMIT: usize = 100;

/// Why a completion could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionFailure {
    /// Missing, invalid or rejected credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service is throttling requests.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The requested model does not exist or is not served.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl CompletionFailure {
    /// Classifies a non-success HTTP response.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(message),
            StatusCode::NOT_FOUND => Self::ModelUnavailable(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Self::Network(message),
            _ => Self::Other(format!("API Error ({}): {}", status.as_u16(), message)),
        }
    }

    /// Classifies a transport error raised by `reqwest`.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, err.to_string());
        }
        if err.is_connect() || err.is_timeout() || err.is_request() {
            return Self::Network(err.to_string());
        }
        Self::Other(err.to_string())
    }

    /// Classifies a bare diagnostic by keyword, first match wins:
    /// credential, rate limit, network, model.
    pub fn classify_text(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["api key", "unauthorized", "401"]) {
            Self::Unauthorized(message)
        } else if has(&["rate limit", "429"]) {
            Self::RateLimited(message)
        } else if has(&["network", "fetch"]) {
            Self::Network(message)
        } else if has(&["model", "not found", "404"]) {
            Self::ModelUnavailable(message)
        } else {
            Self::Other(message)
        }
    }

    /// Short category name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::Network(_) => "network",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Other(_) => "other",
        }
    }

    /// Display-ready text shown in place of a reply.
    pub fn apology(&self) -> String {
        match self {
            Self::Unauthorized(_) => {
                "Shit... I lost my key... can you help me? Or just ask someone to help me out here..."
                    .to_string()
            }
            Self::RateLimited(_) => {
                "Slow down... just because it exists doesn't mean it's limitless... wait a bit and come back..."
                    .to_string()
            }
            Self::Network(_) => {
                "You're offline... don't guess I'll work directly from your mind... perhaps..... NO!"
                    .to_string()
            }
            Self::ModelUnavailable(_) => {
                "Damn, this AI model is dead, you should try a new one...".to_string()
            }
            Self::Other(message) => {
                let diagnostic: String = message.chars().take(DIAGNOSTIC_LIMIT).collect();
                format!("Yeah, we're in trouble: {}... Please ask for some help...", diagnostic)
            }
        }
    }
}

impl From<reqwest::Error> for CompletionFailure {
    fn from(err: reqwest::Error) -> Self {
        CompletionFailure::from_reqwest(&err)
    }
}
