// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleLensError {
    #[error("Vision API credential is not configured")]
    ConfigurationMissing,

    #[error("No usable image after preprocessing")]
    NoUsableImage,

    #[error("Vision API transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Vision API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Vision API call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Vision API rate limit hit: {0}")]
    RateLimited(String),

    #[error("Malformed model output: {message}")]
    MalformedOutput {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Model reply contained {0} text blocks, expected exactly one")]
    MissingTextBlock(usize),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Structured classification set where the error is raised, so retry decisions
/// never depend on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConfigurationMissing,
    NoUsableImage,
    Network,
    Timeout,
    RateLimited,
    MalformedOutput,
    InvalidInput,
    Storage,
    Unknown,
}

impl StyleLensError {
    pub fn malformed(message: impl Into<String>) -> Self {
        StyleLensError::MalformedOutput {
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StyleLensError::ConfigurationMissing => ErrorKind::ConfigurationMissing,
            StyleLensError::NoUsableImage => ErrorKind::NoUsableImage,
            StyleLensError::Transport(e) if e.is_timeout() => ErrorKind::Timeout,
            StyleLensError::Transport(_) => ErrorKind::Network,
            StyleLensError::Api { status: 429, .. } => ErrorKind::RateLimited,
            StyleLensError::Api { .. } => ErrorKind::Network,
            StyleLensError::Timeout(_) => ErrorKind::Timeout,
            StyleLensError::RateLimited(_) => ErrorKind::RateLimited,
            StyleLensError::MalformedOutput { .. } | StyleLensError::MissingTextBlock(_) => {
                ErrorKind::MalformedOutput
            }
            StyleLensError::ImageProcessing(_) | StyleLensError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            StyleLensError::Redis(_) => ErrorKind::Storage,
            StyleLensError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Network failures, timeouts, 429 and 5xx responses are worth another attempt.
    /// A 4xx other than 429 is the caller's fault and is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            StyleLensError::Api { status, .. } => *status == 429 || *status >= 500,
            other => matches!(
                other.kind(),
                ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimited
            ),
        }
    }
}

impl ResponseError for StyleLensError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NoUsableImage | ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Network | ErrorKind::MalformedOutput => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Storage | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self.kind() {
            ErrorKind::ConfigurationMissing => "Service not configured",
            ErrorKind::NoUsableImage => "No usable image",
            ErrorKind::Network => "AI service error",
            ErrorKind::Timeout => "AI service timeout",
            ErrorKind::RateLimited => "AI service busy",
            ErrorKind::MalformedOutput => "AI response error",
            ErrorKind::InvalidInput => "Validation error",
            ErrorKind::Storage => "Database error",
            ErrorKind::Unknown => "Internal error",
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "kind": self.kind(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        let busy = StyleLensError::Api {
            status: 503,
            body: "overloaded".into(),
        };
        let throttled = StyleLensError::Api {
            status: 429,
            body: String::new(),
        };
        assert!(busy.is_retryable());
        assert_eq!(throttled.kind(), ErrorKind::RateLimited);
        assert!(throttled.is_retryable());
        assert!(StyleLensError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(StyleLensError::RateLimited("slow down".into()).is_retryable());
    }

    #[test]
    fn client_and_parse_errors_are_terminal() {
        let bad_request = StyleLensError::Api {
            status: 400,
            body: "bad".into(),
        };
        assert!(!bad_request.is_retryable());
        assert!(!StyleLensError::malformed("not json").is_retryable());
        assert!(!StyleLensError::MissingTextBlock(0).is_retryable());
        assert!(!StyleLensError::ConfigurationMissing.is_retryable());
        assert!(!StyleLensError::NoUsableImage.is_retryable());
    }

    #[test]
    fn error_response_reports_kind_and_retryability() {
        let err = StyleLensError::RateLimited("quota".into());
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
