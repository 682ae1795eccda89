//! Error types for debate generation, judging and analysis.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single model gateway call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Model '{model}' returned an empty response")]
    EmptyResponse { model: String },

    #[error("Request error: {0}")]
    Request(String),
}

impl GatewayError {
    /// Whether a retry at the gateway layer may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, GatewayError::Request(_))
    }
}

impl From<async_openai::error::OpenAIError> for GatewayError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match err {
            OpenAIError::Reqwest(e) => {
                if e.status().map(|s| s.as_u16()) == Some(429) {
                    GatewayError::RateLimited(e.to_string())
                } else {
                    GatewayError::Network(e.to_string())
                }
            }
            other => {
                let message = other.to_string();
                let lowered = message.to_lowercase();
                if lowered.contains("rate limit") || lowered.contains("rate_limit") {
                    GatewayError::RateLimited(message)
                } else {
                    GatewayError::Request(message)
                }
            }
        }
    }
}

/// A judgment that parsed as JSON but broke a schema or range rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Winner must be \"PRO\" or \"CON\", got {0:?}")]
    InvalidWinner(String),

    #[error("Confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("Score {category}.{side} = {value} is outside [{min}, {max}]")]
    ScoreOutOfRange {
        category: String,
        side: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Judge output that could not be accepted as a judgment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("No JSON object found in judge output")]
    NoJsonObject,

    #[error("JSON object does not match the judgment schema: {0}")]
    Malformed(String),

    #[error("Judgment failed validation: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Sequencing error: {0}")]
    Sequencing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Debate cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
