use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollErrorKind {
    Network,
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("network error: {0}")]
    Network(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl PollError {
    pub fn kind(&self) -> PollErrorKind {
        match self {
            PollError::Network(_) => PollErrorKind::Network,
            PollError::Protocol(_) => PollErrorKind::Protocol,
        }
    }
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PollError::Protocol(err.to_string())
        } else {
            PollError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Protocol(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("sequence_length must be positive")]
    EmptySequence,
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("max_backoff ({max_ms} ms) must not be below base_backoff ({base_ms} ms)")]
    BackoffBounds { base_ms: u128, max_ms: u128 },
    #[error("stall_threshold must be at least 1")]
    ZeroStallThreshold,
    #[error("layout spacing must be a positive finite number")]
    InvalidSpacing,
}
