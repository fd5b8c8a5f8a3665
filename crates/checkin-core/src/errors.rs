/// Invalid input to the week clock.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),
    #[error("malformed message timestamp: {0}")]
    MalformedTs(String),
    #[error("invalid time of day (expected HH:MM): {0}")]
    InvalidTimeOfDay(String),
}

/// Typed errors from the chat platform.
/// `MessageNotFound` is the only variant callers recover from.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PlatformError {
    /// The message behind a handle was deleted or never existed.
    #[error("message not found")]
    MessageNotFound,
    /// The platform answered with an error code.
    #[error("{method} failed: {code}")]
    Api { method: &'static str, code: String },
    #[error("rate limited on {method}")]
    RateLimited {
        method: &'static str,
        retry_after_secs: Option<u64>,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("socket error: {0}")]
    Socket(String),
}

impl PlatformError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MessageNotFound => "message_not_found",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Socket(_) => "socket",
        }
    }

    /// Whether a socket session should reconnect after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network(_) | Self::Socket(_)
        )
    }
}
