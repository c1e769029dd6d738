use thiserror::Error;

/// Errors returned by Coset operations.
///
/// `SpendingLimitExceeded` and `InsufficientBalance` render as the exact
/// messages callers match on, so their `Display` carries no prefix.
#[derive(Debug, Error)]
pub enum CosetError {
    #[error("config error: {0}")]
    Config(String),

    #[error("Spending limit exceeded")]
    SpendingLimitExceeded,

    #[error("Insufficient token balance for payment")]
    InsufficientBalance { required: String, available: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("http error: status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("stale data: {0}")]
    StaleData(String),

    #[error("No data found")]
    NoData,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CosetError {
    /// Classify a reqwest transport failure. An elapsed deadline is reported
    /// as cancellation so callers can tell it apart from a dead endpoint.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CosetError::Cancelled(format!("{context}: deadline elapsed"))
        } else {
            CosetError::Network(format!("{context}: {err}"))
        }
    }

    /// True for failures decided locally, before anything touched the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CosetError::Config(_) | CosetError::SpendingLimitExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_messages_are_unprefixed() {
        assert_eq!(
            CosetError::SpendingLimitExceeded.to_string(),
            "Spending limit exceeded"
        );
        let err = CosetError::InsufficientBalance {
            required: "10".to_string(),
            available: "5".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient token balance for payment");
    }

    #[test]
    fn http_error_carries_status() {
        let err = CosetError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "http error: status 502: bad gateway");
    }

    #[test]
    fn only_guard_and_config_are_local() {
        assert!(CosetError::SpendingLimitExceeded.is_local());
        assert!(CosetError::Config("x".into()).is_local());
        assert!(!CosetError::Network("x".into()).is_local());
        assert!(!CosetError::NoData.is_local());
    }
}
