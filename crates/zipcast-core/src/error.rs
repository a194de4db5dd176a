//! Shared error types for zipcast.
//!
//! Library crates wrap these in their own enums; every error exposes a
//! `user_message()` suitable for printing to a person instead of a log.

use thiserror::Error;

/// Transport-level failures talking to a remote service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::Transport(_) => "A network error occurred. Please try again.",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() || has_timed_out_io(&self) {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else {
            NetworkError::Transport(self.to_string())
        }
    }
}

/// A read timeout can surface as an I/O error somewhere in the source chain.
fn has_timed_out_io(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let messages = [
            NetworkError::Timeout.user_message(),
            NetworkError::ConnectionFailed("refused".into()).user_message(),
            NetworkError::Transport("reset".into()).user_message(),
            ConfigError::Invalid("test".into()).user_message(),
            ConfigError::NotFound("test".into()).user_message(),
            ConfigError::ParseError("test".into()).user_message(),
        ];

        for msg in messages {
            assert!(!msg.is_empty());
        }
    }

    #[test]
    fn test_timeout_detection() {
        assert!(NetworkError::Timeout.is_timeout());
        assert!(!NetworkError::ConnectionFailed("x".into()).is_timeout());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn test_timed_out_io_in_source_chain() {
        let timed_out = Wrapped(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(has_timed_out_io(&timed_out));

        let reset = Wrapped(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(!has_timed_out_io(&reset));
    }

    #[test]
    fn test_display_includes_detail() {
        let err = NetworkError::ConnectionFailed("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
