//! Error types for LinkPi client operations

use std::time::Duration;

use thiserror::Error;

/// Result type alias for LinkPi client operations
pub type Result<T> = std::result::Result<T, LinkPiError>;

/// Longest response body excerpt carried inside an error
pub const BODY_EXCERPT_LEN: usize = 200;

/// Errors surfaced by the LinkPi session client.
///
/// Transport errors never escape as `reqwest::Error`; every failure is
/// translated into one of these kinds at the call site so a scheduler can
/// match on it.
#[derive(Error, Debug)]
pub enum LinkPiError {
    /// The login handshake failed
    #[error("Login failed{}: {message}", status_suffix(.status))]
    Login {
        status: Option<u16>,
        message: String,
    },

    /// Credentials were rejected even after one re-login
    #[error("{endpoint} unauthorized even after retry: {reason}")]
    Auth { endpoint: String, reason: String },

    /// Non-2xx response or network-level failure
    #[error("{endpoint} failed{}: {message}", status_suffix(.status))]
    Communication {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// Malformed or unexpected response envelope
    #[error("{endpoint} error: {message}")]
    Protocol { endpoint: String, message: String },

    /// Request deadline exceeded
    #[error("Timeout after {after:?} calling {endpoint}; will retry automatically on next poll")]
    Timeout { endpoint: String, after: Duration },

    /// Device address could not be turned into a URL
    #[error("Invalid device address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The client was closed
    #[error("Client is closed")]
    Closed,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl LinkPiError {
    /// Create a login error from an HTTP status and response body
    pub fn login(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Login {
            status,
            message: message.into(),
        }
    }

    /// Create a communication error, truncating the body excerpt
    pub fn communication(endpoint: &str, status: Option<u16>, body: &str) -> Self {
        Self::Communication {
            endpoint: endpoint.to_string(),
            status,
            message: excerpt(body),
        }
    }

    /// Create a protocol error
    pub fn protocol(endpoint: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Translate a transport error raised while talking to `endpoint`
    pub(crate) fn from_transport(endpoint: &str, err: reqwest::Error, after: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
                after,
            }
        } else {
            Self::Communication {
                endpoint: endpoint.to_string(),
                status: err.status().map(|s| s.as_u16()),
                message: excerpt(&err.to_string()),
            }
        }
    }

    /// True for failures caused by rejected credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Login { .. } | Self::Auth { .. })
    }

    /// True when waiting for the next poll cycle may clear the failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Communication { .. })
    }
}

/// First [`BODY_EXCERPT_LEN`] characters of a response body
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        let short = excerpt(&body);
        assert_eq!(short.chars().count(), BODY_EXCERPT_LEN);
    }

    #[test]
    fn test_communication_error_message() {
        let err = LinkPiError::communication("/link/system/get_sys_state", Some(500), "boom");
        assert_eq!(
            err.to_string(),
            "/link/system/get_sys_state failed (HTTP 500): boom"
        );
        assert!(err.is_retryable());
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn test_timeout_message_mentions_next_poll() {
        let err = LinkPiError::Timeout {
            endpoint: "/link/system/get_net_state".to_string(),
            after: Duration::from_secs(10),
        };
        assert_eq!(
            err.to_string(),
            "Timeout after 10s calling /link/system/get_net_state; will retry automatically on next poll"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_login_error_without_status() {
        let err = LinkPiError::login(None, "missing session fields");
        assert_eq!(err.to_string(), "Login failed: missing session fields");
        assert!(err.is_auth_failure());
    }
}
