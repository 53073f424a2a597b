//! Client configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Per-request timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connection settings for one encoder
///
/// Can be loaded from TOML or constructed programmatically.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Device address, either `host[:port]` or a full `http://` URL
    pub host: String,

    /// Login user name
    pub username: String,

    /// Login password in clear text; hashed before it leaves the process
    #[serde(skip_serializing)]
    pub password: String,

    /// Bound applied to every request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Override the per-request timeout (whole seconds)
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL of the device. Bare hosts are reached over plain HTTP.
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim().trim_end_matches('/');
        let url = if host.contains("://") {
            Url::parse(host)?
        } else {
            Url::parse(&format!("http://{}", host))?
        };
        Ok(url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_uses_http() {
        let config = ClientConfig::new("192.168.1.50", "admin", "admin");
        assert_eq!(config.base_url().unwrap().as_str(), "http://192.168.1.50/");
    }

    #[test]
    fn test_full_url_is_kept() {
        let config = ClientConfig::new("http://encoder.local:8080/", "admin", "admin");
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://encoder.local:8080/"
        );
    }

    #[test]
    fn test_invalid_host() {
        let config = ClientConfig::new("http://", "admin", "admin");
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let config = ClientConfig::new("h", "admin", "hunter2");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_with_default_timeout() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"host": "10.0.0.2", "username": "admin", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }
}
