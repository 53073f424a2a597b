//! Wire types for the LinkPi `/link` control API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LinkPiError, Result};

/// Login endpoint
pub const LOGIN_PATH: &str = "/link/user/lph_login";
/// Logout endpoint
pub const LOGOUT_PATH: &str = "/link/user/lph_logout";
/// System state (CPU, memory, temperature)
pub const SYSTEM_STATE_PATH: &str = "/link/system/get_sys_state";
/// Network state (TX/RX rates)
pub const NETWORK_STATE_PATH: &str = "/link/system/get_net_state";
/// Video input state (one entry per input channel)
pub const VIDEO_INPUT_STATE_PATH: &str = "/link/system/get_vi_state";

/// `status` value of a successful envelope
pub const STATUS_SUCCESS: &str = "success";

/// Message the device returns when its session has expired
pub(crate) const PLEASE_LOGIN_FIRST: &str = "please login first";

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    /// Hex-encoded MD5 of the UTF-8 password
    pub passwd: String,
}

/// Response envelope shared by every `/link` endpoint
///
/// Success: `{"status": "success", "data": {...}}`
/// Failure: `{"status": "<anything else>", "msg": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    /// Whether the device reported success
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// The failure message, empty if the device sent none
    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or_default()
    }

    /// Whether the device is asking for a fresh login
    pub fn requests_login(&self) -> bool {
        self.message().to_lowercase().contains(PLEASE_LOGIN_FIRST)
    }

    /// The `data` payload of a success envelope from `endpoint`.
    ///
    /// A success reply must carry `data`; one without it (or with `null`)
    /// is a protocol error rather than an empty reading.
    pub fn into_data(self, endpoint: &str) -> Result<Value> {
        self.data
            .ok_or_else(|| LinkPiError::protocol(endpoint, "success envelope without data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let env: Envelope =
            serde_json::from_str(r#"{"status":"success","data":{"cpu":12}}"#).unwrap();
        assert!(env.is_success());
        assert!(!env.requests_login());
        assert_eq!(env.into_data("/link/system/get_sys_state").unwrap()["cpu"], 12);
    }

    #[test]
    fn test_login_request_detection_is_case_insensitive() {
        let env: Envelope =
            serde_json::from_str(r#"{"status":"fail","msg":"Please Login First!"}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.requests_login());
    }

    #[test]
    fn test_envelope_without_fields() {
        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert!(!env.is_success());
        assert_eq!(env.message(), "");
        assert!(env.into_data("/x").is_err());
    }

    #[test]
    fn test_success_envelope_without_data() {
        let env: Envelope = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(env.is_success());
        match env.into_data(SYSTEM_STATE_PATH).unwrap_err() {
            LinkPiError::Protocol { endpoint, message } => {
                assert_eq!(endpoint, SYSTEM_STATE_PATH);
                assert_eq!(message, "success envelope without data");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_login_request_shape() {
        let body = serde_json::to_value(LoginRequest {
            username: "admin",
            passwd: "21232f297a57a5a743894a0e4a801fc3".to_string(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "admin", "passwd": "21232f297a57a5a743894a0e4a801fc3"})
        );
    }
}
