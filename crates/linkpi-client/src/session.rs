//! Session state held by a [`LinkPiClient`](crate::LinkPiClient)
//!
//! The device hands out four tokens at login that must accompany every
//! later request, independently of the digest challenge.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, COOKIE, USER_AGENT};
use serde_json::Value;

use crate::digest::DigestChallenge;

/// Session token field names, as they appear in the login `data` payload
/// and as request headers.
pub const L_HASH: &str = "L-HASH";
pub const P_HASH: &str = "P-HASH";
pub const H_HASH: &str = "H-HASH";
pub const COOKIE_FIELD: &str = "Cookie";

/// `User-Agent` sent with authenticated requests
pub const DEVICE_USER_AGENT: &str = "Mozilla/5.0";

/// The four session tokens issued at login.
///
/// Either all four are present and usable as header values, or no
/// credentials exist at all.
///
/// The device documents the headers as `L-HASH`, `P-HASH` and `H-HASH`, but
/// [`HeaderName`] is always lowercase, so they go out as `l-hash` and so on.
/// Header names are case-insensitive in HTTP; a device firmware that compares
/// them case-sensitively would reject every authenticated request.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    l_hash: HeaderValue,
    p_hash: HeaderValue,
    h_hash: HeaderValue,
    cookie: HeaderValue,
}

impl SessionCredentials {
    /// Extract credentials from a login `data` payload.
    ///
    /// Returns `None` unless all four fields are strings that form valid
    /// header values.
    pub fn from_login_data(data: &Value) -> Option<Self> {
        let field = |name: &str| -> Option<HeaderValue> {
            let mut value = HeaderValue::from_str(data.get(name)?.as_str()?).ok()?;
            value.set_sensitive(true);
            Some(value)
        };

        Some(Self {
            l_hash: field(L_HASH)?,
            p_hash: field(P_HASH)?,
            h_hash: field(H_HASH)?,
            cookie: field(COOKIE_FIELD)?,
        })
    }

    /// Headers carried by every authenticated request, without `Authorization`
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(6);
        headers.insert(HeaderName::from_static("l-hash"), self.l_hash.clone());
        headers.insert(HeaderName::from_static("p-hash"), self.p_hash.clone());
        headers.insert(HeaderName::from_static("h-hash"), self.h_hash.clone());
        headers.insert(COOKIE, self.cookie.clone());
        headers.insert(USER_AGENT, HeaderValue::from_static(DEVICE_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Short token prefix for debug logs
    pub(crate) fn fingerprint(&self) -> String {
        let prefix = |v: &HeaderValue| v.to_str().unwrap_or("").chars().take(4).collect::<String>();
        format!(
            "L-HASH={}.. P-HASH={}.. H-HASH={}..",
            prefix(&self.l_hash),
            prefix(&self.p_hash),
            prefix(&self.h_hash)
        )
    }
}

/// Mutable session state owned by one client.
///
/// Written only by login and [`SessionState::clear`]; read by the request
/// executor.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    credentials: Option<SessionCredentials>,
    challenge: Option<DigestChallenge>,
}

impl SessionState {
    /// State produced by a successful login
    pub fn established(
        credentials: SessionCredentials,
        challenge: Option<DigestChallenge>,
    ) -> Self {
        Self {
            credentials: Some(credentials),
            challenge,
        }
    }

    pub fn credentials(&self) -> Option<&SessionCredentials> {
        self.credentials.as_ref()
    }

    pub fn challenge(&self) -> Option<&DigestChallenge> {
        self.challenge.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    /// Cache a challenge harvested outside of login
    pub fn set_challenge(&mut self, challenge: DigestChallenge) {
        self.challenge = Some(challenge);
    }

    /// Drop both credentials and challenge
    pub fn clear(&mut self) {
        self.credentials = None;
        self.challenge = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn login_data() -> Value {
        json!({"L-HASH": "a", "P-HASH": "b", "H-HASH": "c", "Cookie": "d"})
    }

    #[test]
    fn test_credentials_from_complete_payload() {
        let creds = SessionCredentials::from_login_data(&login_data()).unwrap();
        let headers = creds.headers();
        assert_eq!(headers["l-hash"], "a");
        assert_eq!(headers["p-hash"], "b");
        assert_eq!(headers["h-hash"], "c");
        assert_eq!(headers[COOKIE], "d");
        assert_eq!(headers[USER_AGENT], DEVICE_USER_AGENT);
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_token_headers_go_out_lowercase() {
        let creds = SessionCredentials::from_login_data(&login_data()).unwrap();
        let headers = creds.headers();
        let names: Vec<&str> = headers.keys().map(HeaderName::as_str).collect();
        assert!(names.contains(&"l-hash"));
        assert!(names.contains(&"p-hash"));
        assert!(names.contains(&"h-hash"));
        assert!(!names.iter().any(|n| n.contains("HASH")));
    }

    #[test]
    fn test_partial_payload_yields_no_credentials() {
        let mut data = login_data();
        data.as_object_mut().unwrap().remove("Cookie");
        assert!(SessionCredentials::from_login_data(&data).is_none());
    }

    #[test]
    fn test_non_string_or_invalid_token_is_rejected() {
        let numeric = json!({"L-HASH": 1, "P-HASH": "b", "H-HASH": "c", "Cookie": "d"});
        assert!(SessionCredentials::from_login_data(&numeric).is_none());

        let newline = json!({"L-HASH": "a\nb", "P-HASH": "b", "H-HASH": "c", "Cookie": "d"});
        assert!(SessionCredentials::from_login_data(&newline).is_none());
    }

    #[test]
    fn test_tokens_are_not_debug_printed() {
        let data = json!({"L-HASH": "topsecret", "P-HASH": "b", "H-HASH": "c", "Cookie": "d"});
        let creds = SessionCredentials::from_login_data(&data).unwrap();
        assert!(!format!("{:?}", creds).contains("topsecret"));
    }

    #[test]
    fn test_clear_drops_everything() {
        let creds = SessionCredentials::from_login_data(&login_data()).unwrap();
        let mut state = SessionState::established(
            creds,
            Some(DigestChallenge::from_header(r#"Digest nonce="n""#)),
        );
        assert!(state.is_logged_in());
        assert!(state.challenge().is_some());

        state.clear();
        assert!(!state.is_logged_in());
        assert!(state.challenge().is_none());
    }
}
