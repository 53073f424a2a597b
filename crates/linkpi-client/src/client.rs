//! LinkPi session client implementation

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::digest::{self, DigestChallenge};
use crate::error::{excerpt, LinkPiError, Result};
use crate::session::{SessionCredentials, SessionState};
use crate::types::*;

/// Re-logins allowed per call before an auth failure is surfaced
const MAX_AUTH_RETRIES: usize = 1;

/// HTTP method used by every `/link` endpoint
const METHOD: &str = "POST";

/// Outcome of one authenticated request
enum Reply {
    /// Success envelope payload
    Data(Value),
    /// The device no longer accepts the session; carries the reason
    Rejected(String),
}

/// Session client for one LinkPi encoder.
///
/// Holds the pooled HTTP client, the login secrets and the session state
/// (tokens plus cached digest challenge). Calls that touch the session take
/// `&mut self`, so requests against one device are serialized.
pub struct LinkPiClient {
    http: Option<Client>,
    base_url: Url,
    username: String,
    password: String,
    timeout: Duration,
    session: SessionState,
}

impl LinkPiClient {
    /// Create a new client using the configured request timeout
    pub fn new(config: ClientConfig) -> Result<Self> {
        let timeout = config.timeout();
        Self::with_timeout(config, timeout)
    }

    /// Create a new client with an explicit per-request timeout
    pub fn with_timeout(config: ClientConfig, timeout: Duration) -> Result<Self> {
        let base_url = config.base_url()?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LinkPiError::communication(base_url.as_str(), None, &e.to_string()))?;

        Ok(Self {
            http: Some(http),
            base_url,
            username: config.username,
            password: config.password,
            timeout,
            session: SessionState::default(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current session state
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Whether session tokens are currently held
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Whether [`close`](Self::close) has released the HTTP client
    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    // =========================================================================
    // Login Handshake
    // =========================================================================

    /// Establish a device session.
    ///
    /// Tries a bare login first and answers a digest challenge if the device
    /// sends one. On success the new tokens and challenge replace any cached
    /// session state.
    #[instrument(skip(self), fields(host = %self.base_url))]
    pub async fn login(&mut self) -> Result<()> {
        let state = self.handshake().await?;
        self.session = state;
        Ok(())
    }

    async fn handshake(&self) -> Result<SessionState> {
        let http = self.http()?;
        let url = self.base_url.join(LOGIN_PATH)?;
        let payload = LoginRequest {
            username: &self.username,
            passwd: digest::md5_hex(self.password.as_bytes()),
        };

        let request = http
            .post(url.clone())
            .header(ACCEPT, "application/json")
            .json(&payload);
        let response = self.send(request, LOGIN_PATH).await?;

        match response.status() {
            StatusCode::OK => {
                let credentials = self.read_login(response).await?;
                info!("Login successful without digest auth");
                debug!("Session established: {}", credentials.fingerprint());
                Ok(SessionState::established(credentials, None))
            }
            StatusCode::UNAUTHORIZED => {
                let challenge = challenge_from(&response).ok_or_else(|| {
                    LinkPiError::login(
                        Some(StatusCode::UNAUTHORIZED.as_u16()),
                        "No WWW-Authenticate header in 401 login response",
                    )
                })?;
                debug!(realm = %challenge.realm, "Login challenged, answering with digest");

                let authorization = self
                    .digest_header(LOGIN_PATH, &challenge)
                    .map_err(|e| LinkPiError::login(None, e.to_string()))?;
                let request = http
                    .post(url)
                    .header(ACCEPT, "application/json")
                    .header(AUTHORIZATION, authorization)
                    .json(&payload);
                let response = self.send(request, LOGIN_PATH).await?;

                let credentials = self.read_login(response).await?;
                info!("Login successful with digest auth");
                debug!("Session established: {}", credentials.fingerprint());
                Ok(SessionState::established(credentials, Some(challenge)))
            }
            status => {
                let body = self.read_body(response, LOGIN_PATH).await?;
                Err(LinkPiError::login(
                    Some(status.as_u16()),
                    format!("Unexpected login response: {}", excerpt(&body)),
                ))
            }
        }
    }

    /// Require a success envelope carrying all four session tokens
    async fn read_login(&self, response: Response) -> Result<SessionCredentials> {
        let status = response.status();
        let body = self.read_body(response, LOGIN_PATH).await?;

        if status != StatusCode::OK {
            return Err(LinkPiError::login(Some(status.as_u16()), excerpt(&body)));
        }

        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| {
            LinkPiError::login(
                Some(status.as_u16()),
                format!("Malformed login response ({}): {}", e, excerpt(&body)),
            )
        })?;

        if !envelope.is_success() {
            return Err(LinkPiError::login(
                Some(status.as_u16()),
                format!("Device refused login: {}", excerpt(&body)),
            ));
        }

        envelope
            .data
            .as_ref()
            .and_then(SessionCredentials::from_login_data)
            .ok_or_else(|| {
                LinkPiError::login(
                    Some(status.as_u16()),
                    format!("Login response lacks session fields: {}", excerpt(&body)),
                )
            })
    }

    /// Login on behalf of a status call. Rejected credentials become an
    /// auth failure for `endpoint`.
    async fn relogin(&mut self, endpoint: &str) -> Result<()> {
        match self.handshake().await {
            Ok(state) => {
                self.session = state;
                Ok(())
            }
            Err(LinkPiError::Login { status, message }) => Err(LinkPiError::Auth {
                endpoint: endpoint.to_string(),
                reason: match status {
                    Some(status) => format!("re-login failed (HTTP {}): {}", status, message),
                    None => format!("re-login failed: {}", message),
                },
            }),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Status Endpoints
    // =========================================================================

    /// CPU, memory and temperature readings
    pub async fn get_system_state(&mut self) -> Result<Value> {
        self.call_endpoint(SYSTEM_STATE_PATH).await
    }

    /// Network TX/RX rates
    pub async fn get_network_state(&mut self) -> Result<Value> {
        self.call_endpoint(NETWORK_STATE_PATH).await
    }

    /// Per-channel video input state
    pub async fn get_video_input_state(&mut self) -> Result<Value> {
        self.call_endpoint(VIDEO_INPUT_STATE_PATH).await
    }

    /// POST an empty body to `path` and return the `data` field of the
    /// success envelope verbatim.
    ///
    /// A 401, or a "please login first" envelope, triggers exactly one
    /// re-login and retry. A second rejection is reported as
    /// [`LinkPiError::Auth`]. Timeouts are never retried here.
    #[instrument(skip(self))]
    pub async fn call_endpoint(&mut self, path: &str) -> Result<Value> {
        if !self.session.is_logged_in() {
            debug!("No session held, logging in before calling {}", path);
            self.relogin(path).await?;
        }

        let mut rejection = String::new();
        for attempt in 0..=MAX_AUTH_RETRIES {
            if attempt > 0 {
                info!("Session rejected for {} ({}), re-logging in", path, rejection);
                self.session.clear();
                self.relogin(path).await?;
            }

            if self.session.challenge().is_none() {
                if let Some(data) = self.harvest_challenge(path).await? {
                    return Ok(data);
                }
            }

            match self.authenticated_post(path).await? {
                Reply::Data(data) => return Ok(data),
                Reply::Rejected(reason) => rejection = reason,
            }
        }

        Err(LinkPiError::Auth {
            endpoint: path.to_string(),
            reason: rejection,
        })
    }

    /// Bare POST used only to obtain a digest challenge.
    ///
    /// Returns the payload directly if the endpoint answers without asking
    /// for digest auth. The challenge is cached only once fully received.
    async fn harvest_challenge(&mut self, path: &str) -> Result<Option<Value>> {
        let url = self.base_url.join(path)?;
        let request = self.http()?.post(url).json(&json!({}));
        let response = self.send(request, path).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = challenge_from(&response)
                .ok_or_else(|| LinkPiError::protocol(path, "No digest challenge received from device"))?;
            debug!("Obtained digest challenge for endpoint {}", path);
            self.session.set_challenge(challenge);
            return Ok(None);
        }

        let body = self.read_body(response, path).await?;
        if !status.is_success() {
            return Err(LinkPiError::communication(path, Some(status.as_u16()), &body));
        }

        let envelope = parse_envelope(path, &body)?;
        if envelope.is_success() {
            debug!("{} answered without digest auth", path);
            envelope.into_data(path).map(Some)
        } else {
            Err(LinkPiError::protocol(path, envelope.message()))
        }
    }

    /// POST with session tokens and a digest header for `path`
    async fn authenticated_post(&self, path: &str) -> Result<Reply> {
        let (Some(credentials), Some(challenge)) =
            (self.session.credentials(), self.session.challenge())
        else {
            return Err(LinkPiError::protocol(path, "Session state is incomplete"));
        };

        let mut headers = credentials.headers();
        headers.insert(AUTHORIZATION, self.digest_header(path, challenge)?);
        debug!(
            "Using session hashes for request to {}: {}",
            path,
            credentials.fingerprint()
        );

        let url = self.base_url.join(path)?;
        let request = self.http()?.post(url).headers(headers).json(&json!({}));
        let response = self.send(request, path).await?;
        let status = response.status();
        let body = self.read_body(response, path).await?;

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Reply::Rejected(format!("HTTP {}", status.as_u16())));
        }
        if status != StatusCode::OK {
            return Err(LinkPiError::communication(path, Some(status.as_u16()), &body));
        }

        let envelope = parse_envelope(path, &body)?;
        if envelope.is_success() {
            envelope.into_data(path).map(Reply::Data)
        } else if envelope.requests_login() {
            Ok(Reply::Rejected(envelope.message().to_string()))
        } else {
            Err(LinkPiError::protocol(path, envelope.message()))
        }
    }

    // =========================================================================
    // Logout / Close
    // =========================================================================

    /// Log out and release the HTTP client.
    ///
    /// Best effort: logout failures are logged and dropped. Safe to call
    /// before login and more than once.
    #[instrument(skip(self), fields(host = %self.base_url))]
    pub async fn close(&mut self) {
        self.logout().await;
        if self.http.take().is_some() {
            debug!("HTTP client released");
        }
    }

    async fn logout(&mut self) {
        if let (Some(http), Some(credentials)) = (self.http.as_ref(), self.session.credentials()) {
            let mut headers = credentials.headers();
            if let Some(challenge) = self.session.challenge() {
                match self.digest_header(LOGOUT_PATH, challenge) {
                    Ok(value) => {
                        headers.insert(AUTHORIZATION, value);
                    }
                    Err(e) => warn!("Logout error: {}", e),
                }
            }

            match self.base_url.join(LOGOUT_PATH) {
                Ok(url) => {
                    let request = http.post(url).headers(headers).json(&json!({}));
                    match self.send(request, LOGOUT_PATH).await {
                        Ok(response) if response.status().is_success() => {
                            debug!(status = %response.status(), "Logged out")
                        }
                        Ok(response) => warn!("Logout error: HTTP {}", response.status()),
                        Err(e) => warn!("Logout error: {}", e),
                    }
                }
                Err(e) => warn!("Logout error: {}", e),
            }
        }
        self.session.clear();
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    fn http(&self) -> Result<&Client> {
        self.http.as_ref().ok_or(LinkPiError::Closed)
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| LinkPiError::from_transport(endpoint, e, self.timeout))
    }

    async fn read_body(&self, response: Response, endpoint: &str) -> Result<String> {
        response
            .text()
            .await
            .map_err(|e| LinkPiError::from_transport(endpoint, e, self.timeout))
    }

    fn digest_header(&self, uri: &str, challenge: &DigestChallenge) -> Result<HeaderValue> {
        let header =
            digest::authorization_header(&self.username, &self.password, METHOD, uri, challenge);
        let mut value = HeaderValue::from_str(&header)
            .map_err(|_| LinkPiError::protocol(uri, "Digest header is not a valid header value"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for LinkPiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkPiClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("logged_in", &self.session.is_logged_in())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Parse the challenge out of a 401 response, if one was offered
fn challenge_from(response: &Response) -> Option<DigestChallenge> {
    let header = response.headers().get(WWW_AUTHENTICATE)?.to_str().ok()?;
    Some(DigestChallenge::from_header(header))
}

fn parse_envelope(path: &str, body: &str) -> Result<Envelope> {
    serde_json::from_str(body)
        .map_err(|e| LinkPiError::protocol(path, format!("Failed to decode JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LinkPiClient::new(ClientConfig::new("192.168.1.50", "admin", "admin"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_host() {
        let client = LinkPiClient::new(ClientConfig::new("http://", "admin", "admin"));
        assert!(matches!(client, Err(LinkPiError::InvalidUrl(_))));
    }

    #[test]
    fn test_new_client_holds_no_session() {
        let client = LinkPiClient::new(ClientConfig::new("encoder.local", "admin", "pw")).unwrap();
        assert!(!client.is_logged_in());
        assert!(client.session().challenge().is_none());
        assert!(!client.is_closed());
    }

    #[test]
    fn test_debug_hides_password() {
        let client = LinkPiClient::new(ClientConfig::new("h", "admin", "hunter2")).unwrap();
        assert!(!format!("{:?}", client).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_close_without_login_is_noop() {
        let mut client = LinkPiClient::new(ClientConfig::new("192.0.2.1", "admin", "pw")).unwrap();
        client.close().await;
        assert!(client.is_closed());
        client.close().await;

        let err = client.get_system_state().await.unwrap_err();
        assert!(matches!(err, LinkPiError::Closed));
    }
}
