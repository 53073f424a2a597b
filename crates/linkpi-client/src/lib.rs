//! LinkPi Encoder Client Library
//!
//! Polls a LinkPi HDMI encoder over its `/link` HTTP API. The device wants
//! both a set of session tokens issued at login and an HTTP Digest header on
//! every request; [`LinkPiClient`] keeps both, re-authenticates once when
//! the session expires, and reports every failure as a [`LinkPiError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use linkpi_client::{ClientConfig, LinkPiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), linkpi_client::LinkPiError> {
//!     let config = ClientConfig::new("192.168.1.50", "admin", "admin");
//!     let mut client = LinkPiClient::new(config)?;
//!
//!     client.login().await?;
//!     let system = client.get_system_state().await?;
//!     println!("cpu: {}", system["cpu"]);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module serves an axum router as a stand-in device:
//!
//! ```rust,ignore
//! use linkpi_client::testing::TestServer;
//!
//! let mut server = TestServer::start(fake_encoder_router()).await?;
//! server.client.login().await?;
//! ```

mod client;
mod config;
pub mod digest;
mod error;
pub mod session;
pub mod testing;
mod types;

pub use client::LinkPiClient;
pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use digest::DigestChallenge;
pub use error::{LinkPiError, Result, BODY_EXCERPT_LEN};
pub use session::{SessionCredentials, SessionState};
pub use types::*;
