//! Test utilities for linkpi-client
//!
//! Runs an axum router standing in for an encoder and hands out clients
//! pointed at it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::{ClientConfig, LinkPiClient, LinkPiError, Result};

/// User name the test client logs in with
pub const TEST_USERNAME: &str = "admin";
/// Password the test client logs in with
pub const TEST_PASSWORD: &str = "linkpi";

/// A fake encoder on a loopback port, paired with a client aimed at it.
///
/// The router task is stopped when this is dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: LinkPiClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` as the encoder, with a 5 s client request timeout
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Router};
    /// use linkpi_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/link/user/lph_login", post(login));
    /// let mut server = TestServer::start(router).await?;
    /// server.client.login().await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(5)).await
    }

    /// Serve `router` as the encoder; the client gives up on any request after `timeout`
    pub async fn start_with_timeout<S>(router: axum::Router<S>, timeout: Duration) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Let the accept loop start before the first login
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = LinkPiClient::with_timeout(Self::config_for(addr), timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Client configuration pointing at `addr` with the test credentials
    pub fn config_for(addr: SocketAddr) -> ClientConfig {
        ClientConfig::new(addr.to_string(), TEST_USERNAME, TEST_PASSWORD)
    }

    /// Base URL of the fake encoder
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the fake encoder and wait for in-flight requests to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn bind_error(err: std::io::Error) -> LinkPiError {
    LinkPiError::communication("127.0.0.1:0", None, &err.to_string())
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
