//! Login command - verify that the encoder accepts the credentials

use anyhow::{Context, Result};
use linkpi_client::LinkPiClient;

use crate::output::OutputContext;

/// Log in once and report whether the session was established
pub async fn login(client: &mut LinkPiClient, ctx: &OutputContext) -> Result<()> {
    client
        .login()
        .await
        .with_context(|| format!("Unable to connect to LinkPi at {}", client.base_url()))?;

    let digest = if client.session().challenge().is_some() {
        "with digest auth"
    } else {
        "without digest auth"
    };
    ctx.success(&format!("Logged in to {} {}", client.base_url(), digest));
    Ok(())
}
