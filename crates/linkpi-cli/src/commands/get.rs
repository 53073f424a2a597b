//! Get command - print the raw payload of one status endpoint

use anyhow::Result;
use clap::ValueEnum;
use linkpi_client::LinkPiClient;

use crate::output::OutputContext;

/// Status endpoints exposed by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Endpoint {
    /// CPU, memory and temperature
    System,
    /// Network TX/RX rates
    Network,
    /// Video input channels
    Video,
}

/// Fetch one endpoint and print its `data` payload unmodified
pub async fn get(client: &mut LinkPiClient, endpoint: Endpoint, ctx: &OutputContext) -> Result<()> {
    let data = match endpoint {
        Endpoint::System => client.get_system_state().await?,
        Endpoint::Network => client.get_network_state().await?,
        Endpoint::Video => client.get_video_input_state().await?,
    };

    ctx.print_json(&data);
    Ok(())
}
