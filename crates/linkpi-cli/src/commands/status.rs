//! Status command - one poll of every status endpoint

use anyhow::Result;
use linkpi_client::{LinkPiClient, LinkPiError};

use crate::output::{OutputContext, OutputFormat, ReadingRow, VideoInputRow};
use crate::readings::{parse_states, video_inputs, Snapshot};

/// Poll system, network and video input state once
pub async fn fetch_snapshot(client: &mut LinkPiClient) -> Result<Snapshot, LinkPiError> {
    Ok(Snapshot {
        system: client.get_system_state().await?,
        network: client.get_network_state().await?,
        video_input: client.get_video_input_state().await?,
    })
}

/// Print one snapshot as sensor readings and video input channels
pub fn print_snapshot(snapshot: &Snapshot, stale: bool, ctx: &OutputContext) {
    if ctx.format == OutputFormat::Json {
        ctx.print_json(snapshot);
        return;
    }

    ctx.print(&ReadingRow::from_readings(&parse_states(snapshot), stale));

    let inputs: Vec<VideoInputRow> = video_inputs(&snapshot.video_input)
        .iter()
        .map(VideoInputRow::from)
        .collect();
    ctx.print(&inputs);
}

/// Show the current encoder state
pub async fn status(client: &mut LinkPiClient, ctx: &OutputContext) -> Result<()> {
    let snapshot = fetch_snapshot(client).await?;
    print_snapshot(&snapshot, false, ctx);
    Ok(())
}
