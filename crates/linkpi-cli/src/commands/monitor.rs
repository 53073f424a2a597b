//! Monitor command - poll the encoder on a fixed interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use linkpi_client::LinkPiClient;
use tracing::{info, warn};

use crate::commands::status::{fetch_snapshot, print_snapshot};
use crate::output::OutputContext;
use crate::readings::Snapshot;

/// Granularity of the Ctrl+C check while waiting for the next poll
const STOP_CHECK: Duration = Duration::from_millis(100);

/// Log in once, then poll every `interval` until Ctrl+C.
///
/// A failed poll keeps the previous snapshot, marked stale; the next cycle
/// is the retry.
pub async fn monitor(
    client: &mut LinkPiClient,
    interval: Duration,
    ctx: &OutputContext,
) -> Result<()> {
    client
        .login()
        .await
        .context("Failed to login to LinkPi encoder during setup")?;
    info!("LinkPi encoder login executed successfully at setup");

    ctx.info(&format!(
        "Polling {} every {}s",
        client.base_url(),
        interval.as_secs()
    ));
    ctx.info("Press Ctrl+C to stop");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut last: Option<(Snapshot, Instant)> = None;
    while running.load(Ordering::SeqCst) {
        match fetch_snapshot(client).await {
            Ok(snapshot) => {
                print_snapshot(&snapshot, false, ctx);
                last = Some((snapshot, Instant::now()));
            }
            Err(e) => {
                warn!("Poll failed: {}", e);
                ctx.error(&format!("Poll failed: {}", e));
                if let Some((snapshot, at)) = &last {
                    ctx.warn(&format!(
                        "Showing readings from {}s ago",
                        at.elapsed().as_secs()
                    ));
                    print_snapshot(snapshot, true, ctx);
                }
            }
        }

        let next = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < next {
            tokio::time::sleep(STOP_CHECK).await;
        }
    }

    ctx.info("\nStopping monitor...");
    Ok(())
}
