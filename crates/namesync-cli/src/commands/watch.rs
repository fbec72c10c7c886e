//! Watch command handler

use anyhow::{bail, Context, Result};
use tracing::debug;

use namesync_core::models::sort_records;
use namesync_core::{LiveStatus, SnapshotSubscription, SortMode, SubscriptionEvent, Transport};

use crate::output::Output;

/// Print every pushed snapshot until the server closes the socket or Ctrl-C
pub async fn watch(transport: &dyn Transport, output: &Output) -> Result<()> {
    let subscription = transport
        .subscribe_snapshots()
        .await
        .context("Failed to open live updates")?;

    tokio::select! {
        result = follow(subscription, output) => result,
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted, closing live updates");
            Ok(())
        }
    }
}

/// Print events until the subscription ends
///
/// A subscription that closes before ever connecting is an error.
async fn follow(mut subscription: SnapshotSubscription, output: &Output) -> Result<()> {
    let mut connected = false;

    while let Some(event) = subscription.recv().await {
        match event {
            SubscriptionEvent::Status(LiveStatus::Connected) => {
                connected = true;
                output.message("Connected. Waiting for changes (Ctrl-C to stop)...");
            }
            SubscriptionEvent::Status(_) => {}
            SubscriptionEvent::Snapshot(snapshot) => {
                output.print_names(&sort_records(&snapshot, SortMode::DateDesc));
            }
            SubscriptionEvent::Closed { reason } => {
                if !connected {
                    bail!(
                        "Could not connect for live updates: {}",
                        reason.as_deref().unwrap_or("connection closed")
                    );
                }
                match reason {
                    Some(reason) => {
                        output.message(&format!("Server closed the connection: {}", reason))
                    }
                    None => output.message("Server closed the connection"),
                }
                break;
            }
        }
    }

    subscription.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use chrono::Utc;
    use namesync_core::transport::Operation;
    use namesync_core::{MemoryTransport, NameRecord};

    #[tokio::test]
    async fn test_follow_until_server_closes() {
        let transport = MemoryTransport::new();
        let subscription = transport.subscribe_snapshots().await.unwrap();

        transport.push_snapshot(vec![NameRecord::new(1, "Anna", Utc::now())]);
        transport.close_subscriptions();

        let output = Output::new(OutputFormat::Quiet);
        follow(subscription, &output).await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_fails_when_subscribe_fails() {
        let transport = MemoryTransport::new();
        transport.fail(Operation::Subscribe);

        let output = Output::new(OutputFormat::Quiet);
        assert!(watch(&transport, &output).await.is_err());
    }
}
