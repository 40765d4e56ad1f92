//! Catalogue change feed.
//!
//! Keeps one `AimService/NotifyUpdate` subscription alive for as long as
//! the token is not cancelled, and fans each change out on a broadcast
//! channel. A failed or closed subscription is re-opened after a capped
//! exponential delay; the feed never gives up on its own.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aim::AimClient;
use crate::error::Error;
use crate::models::RemoteChange;

const CHANNEL_CAPACITY: usize = 256;

/// Delay schedule between subscription attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedBackoff {
    /// Wait after the first failure, and after a clean close.
    pub initial: Duration,
    /// Ceiling for the doubled delay, before jitter.
    pub max: Duration,
}

impl Default for FeedBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl FeedBackoff {
    /// Delay before attempt `failures + 1`: `initial * 2^failures`,
    /// capped at `max`, then spread by up to a quarter either way.
    pub fn delay(&self, failures: u32) -> Duration {
        let doubled = self
            .initial
            .saturating_mul(1_u32.checked_shl(failures.min(31)).unwrap_or(u32::MAX));
        let capped = doubled.min(self.max);

        // Spread in [-0.25, 0.25), deterministic per attempt.
        let spread = f64::from(failures.wrapping_mul(2_654_435_761) % 1000) / 2000.0 - 0.25;
        capped.mul_f64(1.0 + spread)
    }
}

/// Handle to a running change feed.
pub struct ChangeFeed {
    changes: broadcast::Receiver<Arc<RemoteChange>>,
    cancel: CancellationToken,
}

impl ChangeFeed {
    /// Start the subscription task. It stops when `cancel` fires or
    /// [`shutdown`](Self::shutdown) is called.
    pub fn spawn(aim: AimClient, backoff: FeedBackoff, cancel: CancellationToken) -> Self {
        let (tx, changes) = broadcast::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(aim, tx, backoff, cancel.clone()));
        Self { changes, cancel }
    }

    /// A new receiver. Slow receivers see
    /// [`broadcast::error::RecvError::Lagged`] rather than blocking the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RemoteChange>> {
        self.changes.resubscribe()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn run(
    aim: AimClient,
    tx: broadcast::Sender<Arc<RemoteChange>>,
    backoff: FeedBackoff,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = subscribe_once(&aim, &tx) => outcome,
        };

        let wait = match outcome {
            Ok(()) => {
                info!("change feed closed by server");
                failures = 0;
                backoff.initial
            }
            Err(e) => {
                let wait = backoff.delay(failures);
                warn!(error = %e, failures, "change feed failed");
                failures = failures.saturating_add(1);
                wait
            }
        };

        debug!(wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "resubscribing later");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
    }

    debug!("change feed stopped");
}

/// Forward one subscription's changes until it ends.
async fn subscribe_once(
    aim: &AimClient,
    tx: &broadcast::Sender<Arc<RemoteChange>>,
) -> Result<(), Error> {
    info!(url = %aim.base_url(), "subscribing to change feed");

    let stream = aim.notify_update();
    futures_util::pin_mut!(stream);

    while let Some(change) = stream.next().await {
        let change = change?;
        debug!(remote_id = change.remote_id(), ?change, "remote change");
        // Nobody listening is not an error.
        let _ = tx.send(Arc::new(change));
    }
    Ok(())
}
