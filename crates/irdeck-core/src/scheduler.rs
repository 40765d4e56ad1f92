// ── Poll scheduler ──
//
// Drives reconciliation passes: discovery with retry until the first
// pass succeeds, then a fixed-interval timer, optionally short-circuited
// by the backend's change feed. A failed pass never stops the loop.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ChangeStream;
use crate::bridge::PassSummary;
use crate::error::CoreError;
use crate::model::RemoteChange;

/// Scheduler lifecycle, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// Running the first pass.
    Discovering,
    /// First pass done; timer armed.
    Polling,
    /// Discovery failed `attempt` times; retrying after the interval.
    Recovering { attempt: u32 },
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Discovering => f.write_str("discovering"),
            Self::Polling => f.write_str("polling"),
            Self::Recovering { attempt } => write!(f, "recovering (attempt {attempt})"),
        }
    }
}

/// One reconciliation pass: fetch, reconcile the registry, bind.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_pass(&self) -> Result<PassSummary, CoreError>;
}

enum Wake {
    Tick,
    Change(Option<RemoteChange>),
}

pub struct PollScheduler {
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl PollScheduler {
    /// `interval` must be non-zero; configuration rejects zero before
    /// this point.
    pub fn new(interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self { interval, state }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is only observed between passes; a pass in flight
    /// always runs to completion.
    pub async fn run<R>(&self, runner: &R, cancel: CancellationToken, changes: Option<ChangeStream>)
    where
        R: PassRunner + ?Sized,
    {
        if self.discover(runner, &cancel).await {
            self.poll(runner, &cancel, changes).await;
        }
        self.transition(SchedulerState::Idle);
    }

    /// Returns `false` if cancelled before a pass succeeded.
    async fn discover<R>(&self, runner: &R, cancel: &CancellationToken) -> bool
    where
        R: PassRunner + ?Sized,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if attempt == 0 {
                self.transition(SchedulerState::Discovering);
            }

            match runner.run_pass().await {
                Ok(summary) => {
                    info!(
                        remotes = summary.remotes.added,
                        accessories = summary.accessories.registered,
                        "discovery complete"
                    );
                    return true;
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    warn!(
                        error = %e,
                        attempt,
                        retry_in_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
                        "discovery failed"
                    );
                    self.transition(SchedulerState::Recovering { attempt });
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn poll<R>(&self, runner: &R, cancel: &CancellationToken, mut changes: Option<ChangeStream>)
    where
        R: PassRunner + ?Sized,
    {
        self.transition(SchedulerState::Polling);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume the immediate first tick

        loop {
            let wake = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => Wake::Tick,
                change = next_change(&mut changes) => Wake::Change(change),
            };

            let trigger = match wake {
                Wake::Tick => "timer",
                Wake::Change(Some(change)) => {
                    debug!(remote_id = %change.remote_id(), "change notification");
                    "change feed"
                }
                Wake::Change(None) => {
                    warn!("change feed ended, continuing with polling only");
                    changes = None;
                    continue;
                }
            };

            match runner.run_pass().await {
                Ok(summary) => debug!(trigger, ?summary, "pass complete"),
                Err(e) => warn!(trigger, error = %e, "reconciliation pass failed"),
            }
        }
    }

    fn transition(&self, next: SchedulerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "scheduler state");
        }
    }
}

/// Next change from the feed; pends forever without one.
async fn next_change(changes: &mut Option<ChangeStream>) -> Option<RemoteChange> {
    match changes {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
