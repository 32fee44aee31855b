//! Shutter operations and the bounded wait.
//!
//! Opening or closing is a command followed by a wait for the device to
//! broadcast fresh status:
//!
//! ```text
//!  clear freshness ──> write OPEN# ──> wait ≤ attempts × interval
//!                                        │
//!                    fresh status ───────┼──> Ok(attempt)
//!                    windows exhausted ──┼──> OperationTimedOut
//!                    link lost ──────────┘──> NotConnected
//! ```
//!
//! The wait does not interpret the reported state; any valid broadcast after
//! the command counts as the device having answered.

use roofctl_core::{Error, Result, ShutterState, StatusField};
use roofctl_hardware::Transport;
use roofctl_protocol::Command;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, trace, warn};

use crate::cache::{CacheState, StatusCache};
use crate::config::DriverConfig;
use crate::dispatcher::CommandDispatcher;

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Fresh status arrived during the given 1-based window.
    Fresh { attempt: u32 },

    /// Every window elapsed without fresh status.
    Exhausted,

    /// The link went down while waiting.
    LinkDown,
}

/// Attempt-counted wait for fresh status.
///
/// Waits at most `attempts` windows of `interval` each and returns as soon as
/// the cache turns fresh, so a device that answers quickly is never held up
/// by the window length.
///
/// # Example
///
/// ```
/// use roofctl_controller::{BoundedWait, StatusCache, WaitOutcome};
/// use roofctl_protocol::StatusMessage;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = StatusCache::new();
///     cache.mark_link_up();
///     let mut updates = cache.subscribe();
///
///     cache.ingest(&StatusMessage::from("0,2,0,0,0,12.3")).unwrap();
///
///     let wait = BoundedWait::new(5, Duration::from_millis(600));
///     assert_eq!(wait.wait(&mut updates).await, WaitOutcome::Fresh { attempt: 1 });
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedWait {
    pub attempts: u32,
    pub interval: Duration,
}

impl BoundedWait {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.poll_attempts, config.poll_interval())
    }

    /// Longest the wait can take, saturating at `Duration::MAX`.
    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }

    /// Wait for the cache behind `updates` to turn fresh.
    pub async fn wait(&self, updates: &mut watch::Receiver<CacheState>) -> WaitOutcome {
        for attempt in 1..=self.attempts {
            let window = tokio::time::timeout(
                self.interval,
                updates.wait_for(|state| state.fresh || !state.link_up),
            )
            .await
            .map(|changed| changed.map(|state| state.fresh));

            match window {
                Ok(Ok(true)) => return WaitOutcome::Fresh { attempt },
                // Link down, or the cache itself is gone
                Ok(Ok(false)) | Ok(Err(_)) => return WaitOutcome::LinkDown,
                Err(_) => trace!("No fresh status in window {} of {}", attempt, self.attempts),
            }
        }
        WaitOutcome::Exhausted
    }

    fn timed_out(&self) -> Error {
        Error::OperationTimedOut {
            attempts: self.attempts,
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Drives open, close and abort.
pub struct ShutterController<T: Transport> {
    dispatcher: CommandDispatcher<T>,
    cache: StatusCache,
    wait: BoundedWait,
}

impl<T: Transport> ShutterController<T> {
    pub fn new(dispatcher: CommandDispatcher<T>, cache: StatusCache, wait: BoundedWait) -> Self {
        Self {
            dispatcher,
            cache,
            wait,
        }
    }

    /// Open the roof and wait for the device to report.
    ///
    /// Returns the window in which fresh status arrived.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the link is down, or drops during the wait
    /// - [`Error::OperationTimedOut`] if no fresh status arrives in time
    /// - [`Error::CommsFailure`] if the command cannot be written
    pub async fn open(&self) -> Result<u32> {
        self.move_roof(Command::Open).await
    }

    /// Close the roof and wait for the device to report.
    ///
    /// Same contract as [`ShutterController::open`].
    pub async fn close(&self) -> Result<u32> {
        self.move_roof(Command::Close).await
    }

    /// Stop roof and mount motion. Does not wait.
    pub async fn abort(&self) -> Result<()> {
        info!("Aborting roof motion");
        self.dispatcher.dispatch(Command::Abort.as_str(), false).await?;
        Ok(())
    }

    /// Current shutter state from the `SHUTTERSTATUS` query.
    ///
    /// While the cache is stale the query is written through and the ack
    /// token comes back, which reads as [`ShutterState::Closed`].
    pub async fn status(&self) -> Result<ShutterState> {
        let token = self
            .dispatcher
            .dispatch(StatusField::ShutterStatus.query_name(), false)
            .await?;
        Ok(ShutterState::from_token(&token))
    }

    /// Whether the roof is opening or closing.
    pub async fn is_slewing(&self) -> Result<bool> {
        Ok(self.status().await?.is_moving())
    }

    async fn move_roof(&self, command: Command) -> Result<u32> {
        // Subscribe first so a broadcast racing the command is not missed
        let mut updates = self.cache.subscribe();
        self.cache.clear_freshness();

        info!("Sending {} to roof", command);
        self.dispatcher.dispatch(command.as_str(), false).await?;

        match self.wait.wait(&mut updates).await {
            WaitOutcome::Fresh { attempt } => {
                info!("Roof reported after {} on attempt {}", command, attempt);
                Ok(attempt)
            }
            WaitOutcome::Exhausted => {
                warn!(
                    "No status from roof after {} ({} attempts of {:?}, {:?} total)",
                    command,
                    self.wait.attempts,
                    self.wait.interval,
                    self.wait.total()
                );
                Err(self.wait.timed_out())
            }
            WaitOutcome::LinkDown => {
                warn!("Link lost while waiting for roof after {}", command);
                Err(Error::NotConnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofctl_protocol::StatusMessage;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_millis(600);

    fn live_cache() -> StatusCache {
        let cache = StatusCache::new();
        cache.mark_link_up();
        cache
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(BoundedWait::new(5, INTERVAL).total(), Duration::from_millis(3000));
        let config = DriverConfig::default();
        assert_eq!(BoundedWait::from_config(&config), BoundedWait::new(5, INTERVAL));
    }

    #[test]
    fn test_total_saturates() {
        let wait = BoundedWait::new(u32::MAX, Duration::from_millis(u64::MAX));
        assert_eq!(wait.total(), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_all_windows() {
        let cache = live_cache();
        let mut updates = cache.subscribe();
        let start = Instant::now();

        let outcome = BoundedWait::new(5, INTERVAL).wait(&mut updates).await;

        assert_eq!(outcome, WaitOutcome::Exhausted);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_in_third_window() {
        let cache = live_cache();
        let mut updates = cache.subscribe();
        let start = Instant::now();

        let writer = cache.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            writer.ingest(&StatusMessage::from("0,2,0,0,0,12.3")).unwrap();
        });

        let outcome = BoundedWait::new(5, INTERVAL).wait(&mut updates).await;

        assert_eq!(outcome, WaitOutcome::Fresh { attempt: 3 });
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_frame_does_not_end_wait() {
        let cache = live_cache();
        let mut updates = cache.subscribe();

        let writer = cache.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = writer.ingest(&StatusMessage::from("short"));
        });

        let outcome = BoundedWait::new(2, INTERVAL).wait(&mut updates).await;
        assert_eq!(outcome, WaitOutcome::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_down_ends_wait() {
        let cache = live_cache();
        let mut updates = cache.subscribe();
        let start = Instant::now();

        let writer = cache.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            writer.mark_link_down();
        });

        let outcome = BoundedWait::new(5, INTERVAL).wait(&mut updates).await;

        assert_eq!(outcome, WaitOutcome::LinkDown);
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[test]
    fn test_timed_out_error() {
        let error = BoundedWait::new(5, INTERVAL).timed_out();
        assert_eq!(error.to_string(), "No reply from roof after 5 attempts of 600ms");
    }
}
