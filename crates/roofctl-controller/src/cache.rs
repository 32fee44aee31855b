//! Freshness-tagged cache of the last valid status broadcast.
//!
//! The cache lives in a `tokio::sync::watch` channel. The decoding task is
//! the only writer of snapshots; callers read, clear freshness before an
//! action, and subscribe to wait for the next valid broadcast.
//!
//! ```text
//!  decoding task ── ingest() ──> ┌──────────────┐ ──> field() / snapshot()
//!                                │  CacheState  │
//!  shutter op ─ clear_freshness ─>│  (watch)     │ ──> subscribe() ──> BoundedWait
//!                                └──────────────┘
//! ```

use roofctl_core::{FrameError, StatusField};
use roofctl_protocol::{StatusMessage, StatusSnapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Value carried by the cache channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    /// Last snapshot that passed validation, fresh or not.
    pub snapshot: Option<StatusSnapshot>,

    /// Whether `snapshot` arrived since freshness was last cleared.
    pub fresh: bool,

    /// Incremented for every installed snapshot.
    pub generation: u64,

    /// Whether bytes are still being delivered from the device.
    pub link_up: bool,

    /// Number of frames rejected since the cache was created.
    pub rejected: u64,
}

/// Shared handle to the status cache.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct StatusCache {
    state: Arc<watch::Sender<CacheState>>,
}

impl StatusCache {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Validate a candidate message and install it.
    ///
    /// A valid body replaces the snapshot wholesale and marks the cache
    /// fresh. An invalid one leaves the previous snapshot in place and clears
    /// freshness.
    ///
    /// # Errors
    ///
    /// Returns the [`FrameError`] that rejected the message.
    pub fn ingest(&self, message: &StatusMessage) -> Result<(), FrameError> {
        match StatusSnapshot::parse(message) {
            Ok(snapshot) => {
                self.state.send_modify(|state| {
                    state.snapshot = Some(snapshot);
                    state.fresh = true;
                    state.generation += 1;
                });
                trace!("Installed status {}", message);
                Ok(())
            }
            Err(e) => {
                self.record_rejection();
                Err(e)
            }
        }
    }

    /// Count a corrupted frame: the snapshot stays, freshness is cleared.
    ///
    /// Used directly for frames the decoder dropped before they completed.
    pub fn record_rejection(&self) {
        self.state.send_modify(|state| {
            state.fresh = false;
            state.rejected += 1;
        });
    }

    /// Value of one field, only while the cache is fresh.
    pub fn field(&self, field: StatusField) -> Option<String> {
        let state = self.state.borrow();
        if !state.fresh {
            return None;
        }
        state
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.field(field).to_string())
    }

    /// Last known snapshot regardless of freshness.
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    pub fn is_fresh(&self) -> bool {
        self.state.borrow().fresh
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn rejected(&self) -> u64 {
        self.state.borrow().rejected
    }

    /// Copy of the whole state.
    pub fn state(&self) -> CacheState {
        self.state.borrow().clone()
    }

    /// Mark the cached status stale.
    ///
    /// Waiters are only woken if the cache was fresh.
    pub fn clear_freshness(&self) {
        self.state.send_if_modified(|state| std::mem::replace(&mut state.fresh, false));
    }

    /// Receiver that observes every change to the cache.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.state.subscribe()
    }

    /// A new link is up. Nothing has been heard on it yet, so the cache
    /// starts stale.
    pub fn mark_link_up(&self) {
        self.state.send_modify(|state| {
            state.link_up = true;
            state.fresh = false;
        });
    }

    /// The link is gone; wakes every waiter.
    pub fn mark_link_down(&self) {
        self.state.send_modify(|state| {
            state.link_up = false;
            state.fresh = false;
        });
    }

    pub fn is_link_up(&self) -> bool {
        self.state.borrow().link_up
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
