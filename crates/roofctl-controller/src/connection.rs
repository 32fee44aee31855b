//! Connection lifecycle and the decoding task.
//!
//! Connecting opens the transport and spawns one decoding task per link. The
//! task owns the [`FrameDecoder`] and is the only writer of status snapshots:
//!
//! ```text
//! ┌───────────┐  Bytes   ┌──────────────────────────┐  ingest  ┌─────────────┐
//! │ Transport │ ───────> │ decoding task            │ ───────> │ StatusCache │
//! └───────────┘  (mpsc)  │  FrameDecoder::feed(b)   │          └─────────────┘
//!                        └──────────────────────────┘
//! ```
//!
//! Framing problems are logged and absorbed; they never stop byte delivery.
//! A runaway body dropped at the size cap counts as a corrupted frame and
//! clears freshness, the same as a body of the wrong length.
//! The task ends when the link closes or on disconnect, and marks the cache
//! link-down on the way out so pending waits end immediately.

use bytes::Bytes;
use roofctl_core::constants::MAX_FRAME_BODY;
use roofctl_core::{Error, FrameError, Result};
use roofctl_hardware::{SerialSettings, Transport};
use roofctl_protocol::FrameDecoder;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cache::StatusCache;

/// Counters reported by a decoding task when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames installed in the cache.
    pub accepted: u64,

    /// Frames rejected by validation or dropped for exceeding the body cap.
    pub rejected: u64,

    /// Partial frames dropped by a new start delimiter.
    pub restarts: u64,

    /// Partial frames dropped for exceeding the body cap.
    pub overflows: u64,
}

/// Running decoding task for one link.
struct DecodeSession {
    cancel: CancellationToken,
    task: JoinHandle<DecoderStats>,
}

impl DecodeSession {
    async fn stop(self) {
        self.cancel.cancel();
        match self.task.await {
            Ok(stats) => debug!("Decoder stopped: {:?}", stats),
            Err(e) => warn!("Decoder task failed: {}", e),
        }
    }
}

/// Opens and closes the link and owns the decoding task.
pub struct ConnectionManager<T: Transport> {
    transport: Arc<Mutex<T>>,
    cache: StatusCache,
    settings: SerialSettings,
    session: Mutex<Option<DecodeSession>>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: Arc<Mutex<T>>, cache: StatusCache, settings: SerialSettings) -> Self {
        Self {
            transport,
            cache,
            settings,
            session: Mutex::new(None),
        }
    }

    /// Open the transport and start decoding.
    ///
    /// Connecting while connected does nothing. Failures are reported, not
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the transport cannot be opened.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let mut transport = self.transport.lock().await;

        if transport.is_open() {
            debug!("Already connected to {}", transport.describe());
            return Ok(());
        }

        // The previous link may have died on its own
        if let Some(stale) = session.take() {
            stale.stop().await;
        }

        info!("Connecting to {}", self.settings);
        let inbound = transport
            .open(&self.settings)
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        self.cache.mark_link_up();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(decode_loop(inbound, self.cache.clone(), cancel.clone()));
        *session = Some(DecodeSession { cancel, task });

        info!("Connected to {}", transport.describe());
        Ok(())
    }

    /// Stop decoding and close the transport. Does nothing when closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommsFailure`] if the transport fails to close.
    pub async fn disconnect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let mut transport = self.transport.lock().await;

        if let Some(running) = session.take() {
            running.stop().await;
        }
        self.cache.mark_link_down();

        if transport.is_open() {
            transport
                .close()
                .await
                .map_err(|e| Error::CommsFailure(e.to_string()))?;
            info!("Disconnected from {}", transport.describe());
        }
        Ok(())
    }

    /// Whether the transport reports open. Asked every time, never cached.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_open()
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

async fn decode_loop(
    mut inbound: mpsc::Receiver<Bytes>,
    cache: StatusCache,
    cancel: CancellationToken,
) -> DecoderStats {
    let mut decoder = FrameDecoder::new();
    let mut stats = DecoderStats::default();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            chunk = inbound.recv() => match chunk {
                Some(chunk) => chunk,
                None => {
                    warn!("Inbound byte stream ended, link lost");
                    break;
                }
            },
        };

        trace!("Received {} bytes", chunk.len());
        for &byte in chunk.iter() {
            let overflows = decoder.overflows();

            if let Some(message) = decoder.feed(byte) {
                match cache.ingest(&message) {
                    Ok(()) => stats.accepted += 1,
                    Err(e) => {
                        stats.rejected += 1;
                        warn!("Corrupted status message {:?}: {}", message.to_string(), e);
                    }
                }
            }

            if decoder.overflows() > overflows {
                stats.rejected += 1;
                cache.record_rejection();
                warn!(
                    "Corrupted status message: {}",
                    FrameError::Oversized { max: MAX_FRAME_BODY }
                );
            }
        }
    }

    cache.mark_link_down();
    stats.restarts = decoder.restarts();
    stats.overflows = decoder.overflows();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofctl_hardware::MockTransport;
    use std::time::Duration;

    fn manager() -> (
        ConnectionManager<MockTransport>,
        roofctl_hardware::MockTransportHandle,
        StatusCache,
    ) {
        let (transport, handle) = MockTransport::new();
        let cache = StatusCache::new();
        let manager = ConnectionManager::new(
            Arc::new(Mutex::new(transport)),
            cache.clone(),
            SerialSettings::new("/dev/ttyUSB0"),
        );
        (manager, handle, cache)
    }

    async fn wait_fresh(cache: &StatusCache) {
        let mut updates = cache.subscribe();
        tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|s| s.fresh))
            .await
            .expect("timed out waiting for status")
            .expect("cache dropped");
    }

    #[tokio::test]
    async fn test_connect_opens_with_settings() {
        let (manager, handle, cache) = manager();
        assert!(!manager.is_connected().await);

        manager.connect().await.unwrap();

        assert!(manager.is_connected().await);
        assert!(cache.is_link_up());
        let settings = handle.last_settings().unwrap();
        assert_eq!(settings.port, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 19_200);
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let (manager, handle, _cache) = manager();
        manager.connect().await.unwrap();
        manager.connect().await.unwrap();
        assert_eq!(handle.open_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_reported() {
        let (manager, handle, cache) = manager();
        handle.fail_open(true);

        let result = manager.connect().await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
        assert!(!manager.is_connected().await);
        assert!(!cache.is_link_up());
    }

    #[tokio::test]
    async fn test_decoded_frames_reach_cache() {
        let (manager, handle, cache) = manager();
        manager.connect().await.unwrap();

        handle.inject(&b"junk$0,1,0"[..]).await.unwrap();
        handle.inject(&b",0,0,12.3#"[..]).await.unwrap();
        wait_fresh(&cache).await;

        assert_eq!(cache.snapshot().unwrap().roof_state(), "1");
    }

    #[tokio::test]
    async fn test_corrupted_frame_keeps_delivery_running() {
        let (manager, handle, cache) = manager();
        manager.connect().await.unwrap();

        handle.inject_frame("0,1,0,0,0,12.3").await.unwrap();
        wait_fresh(&cache).await;

        let mut updates = cache.subscribe();
        handle.inject_frame("garbled").await.unwrap();
        updates.wait_for(|s| s.rejected == 1).await.unwrap();
        assert!(!cache.is_fresh());

        handle.inject_frame("0,0,0,0,0,12.3").await.unwrap();
        wait_fresh(&cache).await;
        assert_eq!(cache.snapshot().unwrap().roof_state(), "0");
    }

    #[tokio::test]
    async fn test_runaway_frame_clears_freshness() {
        let (manager, handle, cache) = manager();
        manager.connect().await.unwrap();

        handle.inject_frame("0,0,0,0,0,12.3").await.unwrap();
        wait_fresh(&cache).await;

        let mut updates = cache.subscribe();
        let mut runaway = vec![b'$'];
        runaway.extend(std::iter::repeat_n(b'X', 70));
        runaway.push(b'#');
        handle.inject(runaway).await.unwrap();
        updates.wait_for(|s| s.rejected == 1).await.unwrap();

        assert!(!cache.is_fresh());
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.snapshot().unwrap().roof_state(), "0");
    }

    #[tokio::test]
    async fn test_disconnect_closes_and_marks_link_down() {
        let (manager, _handle, cache) = manager();
        manager.connect().await.unwrap();
        manager.disconnect().await.unwrap();

        assert!(!manager.is_connected().await);
        assert!(!cache.is_link_up());

        // Already closed
        manager.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_after_unplug() {
        let (manager, handle, cache) = manager();
        manager.connect().await.unwrap();

        handle.unplug();
        let mut updates = cache.subscribe();
        updates.wait_for(|s| !s.link_up).await.unwrap();
        assert!(!manager.is_connected().await);

        manager.connect().await.unwrap();
        assert!(manager.is_connected().await);
        assert!(cache.is_link_up());
        assert_eq!(handle.open_count(), 2);
    }
}
