//! Mock transport implementation for testing and development.
//!
//! This module provides a transport whose far end is controlled
//! programmatically, so the controller can be tested without a serial port.

use bytes::Bytes;
use roofctl_core::constants::{END_DELIMITER, INBOUND_CHANNEL_CAPACITY};
use roofctl_protocol::StatusMessage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use crate::types::SerialSettings;

/// State shared between the transport and its handles.
#[derive(Debug, Default)]
struct MockLink {
    /// Sender for the currently open inbound channel.
    inbound: Option<mpsc::Sender<Bytes>>,

    /// Every successful write, in order.
    written: Vec<Vec<u8>>,

    /// Settings passed to the last `open`.
    settings: Option<SerialSettings>,

    opens: usize,
    fail_open: bool,
    fail_writes: bool,
}

/// Mock transport for testing and development.
///
/// Inbound bytes come from a [`MockTransportHandle`]; writes are recorded so
/// tests can assert on what the controller sent.
///
/// # Examples
///
/// ```
/// use roofctl_hardware::mock::MockTransport;
/// use roofctl_hardware::traits::Transport;
/// use roofctl_hardware::types::SerialSettings;
///
/// #[tokio::main]
/// async fn main() -> roofctl_hardware::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///     let _inbound = transport.open(&SerialSettings::default()).await?;
///     assert!(transport.is_open());
///
///     handle.unplug();
///     assert!(!transport.is_open());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    link: Arc<Mutex<MockLink>>,
    writes_tx: watch::Sender<usize>,
}

impl MockTransport {
    /// Create a new mock transport with the default name.
    ///
    /// Returns a tuple of (MockTransport, MockTransportHandle) where the handle
    /// plays the part of the device.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_name("mock")
    }

    /// Create a new mock transport with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockTransportHandle) {
        let name = name.into();
        let link = Arc::new(Mutex::new(MockLink::default()));
        let (writes_tx, writes_rx) = watch::channel(0);

        let transport = Self {
            name: name.clone(),
            link: Arc::clone(&link),
            writes_tx,
        };
        let handle = MockTransportHandle {
            name,
            link,
            writes_rx,
        };

        (transport, handle)
    }

    fn link(&self) -> MutexGuard<'_, MockLink> {
        lock(&self.link)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new().0
    }
}

impl Transport for MockTransport {
    async fn open(&mut self, settings: &SerialSettings) -> Result<mpsc::Receiver<Bytes>> {
        let mut link = self.link();
        if link.fail_open {
            return Err(TransportError::open_failed(
                settings.port.clone(),
                "mock configured to fail",
            ));
        }

        // A fresh channel means nothing injected before open is ever seen
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        link.inbound = Some(inbound_tx);
        link.settings = Some(settings.clone());
        link.opens += 1;
        Ok(inbound_rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let count = {
            let mut link = self.link();
            if link.inbound.is_none() {
                return Err(TransportError::not_open(self.name.clone()));
            }
            if link.fail_writes {
                return Err(TransportError::communication("mock configured to fail writes"));
            }
            link.written.push(bytes.to_vec());
            link.written.len()
        };
        self.writes_tx.send_replace(count);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.link().inbound = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.link().inbound.is_some()
    }

    fn describe(&self) -> String {
        format!("mock:{}", self.name)
    }
}

/// Handle for controlling a mock transport.
///
/// This handle plays the device: it injects inbound bytes and observes
/// writes. It can be cloned and shared across tasks.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    name: String,
    link: Arc<Mutex<MockLink>>,
    writes_rx: watch::Receiver<usize>,
}

impl MockTransportHandle {
    /// Deliver raw bytes to the open inbound channel.
    ///
    /// # Errors
    ///
    /// Returns `NotOpen` if the transport is closed, or `Disconnected` if
    /// nobody is reading the channel anymore.
    pub async fn inject(&self, bytes: impl Into<Bytes>) -> Result<()> {
        let sender = lock(&self.link)
            .inbound
            .clone()
            .ok_or_else(|| TransportError::not_open(self.name.clone()))?;

        sender
            .send(bytes.into())
            .await
            .map_err(|_| TransportError::disconnected(self.name.clone()))
    }

    /// Deliver a body wrapped in start and end delimiters.
    pub async fn inject_frame(&self, body: &str) -> Result<()> {
        self.inject(StatusMessage::from(body).framed()).await
    }

    /// Every write so far, as raw bytes.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.link).written.clone()
    }

    /// Every write so far with the end delimiter stripped.
    pub fn written_commands(&self) -> Vec<String> {
        lock(&self.link)
            .written
            .iter()
            .map(|bytes| {
                let token = bytes.strip_suffix(&[END_DELIMITER]).unwrap_or(bytes);
                String::from_utf8_lossy(token).into_owned()
            })
            .collect()
    }

    /// Wait until at least `count` writes have been recorded.
    pub async fn wait_for_writes(&self, count: usize) {
        let mut writes = self.writes_rx.clone();
        // The sender lives in the transport; if it is gone no more writes come
        let _ = writes.wait_for(|&written| written >= count).await;
    }

    /// Simulate the cable being pulled: the link closes and the inbound
    /// channel ends.
    pub fn unplug(&self) {
        lock(&self.link).inbound = None;
    }

    /// Make subsequent `open` calls fail.
    pub fn fail_open(&self, fail: bool) {
        lock(&self.link).fail_open = fail;
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.link).fail_writes = fail;
    }

    /// Number of successful `open` calls.
    pub fn open_count(&self) -> usize {
        lock(&self.link).opens
    }

    /// Settings passed to the last successful `open`.
    pub fn last_settings(&self) -> Option<SerialSettings> {
        lock(&self.link).settings.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn lock(link: &Mutex<MockLink>) -> MutexGuard<'_, MockLink> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_records_settings() {
        let (mut transport, handle) = MockTransport::new();
        assert!(!transport.is_open());

        let settings = SerialSettings::new("/dev/ttyS3");
        let _inbound = transport.open(&settings).await.unwrap();

        assert!(transport.is_open());
        assert_eq!(handle.open_count(), 1);
        assert_eq!(handle.last_settings(), Some(settings));
    }

    #[tokio::test]
    async fn test_inject_reaches_receiver() {
        let (mut transport, handle) = MockTransport::new();
        let mut inbound = transport.open(&SerialSettings::default()).await.unwrap();

        handle.inject(&b"noise"[..]).await.unwrap();
        handle.inject_frame("0,1,0,0,0,12.3").await.unwrap();

        assert_eq!(inbound.recv().await.unwrap().as_ref(), b"noise");
        assert_eq!(inbound.recv().await.unwrap().as_ref(), b"$0,1,0,0,0,12.3#");
    }

    #[tokio::test]
    async fn test_inject_before_open_fails() {
        let (_transport, handle) = MockTransport::new();
        let result = handle.inject_frame("0,1,0,0,0,12.3").await;
        assert!(matches!(result, Err(TransportError::NotOpen { .. })));
    }

    #[tokio::test]
    async fn test_write_records_commands() {
        let (mut transport, handle) = MockTransport::new();
        let _inbound = transport.open(&SerialSettings::default()).await.unwrap();

        transport.write(b"OPEN#").await.unwrap();
        transport.write(b"RAIN#").await.unwrap();
        handle.wait_for_writes(2).await;

        assert_eq!(handle.written(), vec![b"OPEN#".to_vec(), b"RAIN#".to_vec()]);
        assert_eq!(handle.written_commands(), vec!["OPEN", "RAIN"]);
    }

    #[tokio::test]
    async fn test_write_when_closed_fails() {
        let (mut transport, handle) = MockTransport::new();
        let result = transport.write(b"OPEN#").await;
        assert!(matches!(result, Err(TransportError::NotOpen { .. })));
        assert!(handle.written().is_empty());
    }

    #[tokio::test]
    async fn test_configured_failures() {
        let (mut transport, handle) = MockTransport::new();

        handle.fail_open(true);
        assert!(transport.open(&SerialSettings::default()).await.is_err());

        handle.fail_open(false);
        let _inbound = transport.open(&SerialSettings::default()).await.unwrap();

        handle.fail_writes(true);
        let result = transport.write(b"OPEN#").await;
        assert!(matches!(result, Err(TransportError::CommunicationError { .. })));
    }

    #[tokio::test]
    async fn test_unplug_closes_inbound_channel() {
        let (mut transport, handle) = MockTransport::new();
        let mut inbound = transport.open(&SerialSettings::default()).await.unwrap();

        handle.unplug();

        assert!(!transport.is_open());
        assert!(inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut transport, _handle) = MockTransport::new();
        transport.close().await.unwrap();
        let _inbound = transport.open(&SerialSettings::default()).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }
}
