//! Transport trait definition.
//!
//! A transport moves raw bytes between the host and the roof controller. It
//! knows nothing about framing: inbound bytes are handed over in whatever
//! chunks the line delivers them, outbound bytes are written verbatim.
//!
//! ```text
//!            open()                      write()
//!   caller ─────────> Transport   caller ─────────> Transport ──> device
//!                        │
//!                        └── mpsc::Receiver<Bytes> ──> decoding task
//! ```
//!
//! Methods return `impl Future + Send` so a controller generic over the
//! transport can still be driven from spawned tasks. Implementations are free
//! to write them as plain `async fn`.

use bytes::Bytes;
use std::future::Future;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::SerialSettings;

/// Byte pipe to a roof controller.
///
/// # Contract
///
/// - `open` discards anything the device sent before the call and returns
///   the receiving end of the inbound byte channel. The channel closes when
///   the link is lost or the transport is closed.
/// - `write` sends the bytes as-is. It must fail rather than silently drop
///   bytes when the transport is not open.
/// - `is_open` reflects the current state of the link every time it is
///   called; it is never cached by callers.
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
///
///     let mut inbound = transport.open(&SerialSettings::default()).await?;
///     transport.write(b"OPEN#").await?;
///     handle.inject_frame("0,2,0,0,0,12.3").await?;
///
///     assert_eq!(handle.written_commands(), vec!["OPEN"]);
///     assert_eq!(inbound.recv().await.unwrap().as_ref(), b"$0,2,0,0,0,12.3#");
///     Ok(())
/// }
/// ```
pub trait Transport: Send {
    /// Open the link and start delivering inbound bytes.
    ///
    /// # Errors
    ///
    /// - [`TransportError::OpenFailed`] if the port cannot be opened
    /// - [`TransportError::ConfigurationError`] if the settings are invalid
    ///
    /// [`TransportError::OpenFailed`]: crate::TransportError::OpenFailed
    /// [`TransportError::ConfigurationError`]: crate::TransportError::ConfigurationError
    fn open(
        &mut self,
        settings: &SerialSettings,
    ) -> impl Future<Output = Result<mpsc::Receiver<Bytes>>> + Send;

    /// Write bytes to the device.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotOpen`] if the transport is closed
    /// - [`TransportError::CommunicationError`] if the write fails
    ///
    /// [`TransportError::NotOpen`]: crate::TransportError::NotOpen
    /// [`TransportError::CommunicationError`]: crate::TransportError::CommunicationError
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Close the link. Closing a closed transport succeeds.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;

    /// Short description for logs (port name or simulator label).
    fn describe(&self) -> String;
}
