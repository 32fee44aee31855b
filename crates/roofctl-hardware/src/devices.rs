//! Enum wrapper for transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn Transport>` is
//! not available. [`AnyTransport`] gives the command-line front end one
//! concrete type that can be any of the transports, chosen at run time.
//!
//! # Examples
//!
//! ```
//! use roofctl_hardware::devices::AnyTransport;
//! use roofctl_hardware::simulator::SimulatedRoof;
//! use roofctl_hardware::traits::Transport;
//!
//! let (roof, _handle) = SimulatedRoof::new();
//! let transport = AnyTransport::Simulated(roof);
//! assert_eq!(transport.describe(), "simulator");
//! ```

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::mock::MockTransport;
use crate::serial::SerialTransport;
use crate::simulator::SimulatedRoof;
use crate::traits::Transport;
use crate::types::SerialSettings;

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Local serial port.
    Serial(SerialTransport),

    /// In-process firmware simulator.
    Simulated(SimulatedRoof),

    /// Scripted transport for testing.
    Mock(MockTransport),
}

impl AnyTransport {
    /// Serial transport for the given port name.
    pub fn serial(port: impl Into<String>) -> Self {
        Self::Serial(SerialTransport::new(port))
    }
}

impl Transport for AnyTransport {
    async fn open(&mut self, settings: &SerialSettings) -> Result<mpsc::Receiver<Bytes>> {
        match self {
            Self::Serial(transport) => transport.open(settings).await,
            Self::Simulated(transport) => transport.open(settings).await,
            Self::Mock(transport) => transport.open(settings).await,
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Serial(transport) => transport.write(bytes).await,
            Self::Simulated(transport) => transport.write(bytes).await,
            Self::Mock(transport) => transport.write(bytes).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(transport) => transport.close().await,
            Self::Simulated(transport) => transport.close().await,
            Self::Mock(transport) => transport.close().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Serial(transport) => transport.is_open(),
            Self::Simulated(transport) => transport.is_open(),
            Self::Mock(transport) => transport.is_open(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Serial(transport) => transport.describe(),
            Self::Simulated(transport) => transport.describe(),
            Self::Mock(transport) => transport.describe(),
        }
    }
}
