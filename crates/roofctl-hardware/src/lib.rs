//! Transport layer for the roof controller link.
//!
//! This crate moves bytes to and from the roof controller. It provides the
//! [`Transport`] trait plus three implementations:
//!
//! - [`SerialTransport`]: the real serial port, via the `serialport` crate
//! - [`SimulatedRoof`]: an in-process model of the roof firmware
//! - [`MockTransport`]: a scripted far end for tests
//!
//! [`AnyTransport`] wraps them for run-time selection.
//!
//! # Design
//!
//! - **Async-first**: trait methods return `Send` futures, so a controller
//!   generic over the transport can be driven from any tokio task.
//! - **Framing-agnostic**: inbound bytes arrive as raw chunks on a
//!   `tokio::sync::mpsc` channel; decoding belongs to the protocol crate.
//! - **Error-aware**: every operation returns [`Result<T>`][error::Result]
//!   with a [`TransportError`].
//!
//! # Example
//!
//! ```no_run
//! use roofctl_hardware::traits::Transport;
//! use roofctl_hardware::types::SerialSettings;
//! use roofctl_hardware::SerialTransport;
//!
//! #[tokio::main]
//! async fn main() -> roofctl_hardware::Result<()> {
//!     let settings = SerialSettings::new("/dev/ttyUSB0");
//!     let mut port = SerialTransport::new(&settings.port);
//!
//!     let mut inbound = port.open(&settings).await?;
//!     port.write(b"ABORT#").await?;
//!
//!     while let Some(chunk) = inbound.recv().await {
//!         println!("{} bytes", chunk.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod simulator;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyTransport;
pub use error::{Result, TransportError};
pub use mock::{MockTransport, MockTransportHandle};
pub use serial::{SerialTransport, list_ports};
pub use simulator::{RoofModel, SimulatedRoof, SimulatorConfig, SimulatorHandle};
pub use traits::Transport;
pub use types::{FlowControl, Parity, PortInfo, SerialSettings, StopBits};
