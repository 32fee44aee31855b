//! Mock transport for development and testing.
//!
//! The mock is driven from the test side through a [`MockTransportHandle`]:
//! inject inbound bytes, inspect what was written, pull the plug.

pub mod transport;

pub use transport::{MockTransport, MockTransportHandle};
