//! Logical command dispatch.
//!
//! Six reserved names read the status cache; everything else is written to
//! the device followed by `#`. Writes are fire-and-forget: the device never
//! answers a command directly, so the caller gets the ack token back.
//!
//! | Command                | Cache fresh      | Cache stale            |
//! |------------------------|------------------|------------------------|
//! | `RAIN`, `SHUTTERSTATUS`, `PARK`, `RAINSENSOR`, `PARKSENSOR`, `SPARE` | cached value | write-through, `"1"` |
//! | anything else          | write, `"1"`     | write, `"1"`           |

use roofctl_core::constants::{ACK_TOKEN, TRUTHY_TOKEN};
use roofctl_core::{Error, Result, StatusField};
use roofctl_hardware::{Transport, TransportError};
use roofctl_protocol::Command;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::StatusCache;

/// Routes logical commands to the cache or the transport.
pub struct CommandDispatcher<T: Transport> {
    transport: Arc<Mutex<T>>,
    cache: StatusCache,
}

impl<T: Transport> Clone for CommandDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cache: self.cache.clone(),
        }
    }
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(transport: Arc<Mutex<T>>, cache: StatusCache) -> Self {
        Self { transport, cache }
    }

    /// Dispatch one logical command.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the transport is closed
    /// - [`Error::NotImplemented`] if `raw` is set
    /// - [`Error::CommsFailure`] if the write fails
    pub async fn dispatch(&self, command: &str, raw: bool) -> Result<String> {
        let mut transport = self.transport.lock().await;
        if !transport.is_open() {
            return Err(Error::NotConnected);
        }
        if raw {
            return Err(Error::NotImplemented(format!("raw command {command}")));
        }

        if let Some(field) = StatusField::from_query_name(command) {
            if let Some(value) = self.cache.field(field) {
                debug!("{} served from cache: {}", command, value);
                return Ok(value);
            }
            if field == StatusField::ShutterStatus {
                warn!("No fresh shutter data, writing {} through to the device", command);
            }
        }

        write_command(&mut *transport, &Command::parse(command)).await?;
        Ok(ACK_TOKEN.to_string())
    }

    /// Dispatch and interpret the answer as a flag.
    pub async fn dispatch_bool(&self, command: &str, raw: bool) -> Result<bool> {
        Ok(self.dispatch(command, raw).await? == TRUTHY_TOKEN)
    }

    /// Whether the transport reports open right now.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_open()
    }
}

/// Write a command and its end delimiter.
pub(crate) async fn write_command<T: Transport>(transport: &mut T, command: &Command) -> Result<()> {
    debug!("Writing {} to {}", command, transport.describe());
    transport
        .write(&command.wire_bytes())
        .await
        .map_err(write_error)
}

/// Map a transport write failure onto the caller-facing error.
pub(crate) fn write_error(error: TransportError) -> Error {
    match error {
        TransportError::NotOpen { .. } => Error::NotConnected,
        other => Error::CommsFailure(other.to_string()),
    }
}
