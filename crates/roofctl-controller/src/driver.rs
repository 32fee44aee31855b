//! Roof driver facade.
//!
//! [`RoofDriver`] is the logical command surface: everything an adapter layer
//! (the command-line front end, or a device-platform bridge) needs to talk to
//! the roof. It wires the status cache, dispatcher, shutter controller and
//! connection manager around one shared transport.
//!
//! # Example
//!
//! ```
//! use roofctl_controller::{DriverConfig, RoofDriver};
//! use roofctl_core::ShutterState;
//! use roofctl_hardware::{AnyTransport, SimulatedRoof};
//!
//! #[tokio::main]
//! async fn main() -> roofctl_core::Result<()> {
//!     let (roof, _handle) = SimulatedRoof::new();
//!     let driver = RoofDriver::new(AnyTransport::Simulated(roof), DriverConfig::default())?;
//!
//!     driver.connect().await?;
//!     let snapshot = driver.wait_for_status().await?;
//!     assert_eq!(snapshot.shutter_state(), ShutterState::Closed);
//!
//!     driver.disconnect().await
//! }
//! ```

use roofctl_core::constants::{DRIVER_DESCRIPTION, DRIVER_NAME, INTERFACE_VERSION};
use roofctl_core::{Error, Result, ShutterState};
use roofctl_hardware::Transport;
use roofctl_protocol::{SUPPORTED_ACTIONS, StatusSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::debug;

use crate::cache::{CacheState, StatusCache};
use crate::config::DriverConfig;
use crate::connection::ConnectionManager;
use crate::dispatcher::CommandDispatcher;
use crate::shutter::{BoundedWait, ShutterController, WaitOutcome};

/// Identification reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub interface_version: i16,
}

impl Default for DriverInfo {
    fn default() -> Self {
        Self {
            name: DRIVER_NAME,
            description: DRIVER_DESCRIPTION,
            version: roofctl_core::VERSION,
            interface_version: INTERFACE_VERSION,
        }
    }
}

/// Host-side driver for one roll-off roof.
pub struct RoofDriver<T: Transport> {
    config: DriverConfig,
    cache: StatusCache,
    connection: ConnectionManager<T>,
    dispatcher: CommandDispatcher<T>,
    shutter: ShutterController<T>,
}

impl<T: Transport> RoofDriver<T> {
    /// Build a driver around `transport`. Nothing is opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn new(transport: T, config: DriverConfig) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(Mutex::new(transport));
        let cache = StatusCache::new();
        let dispatcher = CommandDispatcher::new(Arc::clone(&transport), cache.clone());
        let shutter = ShutterController::new(
            dispatcher.clone(),
            cache.clone(),
            BoundedWait::from_config(&config),
        );
        let connection = ConnectionManager::new(transport, cache.clone(), config.serial_settings());

        debug!("Created roof driver for {}", config.port);
        Ok(Self {
            config,
            cache,
            connection,
            dispatcher,
            shutter,
        })
    }

    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Send a command without interpreting the answer.
    pub async fn send(&self, command: &str) -> Result<()> {
        self.dispatcher.dispatch(command, false).await?;
        Ok(())
    }

    /// Query a value: cached status fields while fresh, otherwise the ack.
    pub async fn query(&self, command: &str) -> Result<String> {
        self.dispatcher.dispatch(command, false).await
    }

    /// Query a flag; true exactly when the answer is `"1"`.
    pub async fn query_bool(&self, command: &str) -> Result<bool> {
        self.dispatcher.dispatch_bool(command, false).await
    }

    /// Raw passthrough is not supported and always fails once connected.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] when closed, otherwise [`Error::NotImplemented`].
    pub async fn command_raw(&self, command: &str) -> Result<String> {
        self.dispatcher.dispatch(command, true).await
    }

    /// Open the roof. Returns the poll window in which the device reported.
    pub async fn open_shutter(&self) -> Result<u32> {
        self.shutter.open().await
    }

    /// Close the roof. Returns the poll window in which the device reported.
    pub async fn close_shutter(&self) -> Result<u32> {
        self.shutter.close().await
    }

    pub async fn abort(&self) -> Result<()> {
        self.shutter.abort().await
    }

    pub async fn shutter_status(&self) -> Result<ShutterState> {
        self.shutter.status().await
    }

    pub async fn is_slewing(&self) -> Result<bool> {
        self.shutter.is_slewing().await
    }

    /// Last valid snapshot, fresh or not.
    pub fn status_snapshot(&self) -> Option<StatusSnapshot> {
        self.cache.snapshot()
    }

    /// Wait for a fresh status broadcast and return it.
    ///
    /// Returns at once if the cache is already fresh. Otherwise waits one
    /// window of `broadcast_timeout_ms`, which covers the firmware's
    /// unsolicited broadcast period; the open/close poll windows are too
    /// short for that.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the link is down or drops
    /// - [`Error::OperationTimedOut`] if nothing arrives in time
    pub async fn wait_for_status(&self) -> Result<StatusSnapshot> {
        if !self.is_connected().await {
            return Err(Error::NotConnected);
        }

        let mut updates = self.cache.subscribe();
        let wait = BoundedWait::new(1, self.config.broadcast_timeout());
        match wait.wait(&mut updates).await {
            WaitOutcome::Fresh { .. } => self.cache.snapshot().ok_or(Error::NotConnected),
            WaitOutcome::Exhausted => Err(Error::OperationTimedOut {
                attempts: wait.attempts,
                interval_ms: self.config.broadcast_timeout_ms,
            }),
            WaitOutcome::LinkDown => Err(Error::NotConnected),
        }
    }

    /// Receiver that observes every cache change.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.cache.subscribe()
    }

    /// Names of the device actions the roof advertises.
    pub fn supported_actions(&self) -> &'static [&'static str] {
        &SUPPORTED_ACTIONS
    }

    /// Action-name passthrough is reserved; every name is refused.
    ///
    /// The advertised actions are reachable with [`RoofDriver::send`].
    pub fn action(&self, name: &str, _parameters: &str) -> Result<String> {
        Err(Error::NotImplemented(format!("action {name}")))
    }

    pub fn info(&self) -> DriverInfo {
        DriverInfo::default()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }
}
