//! Driver configuration.
//!
//! The configuration is a plain JSON document. Every field is optional:
//!
//! ```json
//! {
//!   "port": "/dev/ttyUSB0",
//!   "trace": false,
//!   "baud_rate": 19200,
//!   "poll_interval_ms": 600,
//!   "poll_attempts": 5,
//!   "broadcast_timeout_ms": 10000
//! }
//! ```

use roofctl_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_BROADCAST_TIMEOUT_MS, DEFAULT_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT,
};
use roofctl_core::{Error, Result};
use roofctl_hardware::SerialSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for one roof driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Serial port the roof controller is attached to.
    pub port: String,

    /// Raise logging to debug level.
    pub trace: bool,

    pub baud_rate: u32,

    /// Length of one status poll window.
    pub poll_interval_ms: u64,

    /// Number of poll windows an open or close waits for fresh status.
    pub poll_attempts: u32,

    /// How long to wait for a broadcast when no command was sent.
    ///
    /// Must cover the firmware broadcast period, unlike the open/close wait
    /// which only has to cover the command turnaround.
    pub broadcast_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            trace: false,
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            broadcast_timeout_ms: DEFAULT_BROADCAST_TIMEOUT_MS,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or a value is out of
    /// range.
    ///
    /// # Example
    ///
    /// ```
    /// use roofctl_controller::DriverConfig;
    ///
    /// let config = DriverConfig::from_json(r#"{"port": "COM4", "poll_attempts": 8}"#).unwrap();
    /// assert_eq!(config.port, "COM4");
    /// assert_eq!(config.poll_attempts, 8);
    /// assert_eq!(config.poll_interval_ms, 600);
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`DriverConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check that the values can drive a connection.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::Config("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Error::Config("baud_rate must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.poll_attempts == 0 {
            return Err(Error::Config("poll_attempts must be at least 1".to_string()));
        }
        if self.broadcast_timeout_ms == 0 {
            return Err(Error::Config("broadcast_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Replace the port name.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Line settings for the transport: the configured port and baud rate,
    /// 8N1 with no flow control.
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(self.port.clone()).with_baud_rate(self.baud_rate)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }
}
