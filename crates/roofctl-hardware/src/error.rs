//! Error types for transport operations.
//!
//! The controller never shows these to its callers directly: open failures
//! become `ConnectionFailed`, everything raised by a write becomes
//! `CommsFailure`.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while opening, writing to or closing a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport is not open.
    #[error("Transport not open: {device}")]
    NotOpen { device: String },

    /// The device went away while the transport was open.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The port could not be opened.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Writing to the device failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Settings the transport cannot apply.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Error reported by the serial port driver.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a new not-open error.
    pub fn not_open(device: impl Into<String>) -> Self {
        Self::NotOpen {
            device: device.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new open failure.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
