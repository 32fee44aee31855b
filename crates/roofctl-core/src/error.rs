use thiserror::Error;

/// Rejection reasons for an inbound frame.
///
/// Framing errors never interrupt byte delivery; the decoding task logs them
/// and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Bad status length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("Status body contains non-ASCII bytes")]
    NonAscii,

    #[error("Frame body exceeded {max} bytes without an end delimiter")]
    Oversized { max: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    // Connection errors
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // Protocol errors
    #[error("Communications failure: {0}")]
    CommsFailure(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // Operation errors
    #[error("No reply from roof after {attempts} attempts of {interval_ms}ms")]
    OperationTimedOut { attempts: u32, interval_ms: u64 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a caller can reasonably retry after this error.
    ///
    /// Comms hiccups and missed replies are transient; everything else points
    /// at the setup or at a programming error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CommsFailure(_) | Self::OperationTimedOut { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
