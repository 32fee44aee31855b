//! Outbound command tokens.
//!
//! Commands are single ASCII words terminated by `#`. There is no reply frame;
//! the device acknowledges implicitly through its next status broadcast.
//!
//! ```text
//! host ──> device:  OPEN#
//! device ──> host:  $0,2,0,0,0,12.3#   (roof now opening)
//! ```

use roofctl_core::constants::END_DELIMITER;
use std::fmt;

/// Action names advertised to callers that enumerate device actions.
///
/// Invoking one of these through an action-name passthrough is reserved; they
/// are reachable today as plain commands through `send`.
pub const SUPPORTED_ACTIONS: [&str; 9] = [
    "INIT",
    "FORCEOPEN",
    "FORCECLOSE",
    "NORAINSENSE",
    "NOPARKSENSE",
    "RAINSENSE",
    "PARKSENSE",
    "PARKSENSOR",
    "RAINSENSOR",
];

/// Command understood by the roof firmware.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Start opening the roof.
    Open,
    /// Start closing the roof.
    Close,
    /// Stop roof and mount motion.
    Abort,
    /// Re-run the controller start-up sequence.
    Init,
    /// Open ignoring the rain and park interlocks.
    ForceOpen,
    /// Close ignoring the park interlock.
    ForceClose,
    /// Disable the rain sensor interlock.
    NoRainSense,
    /// Disable the park sensor interlock.
    NoParkSense,
    /// Re-enable the rain sensor interlock.
    RainSense,
    /// Re-enable the park sensor interlock.
    ParkSense,
    /// Request the park sensor reading.
    ParkSensor,
    /// Request the rain sensor reading.
    RainSensor,
    /// Any other token, written verbatim.
    Other(String),
}

impl Command {
    /// Map a token to a known command, falling back to [`Command::Other`].
    ///
    /// Matching is exact: the firmware is case sensitive.
    pub fn parse(token: &str) -> Self {
        match token {
            "OPEN" => Self::Open,
            "CLOSE" => Self::Close,
            "ABORT" => Self::Abort,
            "INIT" => Self::Init,
            "FORCEOPEN" => Self::ForceOpen,
            "FORCECLOSE" => Self::ForceClose,
            "NORAINSENSE" => Self::NoRainSense,
            "NOPARKSENSE" => Self::NoParkSense,
            "RAINSENSE" => Self::RainSense,
            "PARKSENSE" => Self::ParkSense,
            "PARKSENSOR" => Self::ParkSensor,
            "RAINSENSOR" => Self::RainSensor,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Abort => "ABORT",
            Self::Init => "INIT",
            Self::ForceOpen => "FORCEOPEN",
            Self::ForceClose => "FORCECLOSE",
            Self::NoRainSense => "NORAINSENSE",
            Self::NoParkSense => "NOPARKSENSE",
            Self::RainSense => "RAINSENSE",
            Self::ParkSense => "PARKSENSE",
            Self::ParkSensor => "PARKSENSOR",
            Self::RainSensor => "RAINSENSOR",
            Self::Other(token) => token,
        }
    }

    /// Bytes written to the device: the token followed by the end delimiter.
    ///
    /// # Example
    ///
    /// ```
    /// use roofctl_protocol::Command;
    ///
    /// assert_eq!(Command::Open.wire_bytes(), b"OPEN#");
    /// assert_eq!(Command::parse("RAIN").wire_bytes(), b"RAIN#");
    /// ```
    pub fn wire_bytes(&self) -> Vec<u8> {
        let token = self.as_str();
        let mut wire = Vec::with_capacity(token.len() + 1);
        wire.extend_from_slice(token.as_bytes());
        wire.push(END_DELIMITER);
        wire
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Command {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}
