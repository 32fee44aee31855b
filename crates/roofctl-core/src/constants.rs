//! Core constants for the roll-off roof serial protocol.
//!
//! The roof controller broadcasts a status frame every few seconds and accepts
//! single-word ASCII commands. Every value the host side needs to agree on with
//! the firmware lives here so the framing, cache and command layers stay in sync.
//!
//! # Protocol Structure
//!
//! Device to host status frame:
//!
//! ```text
//! $f1,f2,f3,f4,f5,f6#
//! ```
//!
//! Where:
//! - `$` - Start delimiter
//! - `f1` - Rain flag
//! - `f2` - Shutter state (`0` open, `1` closed, `2` opening, `3` closing)
//! - `f3` - Park flag
//! - `f4` - Rain sensor override flag
//! - `f5` - Park sensor override flag
//! - `f6` - Spare field
//! - `#` - End delimiter
//!
//! Host to device command:
//!
//! ```text
//! OPEN#
//! ```
//!
//! Commands carry no start delimiter, only the trailing `#`.
//!
//! # Usage
//!
//! ```
//! use roofctl_core::constants::*;
//!
//! assert_eq!(START_DELIMITER, b'$');
//! assert_eq!(STATUS_BODY_LENGTH, 14);
//!
//! use std::time::Duration;
//! let window = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! assert_eq!(window.as_millis(), 600);
//! ```

// ============================================================================
// Frame Delimiters
// ============================================================================

/// Start of a status frame sent by the roof controller.
///
/// Seeing this byte always restarts frame accumulation, even in the middle
/// of a partially received frame.
pub const START_DELIMITER: u8 = b'$';

/// End of a status frame, and terminator of every host command.
///
/// # Examples
///
/// ```
/// use roofctl_core::constants::END_DELIMITER;
///
/// let wire = format!("OPEN{}", END_DELIMITER as char);
/// assert_eq!(wire, "OPEN#");
/// ```
pub const END_DELIMITER: u8 = b'#';

/// Separator between the six status fields.
///
/// # Examples
///
/// ```
/// use roofctl_core::constants::FIELD_SEPARATOR;
///
/// let fields: Vec<&str> = "0,1,0,0,0,12.3".split(FIELD_SEPARATOR).collect();
/// assert_eq!(fields.len(), 6);
/// ```
pub const FIELD_SEPARATOR: char = ',';

// ============================================================================
// Status Message Layout
// ============================================================================

/// Exact body length of a valid status message, delimiters excluded.
///
/// This is the only invariant the firmware guarantees about a status body.
/// Older firmware revisions sent 17 characters; those frames are rejected.
pub const STATUS_BODY_LENGTH: usize = 14;

/// Number of comma separated fields in a status body.
pub const STATUS_FIELD_COUNT: usize = 6;

/// Upper bound on a buffered frame body.
///
/// The protocol defines a fixed 14 character body, so anything growing past
/// this is line noise or a lost end delimiter. The decoder drops the partial
/// frame and resynchronises on the next start delimiter.
pub const MAX_FRAME_BODY: usize = 64;

// ============================================================================
// Command Tokens
// ============================================================================

/// Token returned by a successful write-through command.
///
/// Write-through commands are fire-and-forget: the host never waits for an
/// acknowledgement, it just reports that the bytes went out.
pub const ACK_TOKEN: &str = "1";

/// Canonical truthy token for boolean queries.
///
/// A boolean query is true exactly when the returned token equals this value.
pub const TRUTHY_TOKEN: &str = "1";

// ============================================================================
// Serial Line Settings
// ============================================================================

/// Baud rate used by current firmware (older firmware used 9600).
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Data bits per character.
pub const DATA_BITS: u8 = 8;

/// Read timeout for the blocking serial reader, in milliseconds.
///
/// Only bounds how long the reader thread blocks before re-checking
/// whether it should stop; it has no protocol meaning.
pub const SERIAL_READ_TIMEOUT_MS: u64 = 100;

/// Default serial port name.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM1";

/// Default serial port name.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

// ============================================================================
// Shutter Operation Timing
// ============================================================================

/// Length of one bounded-wait window after an open or close command (ms).
///
/// # Value: 600ms
///
/// The controller broadcasts far less often than it turns a command around,
/// so a handful of short windows approximates "wait for the next reply".
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 600;

/// Number of bounded-wait windows before an operation is declared timed out.
///
/// # Value: 5 (3 seconds total with the default interval)
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

/// How long to wait for an unsolicited status broadcast (ms).
///
/// # Value: 10000ms
///
/// The firmware broadcasts every 4 seconds. Waiting for status without having
/// sent a command has to cover at least one full period, so this is kept well
/// clear of both the period and the open/close wait.
pub const DEFAULT_BROADCAST_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the channel carrying inbound byte chunks from a transport.
pub const INBOUND_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Driver Identity
// ============================================================================

/// Short driver name reported to adapter layers.
pub const DRIVER_NAME: &str = "roofctl";

/// Human readable description reported to adapter layers.
pub const DRIVER_DESCRIPTION: &str = "Roll-off roof controller driver";

/// Version of the dome-style interface this driver exposes.
pub const INTERFACE_VERSION: i16 = 2;
