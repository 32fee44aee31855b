//! Frame decoder for roof controller status broadcasts.
//!
//! The roof controller streams `$...#` framed status messages over a serial
//! line with no length prefix and no checksum. This module turns that byte
//! stream back into candidate message bodies, one byte at a time, so it can be
//! driven directly from whatever delivers inbound bytes.
//!
//! # Protocol Framing
//!
//! ```text
//! $  <body>          #
//! 24 0,1,0,0,0,12.3  23
//! ```
//!
//! # Usage
//!
//! ```
//! use roofctl_protocol::FrameDecoder;
//!
//! let mut decoder = FrameDecoder::new();
//!
//! let mut messages = Vec::new();
//! for &byte in b"noise$0,1,0,0,0,12.3#" {
//!     if let Some(message) = decoder.feed(byte) {
//!         messages.push(message);
//!     }
//! }
//!
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].to_string(), "0,1,0,0,0,12.3");
//! ```
//!
//! # Resynchronisation
//!
//! A start delimiter always restarts framing, even mid-frame: after a glitch
//! that swallowed an end delimiter the next broadcast is still recovered
//! intact. Bodies that grow past [`MAX_FRAME_BODY`] are dropped the same way.

use bytes::BytesMut;
use roofctl_core::constants::{END_DELIMITER, MAX_FRAME_BODY, START_DELIMITER};

use crate::message::StatusMessage;

/// State machine states for decoding status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Scanning for `$`. Every other byte is discarded.
    AwaitingStart,

    /// Collecting body bytes until `#`.
    Accumulating,
}

/// Incremental decoder for `$`/`#` framed status messages.
///
/// # State Machine
///
/// ```text
/// ┌──────────────┐     '$'      ┌──────────────┐
/// │AwaitingStart │─────────────>│ Accumulating │──┐ other byte
/// └──────────────┘              └──────────────┘<─┘ (append)
///    ^   │ other byte              │   │   ^
///    │   └──(discard)              │   └───┘ '$' (drop partial, restart)
///    │                             │
///    └─────────────────────────────┘
///      '#' (emit body) or body > MAX_FRAME_BODY (drop)
/// ```
///
/// The decoder is pure: it performs no I/O and holds no locks, so it can be
/// owned by whichever task reads the transport.
///
/// # Example
///
/// ```
/// use roofctl_protocol::{DecoderState, FrameDecoder};
///
/// let mut decoder = FrameDecoder::new();
///
/// // A start delimiter mid-frame discards the partial frame
/// let messages = decoder.feed_slice(b"$AAA$BBB#");
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].to_string(), "BBB");
/// assert_eq!(decoder.state(), DecoderState::AwaitingStart);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    /// Body bytes collected since the last start delimiter.
    buffer: BytesMut,

    state: DecoderState,

    /// Partial frames dropped because a new start delimiter arrived.
    restarts: u64,

    /// Partial frames dropped because they outgrew [`MAX_FRAME_BODY`].
    overflows: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_FRAME_BODY),
            state: DecoderState::AwaitingStart,
            restarts: 0,
            overflows: 0,
        }
    }

    /// Feed one inbound byte.
    ///
    /// Returns the completed body when this byte is the end delimiter of an
    /// in-progress frame, otherwise `None`. Bytes must be fed in arrival order.
    pub fn feed(&mut self, byte: u8) -> Option<StatusMessage> {
        match (self.state, byte) {
            (DecoderState::AwaitingStart, START_DELIMITER) => {
                self.begin_frame();
                None
            }
            (DecoderState::AwaitingStart, _) => None,
            (DecoderState::Accumulating, START_DELIMITER) => {
                self.restarts += 1;
                self.begin_frame();
                None
            }
            (DecoderState::Accumulating, END_DELIMITER) => Some(self.finish_frame()),
            (DecoderState::Accumulating, _) => {
                if self.buffer.len() >= MAX_FRAME_BODY {
                    self.overflows += 1;
                    self.reset();
                } else {
                    self.buffer.extend_from_slice(&[byte]);
                }
                None
            }
        }
    }

    /// Feed a whole chunk and return every message it completed, in order.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<StatusMessage> {
        bytes.iter().filter_map(|&byte| self.feed(byte)).collect()
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of body bytes collected for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Drop any partial frame and wait for the next start delimiter.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::AwaitingStart;
    }

    fn begin_frame(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Accumulating;
    }

    fn finish_frame(&mut self) -> StatusMessage {
        let body = self.buffer.split().freeze();
        self.state = DecoderState::AwaitingStart;
        StatusMessage::new(body)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
