use bytes::Bytes;
use roofctl_core::constants::{END_DELIMITER, START_DELIMITER, STATUS_BODY_LENGTH};
use std::fmt;

/// Candidate status message body extracted by the [`FrameDecoder`].
///
/// Holds the raw bytes found between a start and an end delimiter, without
/// the delimiters themselves. Nothing about the content is validated here;
/// the status cache decides whether the body is acceptable.
///
/// # Example
///
/// ```
/// use roofctl_protocol::StatusMessage;
///
/// let message = StatusMessage::from("0,1,0,0,0,12.3");
/// assert_eq!(message.len(), 14);
/// assert!(message.has_expected_length());
/// assert_eq!(message.framed(), b"$0,1,0,0,0,12.3#");
/// ```
///
/// [`FrameDecoder`]: crate::FrameDecoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    body: Bytes,
}

impl StatusMessage {
    pub fn new(body: Bytes) -> Self {
        Self { body }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Whether the body has the fixed status length of the current firmware.
    pub fn has_expected_length(&self) -> bool {
        self.len() == STATUS_BODY_LENGTH
    }

    /// Body as text, `None` when it carries non-ASCII bytes.
    pub fn as_ascii(&self) -> Option<&str> {
        if self.body.is_ascii() {
            std::str::from_utf8(&self.body).ok()
        } else {
            None
        }
    }

    /// Body wrapped in start and end delimiters, as it appears on the wire.
    pub fn framed(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.len() + 2);
        wire.push(START_DELIMITER);
        wire.extend_from_slice(&self.body);
        wire.push(END_DELIMITER);
        wire
    }
}

impl From<&str> for StatusMessage {
    fn from(body: &str) -> Self {
        Self::from_bytes(body.as_bytes())
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ascii() {
            Some(text) => f.write_str(text),
            None => {
                // Include hex representation for debugging line noise
                let hex: Vec<String> = self.body.iter().map(|b| format!("{b:02X}")).collect();
                write!(f, "<non-ASCII: {}>", hex.join(" "))
            }
        }
    }
}
