//! Parsed status broadcast.
//!
//! A status body carries six comma separated tokens in a fixed order:
//!
//! ```text
//! 0,1,0,0,0,12.3
//! │ │ │ │ │ └── spare (wind speed on current firmware)
//! │ │ │ │ └──── park sensor override
//! │ │ │ └────── rain sensor override
//! │ │ └──────── park flag
//! │ └────────── shutter state
//! └──────────── rain flag
//! ```
//!
//! Tokens are kept as raw strings. The firmware sends small integers or short
//! numeric text, and the host never needs more than string comparison.

use chrono::{DateTime, Utc};
use roofctl_core::constants::{FIELD_SEPARATOR, STATUS_BODY_LENGTH, STATUS_FIELD_COUNT};
use roofctl_core::{FrameError, ShutterState, StatusField};
use serde::{Deserialize, Serialize};

use crate::message::StatusMessage;

/// Snapshot of the six status fields from one valid broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    fields: [String; STATUS_FIELD_COUNT],

    /// When the host accepted the broadcast.
    pub received_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Validate and split a candidate message.
    ///
    /// Only the body length is validated. A body of the right length with the
    /// wrong number of separators is still accepted: missing trailing fields
    /// read as empty strings and tokens past the sixth are ignored.
    ///
    /// # Errors
    ///
    /// - [`FrameError::BadLength`] when the body is not exactly 14 bytes
    /// - [`FrameError::NonAscii`] when the body carries non-ASCII bytes
    ///
    /// # Example
    ///
    /// ```
    /// use roofctl_core::{ShutterState, StatusField};
    /// use roofctl_protocol::{StatusMessage, StatusSnapshot};
    ///
    /// let snapshot = StatusSnapshot::parse(&StatusMessage::from("0,1,0,0,0,12.3")).unwrap();
    /// assert_eq!(snapshot.field(StatusField::ShutterStatus), "1");
    /// assert_eq!(snapshot.shutter_state(), ShutterState::Closed);
    /// assert_eq!(snapshot.spare(), "12.3");
    /// ```
    pub fn parse(message: &StatusMessage) -> Result<Self, FrameError> {
        if !message.has_expected_length() {
            return Err(FrameError::BadLength {
                expected: STATUS_BODY_LENGTH,
                actual: message.len(),
            });
        }

        let body = message.as_ascii().ok_or(FrameError::NonAscii)?;

        let mut fields: [String; STATUS_FIELD_COUNT] = Default::default();
        for (slot, token) in fields.iter_mut().zip(body.split(FIELD_SEPARATOR)) {
            *slot = token.to_string();
        }

        Ok(Self {
            fields,
            received_at: Utc::now(),
        })
    }

    pub fn field(&self, field: StatusField) -> &str {
        &self.fields[field.index()]
    }

    pub fn fields(&self) -> &[String; STATUS_FIELD_COUNT] {
        &self.fields
    }

    pub fn rain(&self) -> &str {
        self.field(StatusField::Rain)
    }

    pub fn roof_state(&self) -> &str {
        self.field(StatusField::ShutterStatus)
    }

    pub fn park_state(&self) -> &str {
        self.field(StatusField::Park)
    }

    pub fn rain_sensor_override(&self) -> &str {
        self.field(StatusField::RainSensor)
    }

    pub fn park_sensor_override(&self) -> &str {
        self.field(StatusField::ParkSensor)
    }

    pub fn spare(&self) -> &str {
        self.field(StatusField::Spare)
    }

    pub fn shutter_state(&self) -> ShutterState {
        ShutterState::from_token(self.roof_state())
    }

    /// Rejoin the fields with the separator.
    pub fn to_body(&self) -> String {
        self.fields.join(&FIELD_SEPARATOR.to_string())
    }
}
