use serde::{Deserialize, Serialize};
use std::fmt;

/// Shutter (roof) state as reported in the second status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutterState {
    Open,
    Closed,
    Opening,
    Closing,
    /// Any token the firmware does not define, including a missing one.
    Error,
}

impl ShutterState {
    /// Map a raw status token to a shutter state.
    ///
    /// # Examples
    ///
    /// ```
    /// use roofctl_core::ShutterState;
    ///
    /// assert_eq!(ShutterState::from_token("1"), ShutterState::Closed);
    /// assert_eq!(ShutterState::from_token("7"), ShutterState::Error);
    /// ```
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "0" => Self::Open,
            "1" => Self::Closed,
            "2" => Self::Opening,
            "3" => Self::Closing,
            _ => Self::Error,
        }
    }

    /// Wire token for this state, `None` for [`ShutterState::Error`].
    #[must_use]
    pub fn as_token(&self) -> Option<&'static str> {
        match self {
            Self::Open => Some("0"),
            Self::Closed => Some("1"),
            Self::Opening => Some("2"),
            Self::Closing => Some("3"),
            Self::Error => None,
        }
    }

    /// True while the roof is travelling.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }
}

impl fmt::Display for ShutterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Error => "error",
        };
        write!(f, "{state_str}")
    }
}

/// One of the six positional fields of a status message.
///
/// Each field doubles as a reserved query name: querying `RAIN` reads the
/// cached rain flag instead of writing to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    Rain,
    ShutterStatus,
    Park,
    RainSensor,
    ParkSensor,
    Spare,
}

impl StatusField {
    /// All fields in wire order.
    pub const ALL: [StatusField; 6] = [
        Self::Rain,
        Self::ShutterStatus,
        Self::Park,
        Self::RainSensor,
        Self::ParkSensor,
        Self::Spare,
    ];

    /// Position of the field inside the status body.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Rain => 0,
            Self::ShutterStatus => 1,
            Self::Park => 2,
            Self::RainSensor => 3,
            Self::ParkSensor => 4,
            Self::Spare => 5,
        }
    }

    /// Reserved query name that reads this field from the cache.
    #[must_use]
    pub fn query_name(&self) -> &'static str {
        match self {
            Self::Rain => "RAIN",
            Self::ShutterStatus => "SHUTTERSTATUS",
            Self::Park => "PARK",
            Self::RainSensor => "RAINSENSOR",
            Self::ParkSensor => "PARKSENSOR",
            Self::Spare => "SPARE",
        }
    }

    /// Look up a field by its reserved query name (exact, case sensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use roofctl_core::StatusField;
    ///
    /// assert_eq!(StatusField::from_query_name("PARK"), Some(StatusField::Park));
    /// assert_eq!(StatusField::from_query_name("park"), None);
    /// assert_eq!(StatusField::from_query_name("OPEN"), None);
    /// ```
    #[must_use]
    pub fn from_query_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.query_name() == name)
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", ShutterState::Open)]
    #[case("1", ShutterState::Closed)]
    #[case("2", ShutterState::Opening)]
    #[case("3", ShutterState::Closing)]
    #[case("4", ShutterState::Error)]
    #[case("", ShutterState::Error)]
    #[case("comms error", ShutterState::Error)]
    fn test_shutter_state_from_token(#[case] token: &str, #[case] expected: ShutterState) {
        assert_eq!(ShutterState::from_token(token), expected);
    }

    #[test]
    fn test_shutter_token_roundtrip() {
        for state in [
            ShutterState::Open,
            ShutterState::Closed,
            ShutterState::Opening,
            ShutterState::Closing,
        ] {
            let token = state.as_token().unwrap();
            assert_eq!(ShutterState::from_token(token), state);
        }
        assert_eq!(ShutterState::Error.as_token(), None);
    }

    #[test]
    fn test_moving_states() {
        assert!(ShutterState::Opening.is_moving());
        assert!(ShutterState::Closing.is_moving());
        assert!(!ShutterState::Open.is_moving());
        assert!(!ShutterState::Closed.is_moving());
        assert!(!ShutterState::Error.is_moving());
    }

    #[test]
    fn test_field_indices_follow_wire_order() {
        for (position, field) in StatusField::ALL.iter().enumerate() {
            assert_eq!(field.index(), position);
        }
    }

    #[test]
    fn test_query_name_lookup() {
        for field in StatusField::ALL {
            assert_eq!(StatusField::from_query_name(field.query_name()), Some(field));
        }
        assert_eq!(StatusField::from_query_name("CLOSE"), None);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(ShutterState::Opening.to_string(), "opening");
        assert_eq!(StatusField::ShutterStatus.to_string(), "SHUTTERSTATUS");
    }
}
