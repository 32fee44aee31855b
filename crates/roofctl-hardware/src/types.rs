//! Common types shared across transport implementations.

use roofctl_core::constants::{DATA_BITS, DEFAULT_BAUD_RATE, DEFAULT_PORT, SERIAL_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow_control: FlowControl) -> Self {
        match flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Line settings used when opening a transport.
///
/// Defaults match the roof firmware: 19200 baud, 8 data bits, no parity,
/// one stop bit, no flow control.
///
/// # Examples
///
/// ```
/// use roofctl_hardware::types::SerialSettings;
///
/// let settings = SerialSettings::new("/dev/ttyACM0");
/// assert_eq!(settings.baud_rate, 19_200);
/// assert_eq!(settings.to_string(), "/dev/ttyACM0 @ 19200 8N1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3").
    pub port: String,

    pub baud_rate: u32,

    pub data_bits: u8,

    pub parity: Parity,

    pub stop_bits: StopBits,

    pub flow_control: FlowControl,

    /// How long a blocking read waits before checking for shutdown.
    pub read_timeout_ms: u64,
}

impl SerialSettings {
    /// Settings for the given port with every line parameter at its default.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Map the data bit count onto what the serial driver accepts.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for anything outside 5 to 8.
    pub fn serial_data_bits(&self) -> Result<serialport::DataBits> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(TransportError::configuration(format!(
                "Data bits must be 5-8, got {other}"
            ))),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DATA_BITS,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout_ms: SERIAL_READ_TIMEOUT_MS,
        }
    }
}

impl std::fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop_bits = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        write!(
            f,
            "{} @ {} {}{}{}",
            self.port, self.baud_rate, self.data_bits, parity, stop_bits
        )
    }
}

/// Serial port discovered on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name as passed to `SerialSettings::new`.
    pub name: String,

    /// Human readable port type (e.g., "USB 0403:6001 FT232R").
    pub kind: String,
}

impl PortInfo {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}
