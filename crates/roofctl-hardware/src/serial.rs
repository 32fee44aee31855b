//! Serial port transport.
//!
//! Reads are blocking in the `serialport` crate, so inbound bytes are pumped
//! by a dedicated reader thread into the tokio channel returned by `open`.
//! The read timeout bounds how long the thread takes to notice a shutdown.
//! Writes are blocking too and run on tokio's blocking pool.
//!
//! ```text
//! ┌───────────────┐  read() w/ timeout  ┌──────────────┐  blocking_send  ┌──────────────┐
//! │ serial device │ ──────────────────> │ reader thread│ ──────────────> │ mpsc channel │
//! └───────────────┘                     └──────────────┘                 └──────────────┘
//! ```

use bytes::Bytes;
use roofctl_core::constants::INBOUND_CHANNEL_CAPACITY;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use crate::types::{PortInfo, SerialSettings};

/// Size of the buffer used by the reader thread.
const READ_CHUNK_SIZE: usize = 256;

/// Transport over a local serial port.
pub struct SerialTransport {
    port_name: String,
    writer: Option<Box<dyn SerialPort>>,

    /// Cleared by `close` to stop the reader, and by the reader when the
    /// device goes away.
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            writer: None,
            alive: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn open_port(&self, settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
        let port = serialport::new(&self.port_name, settings.baud_rate)
            .data_bits(settings.serial_data_bits()?)
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .flow_control(settings.flow_control.into())
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| TransportError::open_failed(self.port_name.clone(), e.to_string()))?;

        // Whatever the device sent before we connected is stale
        port.clear(ClearBuffer::Input)?;
        Ok(port)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Transport for SerialTransport {
    async fn open(&mut self, settings: &SerialSettings) -> Result<mpsc::Receiver<Bytes>> {
        self.port_name = settings.port.clone();
        info!("Opening serial port {}", settings);
        let port = self.open_port(settings)?;
        let reader = port.try_clone()?;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));
        let port_name = self.port_name.clone();
        let thread_alive = Arc::clone(&alive);

        let handle = std::thread::Builder::new()
            .name(format!("roofctl-serial-{}", port_name))
            .spawn(move || read_loop(reader, inbound_tx, thread_alive, port_name))?;

        self.writer = Some(port);
        self.alive = alive;
        self.reader = Some(handle);
        Ok(inbound_rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(TransportError::not_open(self.port_name.clone()));
        }
        // A write cancelled mid-flight leaves the transport closed
        let mut port = self
            .writer
            .take()
            .ok_or_else(|| TransportError::not_open(self.port_name.clone()))?;

        trace!("Writing {} bytes to {}", bytes.len(), self.port_name);
        let frame = bytes.to_vec();
        let (port, written) = tokio::task::spawn_blocking(move || {
            let written = write_frame(&mut *port, &frame);
            (port, written)
        })
        .await
        .map_err(|e| TransportError::communication(format!("{}: {}", self.port_name, e)))?;

        self.writer = Some(port);
        written.map_err(|e| TransportError::communication(format!("{}: {}", self.port_name, e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.alive.store(false, Ordering::Release);
        self.writer = None;

        if let Some(reader) = self.reader.take() {
            // The reader notices within one read timeout
            let joined = tokio::task::spawn_blocking(move || reader.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("Serial reader for {} did not shut down cleanly", self.port_name);
            }
            info!("Closed serial port {}", self.port_name);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some() && self.alive.load(Ordering::Acquire)
    }

    fn describe(&self) -> String {
        self.port_name.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Write a whole frame and push it out of the OS buffer.
fn write_frame<W: Write + ?Sized>(port: &mut W, bytes: &[u8]) -> io::Result<()> {
    port.write_all(bytes)?;
    port.flush()
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    inbound: mpsc::Sender<Bytes>,
    alive: Arc<AtomicBool>,
    port_name: String,
) {
    let mut buffer = [0u8; READ_CHUNK_SIZE];

    while alive.load(Ordering::Acquire) {
        match port.read(&mut buffer) {
            Ok(0) => continue,
            Ok(n) => {
                trace!("Read {} bytes from {}", n, port_name);
                if inbound.blocking_send(Bytes::copy_from_slice(&buffer[..n])).is_err() {
                    debug!("Inbound channel for {} closed, stopping reader", port_name);
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => {
                warn!("Serial read on {} failed: {}", port_name, e);
                break;
            }
        }
    }

    // Dropping the sender ends the inbound channel
    alive.store(false, Ordering::Release);
}

/// List the serial ports present on this host.
///
/// # Errors
///
/// Returns [`TransportError::Serial`] if the platform enumeration fails.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let kind = match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                ),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "Unknown".to_string(),
            };
            PortInfo::new(port.port_name, kind.trim_end())
        })
        .collect())
}
