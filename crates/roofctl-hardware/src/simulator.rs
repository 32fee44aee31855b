//! In-process roof controller simulator.
//!
//! [`SimulatedRoof`] is a [`Transport`] whose far end is a software model of
//! the roof firmware: it broadcasts status frames on a fixed cadence, accepts
//! the same command tokens and enforces the same rain and park interlocks.
//! It is what `roofctl --simulate` talks to.
//!
//! # Behaviour
//!
//! ```text
//!            OPEN (dry, mount parked)         travel_time
//!   Closed ──────────────────────────> Opening ───────────> Open
//!     ^                                                      │
//!     │        travel_time                CLOSE, or rain     │
//!     └──────────────────── Closing <────────────────────────┘
//!
//!   ABORT while moving ──> Error (stopped part way)
//! ```
//!
//! Every accepted command is followed by an immediate broadcast, so a
//! controller waiting for fresh status sees the change without waiting for
//! the next periodic frame.

use bytes::Bytes;
use roofctl_core::ShutterState;
use roofctl_core::constants::{END_DELIMITER, INBOUND_CHANNEL_CAPACITY};
use roofctl_protocol::{Command, StatusMessage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use crate::types::SerialSettings;

/// Token broadcast for a roof that stopped part way.
const STOPPED_TOKEN: &str = "4";

/// Fastest wind speed the spare field can carry in four characters.
const MAX_WIND_SPEED: f32 = 99.9;

/// Timing of the simulated firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Period of the unsolicited status broadcast.
    pub broadcast_interval: Duration,

    /// Time for the roof to travel fully open or fully closed.
    pub travel_time: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_secs(2),
            travel_time: Duration::from_secs(10),
        }
    }
}

/// State of the simulated roof and its sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct RoofModel {
    shutter: ShutterState,
    raining: bool,
    parked: bool,
    rain_sense: bool,
    park_sense: bool,
    wind_speed: f32,

    /// When the current motion completes.
    arrival: Option<Instant>,
}

impl Default for RoofModel {
    fn default() -> Self {
        Self {
            shutter: ShutterState::Closed,
            raining: false,
            parked: true,
            rain_sense: true,
            park_sense: true,
            wind_speed: 0.0,
            arrival: None,
        }
    }
}

impl RoofModel {
    pub fn shutter(&self) -> ShutterState {
        self.shutter
    }

    /// Status body exactly as the firmware formats it.
    ///
    /// # Examples
    ///
    /// ```
    /// use roofctl_hardware::simulator::RoofModel;
    ///
    /// assert_eq!(RoofModel::default().status_body(), "0,1,1,0,0,00.0");
    /// ```
    pub fn status_body(&self) -> String {
        format!(
            "{},{},{},{},{},{:04.1}",
            flag(self.raining),
            self.shutter.as_token().unwrap_or(STOPPED_TOKEN),
            flag(self.parked),
            flag(!self.rain_sense),
            flag(!self.park_sense),
            self.wind_speed.clamp(0.0, MAX_WIND_SPEED)
        )
    }

    /// Apply a command received at `now`.
    ///
    /// Returns whether the firmware recognised the command; recognised
    /// commands trigger an immediate broadcast.
    pub fn apply(&mut self, command: &Command, travel_time: Duration, now: Instant) -> bool {
        match command {
            Command::Open => self.start_opening(false, travel_time, now),
            Command::ForceOpen => self.start_opening(true, travel_time, now),
            Command::Close => self.start_closing(false, travel_time, now),
            Command::ForceClose => self.start_closing(true, travel_time, now),
            Command::Abort => {
                if self.shutter.is_moving() {
                    info!("Simulated roof stopped while {}", self.shutter);
                    self.shutter = ShutterState::Error;
                    self.arrival = None;
                }
            }
            Command::Init => {
                self.rain_sense = true;
                self.park_sense = true;
            }
            Command::NoRainSense => self.rain_sense = false,
            Command::NoParkSense => self.park_sense = false,
            Command::RainSense => self.rain_sense = true,
            Command::ParkSense => self.park_sense = true,
            Command::ParkSensor | Command::RainSensor => {}
            Command::Other(token) => {
                trace!("Simulated roof ignoring {}", token);
                return false;
            }
        }
        true
    }

    /// Complete any motion due by `now` and run the rain interlock.
    pub fn advance(&mut self, travel_time: Duration, now: Instant) {
        if self.arrival.is_some_and(|arrival| arrival <= now) {
            self.shutter = match self.shutter {
                ShutterState::Opening => ShutterState::Open,
                ShutterState::Closing => ShutterState::Closed,
                other => other,
            };
            self.arrival = None;
        }

        let exposed = matches!(self.shutter, ShutterState::Open | ShutterState::Opening);
        if exposed && self.raining && self.rain_sense {
            info!("Simulated rain sensor tripped, closing roof");
            self.start_closing(false, travel_time, now);
        }
    }

    fn start_opening(&mut self, force: bool, travel_time: Duration, now: Instant) {
        if matches!(self.shutter, ShutterState::Open | ShutterState::Opening) {
            return;
        }
        if !force && self.rain_sense && self.raining {
            debug!("Simulated roof refusing to open: raining");
            return;
        }
        if !force && self.park_sense && !self.parked {
            debug!("Simulated roof refusing to open: mount not parked");
            return;
        }
        self.shutter = ShutterState::Opening;
        self.arrival = Some(now + travel_time);
    }

    fn start_closing(&mut self, force: bool, travel_time: Duration, now: Instant) {
        if matches!(self.shutter, ShutterState::Closed | ShutterState::Closing) {
            return;
        }
        if !force && self.park_sense && !self.parked {
            debug!("Simulated roof refusing to close: mount not parked");
            return;
        }
        self.shutter = ShutterState::Closing;
        self.arrival = Some(now + travel_time);
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Simulated roof controller reachable as a transport.
///
/// # Examples
///
/// ```
/// use roofctl_hardware::simulator::SimulatedRoof;
/// use roofctl_hardware::traits::Transport;
/// use roofctl_hardware::types::SerialSettings;
///
/// #[tokio::main]
/// async fn main() -> roofctl_hardware::Result<()> {
///     let (mut roof, _handle) = SimulatedRoof::new();
///     let mut inbound = roof.open(&SerialSettings::default()).await?;
///
///     // The first broadcast goes out as soon as the link opens
///     let frame = inbound.recv().await.unwrap();
///     assert_eq!(frame.as_ref(), b"$0,1,1,0,0,00.0#");
///
///     roof.close().await
/// }
/// ```
#[derive(Debug)]
pub struct SimulatedRoof {
    config: SimulatorConfig,
    model: Arc<Mutex<RoofModel>>,
    commands: Option<mpsc::Sender<Command>>,

    /// Bytes written since the last end delimiter.
    partial: Vec<u8>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedRoof {
    /// Create a simulator with default timing.
    ///
    /// Returns the transport and a handle for changing the weather and
    /// mount state from the outside.
    pub fn new() -> (Self, SimulatorHandle) {
        Self::with_config(SimulatorConfig::default())
    }

    pub fn with_config(config: SimulatorConfig) -> (Self, SimulatorHandle) {
        let model = Arc::new(Mutex::new(RoofModel::default()));
        let roof = Self {
            config,
            model: Arc::clone(&model),
            commands: None,
            partial: Vec::new(),
            task: None,
        };
        (roof, SimulatorHandle { model })
    }

    async fn stop(&mut self) {
        self.commands = None;
        self.partial.clear();
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Default for SimulatedRoof {
    fn default() -> Self {
        Self::new().0
    }
}

impl Transport for SimulatedRoof {
    async fn open(&mut self, _settings: &SerialSettings) -> Result<mpsc::Receiver<Bytes>> {
        self.stop().await;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        self.task = Some(tokio::spawn(run_firmware(
            Arc::clone(&self.model),
            self.config,
            command_rx,
            inbound_tx,
        )));
        self.commands = Some(command_tx);
        info!("Simulated roof online");
        Ok(inbound_rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let sender = self
            .commands
            .clone()
            .ok_or_else(|| TransportError::not_open(self.describe()))?;

        self.partial.extend_from_slice(bytes);
        while let Some(end) = self.partial.iter().position(|&b| b == END_DELIMITER) {
            let frame: Vec<u8> = self.partial.drain(..=end).collect();
            let token = String::from_utf8_lossy(&frame[..end]);
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            sender
                .send(Command::parse(token))
                .await
                .map_err(|_| TransportError::disconnected(self.describe()))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.task.is_some() {
            info!("Simulated roof offline");
        }
        self.stop().await;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.commands.is_some() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn describe(&self) -> String {
        "simulator".to_string()
    }
}

/// Handle for changing the simulated environment.
///
/// Changes show up in the next broadcast. It can be cloned and shared
/// across tasks.
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    model: Arc<Mutex<RoofModel>>,
}

impl SimulatorHandle {
    pub fn set_raining(&self, raining: bool) {
        lock(&self.model).raining = raining;
    }

    /// Set whether the telescope mount reports parked.
    pub fn set_parked(&self, parked: bool) {
        lock(&self.model).parked = parked;
    }

    pub fn set_wind_speed(&self, wind_speed: f32) {
        lock(&self.model).wind_speed = wind_speed;
    }

    pub fn shutter(&self) -> ShutterState {
        lock(&self.model).shutter
    }

    /// Copy of the full model.
    pub fn model(&self) -> RoofModel {
        lock(&self.model).clone()
    }
}

fn lock(model: &Mutex<RoofModel>) -> MutexGuard<'_, RoofModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_firmware(
    model: Arc<Mutex<RoofModel>>,
    config: SimulatorConfig,
    mut commands: mpsc::Receiver<Command>,
    inbound: mpsc::Sender<Bytes>,
) {
    let mut ticker = tokio::time::interval(config.broadcast_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let arrival = lock(&model).arrival;

        tokio::select! {
            _ = ticker.tick() => {}
            command = commands.recv() => {
                let Some(command) = command else { break };
                debug!("Simulated roof received {}", command);
                let recognised = lock(&model).apply(&command, config.travel_time, Instant::now());
                if !recognised {
                    continue;
                }
            }
            _ = tokio::time::sleep_until(arrival.unwrap_or_else(Instant::now)), if arrival.is_some() => {}
        }

        let body = {
            let mut model = lock(&model);
            model.advance(config.travel_time, Instant::now());
            model.status_body()
        };

        trace!("Simulated roof broadcasting {}", body);
        let frame = StatusMessage::from(body.as_str()).framed();
        if inbound.send(Bytes::from(frame)).await.is_err() {
            break;
        }
    }

    debug!("Simulated firmware task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofctl_protocol::StatusSnapshot;

    const TRAVEL: Duration = Duration::from_secs(3);

    fn snapshot(frame: &[u8]) -> StatusSnapshot {
        let body = &frame[1..frame.len() - 1];
        StatusSnapshot::parse(&StatusMessage::from_bytes(body)).unwrap()
    }

    fn fast_config() -> SimulatorConfig {
        SimulatorConfig {
            broadcast_interval: Duration::from_secs(1),
            travel_time: TRAVEL,
        }
    }

    #[test]
    fn test_status_body_length() {
        let mut model = RoofModel::default();
        assert_eq!(model.status_body().len(), 14);

        model.wind_speed = 250.0;
        model.shutter = ShutterState::Error;
        assert_eq!(model.status_body(), "0,4,1,0,0,99.9");
    }

    #[test]
    fn test_open_refused_when_raining() {
        let mut model = RoofModel {
            raining: true,
            ..RoofModel::default()
        };
        let now = Instant::now();

        assert!(model.apply(&Command::Open, TRAVEL, now));
        assert_eq!(model.shutter(), ShutterState::Closed);

        // Forcing ignores the interlock
        model.apply(&Command::ForceOpen, TRAVEL, now);
        assert_eq!(model.shutter(), ShutterState::Opening);
    }

    #[test]
    fn test_open_refused_when_not_parked_unless_sensing_disabled() {
        let mut model = RoofModel {
            parked: false,
            ..RoofModel::default()
        };
        let now = Instant::now();

        model.apply(&Command::Open, TRAVEL, now);
        assert_eq!(model.shutter(), ShutterState::Closed);

        model.apply(&Command::NoParkSense, TRAVEL, now);
        assert_eq!(model.status_body(), "0,1,0,0,1,00.0");
        model.apply(&Command::Open, TRAVEL, now);
        assert_eq!(model.shutter(), ShutterState::Opening);
    }

    #[test]
    fn test_motion_completes_after_travel_time() {
        let mut model = RoofModel::default();
        let start = Instant::now();

        model.apply(&Command::Open, TRAVEL, start);
        model.advance(TRAVEL, start + Duration::from_secs(1));
        assert_eq!(model.shutter(), ShutterState::Opening);

        model.advance(TRAVEL, start + TRAVEL);
        assert_eq!(model.shutter(), ShutterState::Open);
    }

    #[test]
    fn test_rain_closes_open_roof() {
        let mut model = RoofModel {
            shutter: ShutterState::Open,
            raining: true,
            ..RoofModel::default()
        };
        model.advance(TRAVEL, Instant::now());
        assert_eq!(model.shutter(), ShutterState::Closing);
    }

    #[test]
    fn test_abort_stops_motion() {
        let mut model = RoofModel::default();
        let now = Instant::now();
        model.apply(&Command::Open, TRAVEL, now);
        model.apply(&Command::Abort, TRAVEL, now);
        assert_eq!(model.shutter(), ShutterState::Error);

        model.advance(TRAVEL, now + TRAVEL);
        assert_eq!(model.shutter(), ShutterState::Error);
    }

    #[test]
    fn test_unknown_command_not_recognised() {
        let mut model = RoofModel::default();
        assert!(!model.apply(&Command::parse("RAIN"), TRAVEL, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_broadcasts_progress() {
        let (mut roof, handle) = SimulatedRoof::with_config(fast_config());
        let mut inbound = roof.open(&SerialSettings::default()).await.unwrap();

        let first = inbound.recv().await.unwrap();
        assert_eq!(snapshot(&first).shutter_state(), ShutterState::Closed);

        let started = Instant::now();
        roof.write(b"OPEN#").await.unwrap();
        let next = inbound.recv().await.unwrap();
        assert_eq!(snapshot(&next).shutter_state(), ShutterState::Opening);

        loop {
            let frame = inbound.recv().await.unwrap();
            if snapshot(&frame).shutter_state() == ShutterState::Open {
                break;
            }
        }
        assert!(started.elapsed() >= TRAVEL);
        assert_eq!(handle.shutter(), ShutterState::Open);

        roof.close().await.unwrap();
        assert!(!roof.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_split_across_writes() {
        let (mut roof, handle) = SimulatedRoof::with_config(fast_config());
        let mut inbound = roof.open(&SerialSettings::default()).await.unwrap();
        inbound.recv().await.unwrap();

        roof.write(b"NORAIN").await.unwrap();
        roof.write(b"SENSE#").await.unwrap();
        let frame = inbound.recv().await.unwrap();

        assert_eq!(snapshot(&frame).rain_sensor_override(), "1");
        assert_eq!(handle.model().status_body(), "0,1,1,1,0,00.0");
    }

    #[tokio::test]
    async fn test_write_when_closed_fails() {
        let (mut roof, _handle) = SimulatedRoof::new();
        let result = roof.write(b"OPEN#").await;
        assert!(matches!(result, Err(TransportError::NotOpen { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_ends_inbound_channel() {
        let (mut roof, _handle) = SimulatedRoof::with_config(fast_config());
        let mut inbound = roof.open(&SerialSettings::default()).await.unwrap();
        roof.close().await.unwrap();

        // Drain whatever was sent before the task stopped
        while inbound.recv().await.is_some() {}
        assert!(!roof.is_open());
    }
}
