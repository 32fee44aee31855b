//! `roofctl`: drive a roll-off roof from the command line.
//!
//! ```text
//! roofctl --port /dev/ttyUSB0 status
//! roofctl --simulate open
//! roofctl --config roof.json watch --count 10
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roofctl_controller::{DriverConfig, RoofDriver};
use roofctl_core::StatusField;
use roofctl_hardware::{AnyTransport, SimulatedRoof};
use roofctl_protocol::StatusSnapshot;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Roll-off roof controller", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, overriding the configuration
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Talk to the built-in simulated roof instead of a serial port
    #[arg(long, global = true)]
    simulate: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Wait for a status broadcast and print it
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open the roof and wait for the controller to report
    Open,
    /// Close the roof and wait for the controller to report
    Close,
    /// Stop roof and mount motion
    Abort,
    /// Send a command without waiting for an answer
    Send { command: String },
    /// Query a status field (RAIN, SHUTTERSTATUS, PARK, ...)
    Query { command: String },
    /// Print every status broadcast as it arrives
    Watch {
        /// Stop after this many broadcasts
        #[arg(long)]
        count: Option<u64>,
    },
    /// List the device actions the roof advertises
    Actions,
    /// List serial ports on this host
    Ports,
    /// Print driver identification
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.trace);

    match cli.command {
        Commands::Actions => {
            for action in roofctl_protocol::SUPPORTED_ACTIONS {
                println!("{action}");
            }
            return Ok(());
        }
        Commands::Ports => {
            for port in roofctl_hardware::list_ports().context("listing serial ports")? {
                println!("{}\t{}", port.name, port.kind);
            }
            return Ok(());
        }
        Commands::Info => {
            let info = roofctl_controller::DriverInfo::default();
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(());
        }
        _ => {}
    }

    let transport = if cli.simulate {
        let (roof, _handle) = SimulatedRoof::new();
        AnyTransport::Simulated(roof)
    } else {
        AnyTransport::serial(config.port.clone())
    };

    let driver = RoofDriver::new(transport, config)?;
    driver
        .connect()
        .await
        .with_context(|| format!("connecting to {}", driver.config().port))?;

    let result = run(&driver, cli.command).await;
    driver.disconnect().await?;
    if let Err(err) = &result {
        if err
            .downcast_ref::<roofctl_core::Error>()
            .is_some_and(roofctl_core::Error::is_recoverable)
        {
            warn!("Transient failure, retrying may succeed");
        }
    }
    result
}

async fn run(driver: &RoofDriver<AnyTransport>, command: Commands) -> Result<()> {
    match command {
        Commands::Status { json } => {
            let snapshot = driver.wait_for_status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Commands::Open => {
            let attempt = driver.open_shutter().await?;
            info!("Roof reported on attempt {}", attempt);
            println!("{}", driver.shutter_status().await?);
        }
        Commands::Close => {
            let attempt = driver.close_shutter().await?;
            info!("Roof reported on attempt {}", attempt);
            println!("{}", driver.shutter_status().await?);
        }
        Commands::Abort => driver.abort().await?,
        Commands::Send { command } => driver.send(&command).await?,
        Commands::Query { command } => {
            // Give the first broadcast a chance so status fields come from the cache
            if StatusField::from_query_name(&command).is_some() {
                match driver.wait_for_status().await {
                    Ok(_) => {}
                    Err(err @ roofctl_core::Error::OperationTimedOut { .. }) => {
                        warn!("{}, writing {} through to the roof", err, command);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            println!("{}", driver.query(&command).await?);
        }
        Commands::Watch { count } => watch(driver, count).await?,
        Commands::Actions | Commands::Ports | Commands::Info => {}
    }
    Ok(())
}

async fn watch(driver: &RoofDriver<AnyTransport>, count: Option<u64>) -> Result<()> {
    let mut updates = driver.subscribe();
    let mut seen = updates.borrow_and_update().generation;
    let mut printed = 0;

    while count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            changed = updates.changed() => changed?,
            _ = tokio::signal::ctrl_c() => break,
        }

        let state = updates.borrow_and_update().clone();
        if !state.link_up {
            anyhow::bail!("link to roof lost");
        }
        if state.generation == seen {
            continue;
        }
        seen = state.generation;

        if let Some(snapshot) = state.snapshot {
            print_snapshot(&snapshot);
            printed += 1;
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &StatusSnapshot) {
    println!(
        "{}  shutter={} rain={} park={} rain_override={} park_override={} spare={}",
        snapshot.received_at.format("%H:%M:%S"),
        snapshot.shutter_state(),
        snapshot.rain(),
        snapshot.park_state(),
        snapshot.rain_sensor_override(),
        snapshot.park_sensor_override(),
        snapshot.spare()
    );
}

fn load_config(cli: &Cli) -> Result<DriverConfig> {
    let mut config = match &cli.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DriverConfig::default(),
    };
    if let Some(port) = &cli.port {
        config = config.with_port(port.clone());
    }
    if cli.trace {
        config = config.with_trace(true);
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(trace: bool) {
    let default_level = if trace { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("Logging initialised at {}", default_level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use roofctl_hardware::{MockTransport, MockTransportHandle};
    use std::time::Duration;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["roofctl", "query", "RAIN", "--simulate", "--port", "COM3"]);
        assert!(cli.simulate);
        assert_eq!(cli.port.as_deref(), Some("COM3"));
        assert!(matches!(cli.command, Commands::Query { ref command } if command == "RAIN"));
    }

    #[test]
    fn test_port_override() {
        let cli = Cli::parse_from(["roofctl", "--port", "/dev/ttyACM0", "--trace", "status"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert!(config.trace);
    }

    async fn mock_driver() -> (RoofDriver<AnyTransport>, MockTransportHandle) {
        let (transport, handle) = MockTransport::new();
        let driver = RoofDriver::new(AnyTransport::Mock(transport), DriverConfig::default()).unwrap();
        driver.connect().await.unwrap();
        (driver, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_waits_for_slow_broadcast() {
        let (driver, handle) = mock_driver().await;

        let roof = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            roof.inject_frame("1,1,1,0,0,12.3").await.unwrap();
        });

        run(&driver, Commands::Query { command: "RAIN".into() }).await.unwrap();
        run(&driver, Commands::Status { json: false }).await.unwrap();

        assert!(handle.written().is_empty());
        driver.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_writes_through_when_roof_is_silent() {
        let (driver, handle) = mock_driver().await;

        run(&driver, Commands::Query { command: "RAIN".into() }).await.unwrap();

        assert_eq!(handle.written(), vec![b"RAIN#".to_vec()]);
        driver.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_fails_when_roof_is_silent() {
        let (driver, _handle) = mock_driver().await;

        let err = run(&driver, Commands::Status { json: false }).await.unwrap_err();

        let err = err.downcast_ref::<roofctl_core::Error>().unwrap();
        assert!(err.is_recoverable());
        driver.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_against_simulator() {
        let (roof, _handle) = SimulatedRoof::new();
        let driver = RoofDriver::new(AnyTransport::Simulated(roof), DriverConfig::default()).unwrap();
        driver.connect().await.unwrap();

        run(&driver, Commands::Status { json: true }).await.unwrap();
        run(&driver, Commands::Open).await.unwrap();
        run(&driver, Commands::Watch { count: Some(2) }).await.unwrap();
        run(&driver, Commands::Abort).await.unwrap();

        driver.disconnect().await.unwrap();
    }
}
