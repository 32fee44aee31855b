//! Integration tests running the simulated firmware through the frame
//! decoder, the way the controller consumes it.

use roofctl_core::ShutterState;
use roofctl_hardware::{AnyTransport, SerialSettings, SimulatedRoof, SimulatorConfig, Transport};
use roofctl_protocol::{FrameDecoder, StatusSnapshot};
use std::time::Duration;
use tokio::sync::mpsc;

fn config() -> SimulatorConfig {
    SimulatorConfig {
        broadcast_interval: Duration::from_millis(500),
        travel_time: Duration::from_secs(2),
    }
}

/// Receive chunks until the decoder produces a snapshot.
///
/// The simulator sends one whole frame per chunk, so at most one message
/// completes per chunk.
async fn next_snapshot(
    inbound: &mut mpsc::Receiver<bytes::Bytes>,
    decoder: &mut FrameDecoder,
) -> StatusSnapshot {
    loop {
        let chunk = inbound.recv().await.expect("simulator stopped");
        if let Some(message) = decoder.feed_slice(&chunk).pop() {
            return StatusSnapshot::parse(&message).expect("simulator frames are valid");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_open_close_cycle() {
    let (roof, handle) = SimulatedRoof::with_config(config());
    let mut transport = AnyTransport::Simulated(roof);
    let mut inbound = transport.open(&SerialSettings::default()).await.unwrap();
    let mut decoder = FrameDecoder::new();

    assert_eq!(
        next_snapshot(&mut inbound, &mut decoder).await.shutter_state(),
        ShutterState::Closed
    );

    transport.write(b"OPEN#").await.unwrap();
    let mut seen = Vec::new();
    while seen.last() != Some(&ShutterState::Open) {
        let state = next_snapshot(&mut inbound, &mut decoder).await.shutter_state();
        if seen.last() != Some(&state) {
            seen.push(state);
        }
    }
    assert_eq!(seen, vec![ShutterState::Opening, ShutterState::Open]);

    // Rain while open trips the interlock without any command
    handle.set_raining(true);
    loop {
        let snapshot = next_snapshot(&mut inbound, &mut decoder).await;
        if snapshot.shutter_state() == ShutterState::Closed {
            assert_eq!(snapshot.rain(), "1");
            break;
        }
    }

    transport.close().await.unwrap();
    assert!(!transport.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_abort_reports_error_state() {
    let (roof, _handle) = SimulatedRoof::with_config(config());
    let mut transport = AnyTransport::Simulated(roof);
    let mut inbound = transport.open(&SerialSettings::default()).await.unwrap();
    let mut decoder = FrameDecoder::new();
    next_snapshot(&mut inbound, &mut decoder).await;

    transport.write(b"OPEN#ABORT#").await.unwrap();

    let opening = next_snapshot(&mut inbound, &mut decoder).await;
    assert_eq!(opening.shutter_state(), ShutterState::Opening);
    let stopped = next_snapshot(&mut inbound, &mut decoder).await;
    assert_eq!(stopped.shutter_state(), ShutterState::Error);
    assert_eq!(stopped.roof_state(), "4");
}
