//! Common test utilities for controller integration tests.
//!
//! Every test drives a real [`RoofDriver`] over a [`MockTransport`]; the
//! handle plays the roof firmware.

#![allow(dead_code)]

use roofctl_controller::{DriverConfig, RoofDriver};
use roofctl_hardware::{MockTransport, MockTransportHandle};
use std::sync::Arc;

/// Test data shared across integration tests.
pub mod test_data {
    /// Broadcast with the roof closed and the mount parked.
    pub const CLOSED: &str = "0,1,1,0,0,12.3";

    /// Broadcast with the roof opening.
    pub const OPENING: &str = "0,2,1,0,0,12.3";

    /// Broadcast with the roof open.
    pub const OPEN: &str = "0,0,1,0,0,12.3";

    /// Broadcast with rain reported.
    pub const RAINING: &str = "1,1,1,0,0,08.1";
}

/// Create a driver with the default configuration, not yet connected.
pub fn create_driver() -> (Arc<RoofDriver<MockTransport>>, MockTransportHandle) {
    let (transport, handle) = MockTransport::new();
    let driver = RoofDriver::new(transport, DriverConfig::default())
        .expect("default config is valid");
    (Arc::new(driver), handle)
}

/// Create and connect a driver.
pub async fn connected_driver() -> (Arc<RoofDriver<MockTransport>>, MockTransportHandle) {
    let (driver, handle) = create_driver();
    driver.connect().await.expect("mock transport opens");
    (driver, handle)
}

/// Inject a broadcast and wait until the cache has installed it.
pub async fn broadcast(
    driver: &RoofDriver<MockTransport>,
    handle: &MockTransportHandle,
    body: &str,
) {
    let generation = driver.cache().generation();
    let mut updates = driver.subscribe();
    handle.inject_frame(body).await.expect("link is open");
    updates
        .wait_for(|state| state.generation > generation)
        .await
        .expect("cache is alive");
}
