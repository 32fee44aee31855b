//! Host-side controller for a roll-off roof.
//!
//! The roof controller broadcasts `$`/`#` framed status every few seconds and
//! accepts single-word commands. This crate keeps a freshness-tagged cache of
//! that status, routes logical commands, and drives open and close as
//! command-then-wait operations.
//!
//! # Components
//!
//! ```text
//!                 ┌───────────────────────── RoofDriver ─────────────────────────┐
//!  caller ──────> │ CommandDispatcher ──┐        ShutterController ──┐           │
//!                 │        │            │               │            │ BoundedWait
//!                 │        v            │               v            v           │
//!                 │   Transport <───────┘          StatusCache <── decoding task │
//!                 │        └──────── ConnectionManager ───────────────┘          │
//!                 └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`StatusCache`]: last valid snapshot plus the freshness flag
//! - [`CommandDispatcher`]: cache reads and write-through commands
//! - [`ShutterController`]: open, close and abort with the bounded wait
//! - [`ConnectionManager`]: opens the link and runs the decoding task
//! - [`RoofDriver`]: all of the above behind one facade
//!
//! # Concurrency
//!
//! Any number of tasks may share a driver. The decoding task is the single
//! writer of snapshots; the transport sits behind a `tokio::sync::Mutex` so
//! writes never interleave; a bounded wait suspends only its own caller.

pub mod cache;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod driver;
pub mod shutter;

pub use cache::{CacheState, StatusCache};
pub use config::DriverConfig;
pub use connection::{ConnectionManager, DecoderStats};
pub use dispatcher::CommandDispatcher;
pub use driver::{DriverInfo, RoofDriver};
pub use shutter::{BoundedWait, ShutterController, WaitOutcome};
