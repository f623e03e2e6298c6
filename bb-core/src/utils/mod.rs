//! Utility re-exports for the balance bot.
//!
//! - `controllers`: drive mixer, balance and arm controllers, hardware adapters
//! - `math`: arcade mixing and tilt calculations
//! - `telemetry`: key/value sink the controllers publish into once per tick

pub mod controllers;
pub mod math;
pub mod telemetry;

pub use controllers::{
    ArmController, BalanceController, DifferentialDrive, RobotCommand, COMMAND_CHANNEL,
};
pub use embassy_time::{Duration, Instant};
pub use telemetry::TelemetrySink;
