//! Balance and arm motion-control core for a differential-drive robot on no-std platforms.
//!
//! The controllers never read a clock or block: the caller ticks them with the current
//! [`embassy_time::Instant`]. See `bb-app/sim-mcu` for a host-side scheduler.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod utils;
