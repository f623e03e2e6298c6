//! Math utilities for the balance bot.
//!
//! Arcade mixing for the drivetrain and tilt calculations for the balance loop.

pub mod mixing;
pub mod tilt;
