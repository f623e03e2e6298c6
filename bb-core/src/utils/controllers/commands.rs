//! Commands from the binding layer.
//!
//! Button bindings, autonomous routines or a network bridge push
//! [`RobotCommand`]s into [`COMMAND_CHANNEL`]; the scheduler drains it once per
//! tick and routes each command to the drivetrain or the arm.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::{Deserialize, Serialize};

use super::arm::ArmLevel;

/// Channel used to receive [`RobotCommand`] messages.
pub static COMMAND_CHANNEL: embassy_sync::channel::Channel<
    CriticalSectionRawMutex,
    RobotCommand,
    16,
> = embassy_sync::channel::Channel::new();

/// Top-level command, serialized as JSON with tag `"ct"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum RobotCommand {
    /// Hand the drivetrain to the auto-balance controller.
    Balance,
    /// Manual arcade drive (`f` forward, `r` rotation). Ends auto-balance.
    Drive { f: f32, r: f32 },
    /// Arm request.
    A(ArmCommand),
}

/// Arm command variants, serialized with tag `"ac"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "ac", rename_all = "snake_case")]
pub enum ArmCommand {
    /// Move to a preset level.
    Level { l: ArmLevel },
    /// Move to angle `a` approaching at `s`, then hold `o`.
    MoveTo { a: f32, s: f32, o: f32 },
    JogUp,
    JogDown,
    Stop,
}

/// Decode one JSON command.
pub fn parse_command(data: &[u8]) -> Result<RobotCommand, serde_json::Error> {
    serde_json::from_slice::<RobotCommand>(data)
}
