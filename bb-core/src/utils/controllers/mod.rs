//! Module Exports
//!
//! This file exports the control modules of the balance bot.
//!
//! - `driver`: actuator and sensor traits the controllers are written against
//! - `drive`: four-motor arcade drivetrain with encoder aggregation
//! - `balance`: hysteresis auto-balance with pulsed correction
//! - `arm`: safety-clamped arm position controller
//! - `sensors`: orientation calibration and potentiometer mapping
//! - `i2c`: PCA9685 motors and ICM-42670 tilt sensor
//! - `commands`: command types and the command channel

pub mod arm;
pub mod balance;
pub mod commands;
pub mod drive;
pub mod driver;
/// Module for managing I2C-connected devices.
pub mod i2c;
pub mod sensors;

pub use arm::{
    ArmConfig, ArmController, ArmLevel, ArmPresets, ArmStatus, ArmTarget, ClampedActuator,
    SafetyClamp,
};
pub use balance::{BalanceConfig, BalanceController, BalanceMode, ConfigError};
pub use commands::{parse_command, ArmCommand, RobotCommand, COMMAND_CHANNEL};
pub use drive::{DifferentialDrive, DriveConfig, DriveError, Drivetrain, Wheel};
pub use driver::{Actuator, AnalogInput, AngleSensor, Encoder, IdleMode, OrientationSensor};
pub use sensors::{calibrate, Calibration, Potentiometer};
