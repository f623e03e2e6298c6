//! Platform auto-balance.
//!
//! The controller watches the calibrated chassis tilt and switches between
//! [`BalanceMode::Level`] and [`BalanceMode::Correcting`] with a hysteresis
//! band. While correcting it nudges the chassis uphill in pulses: drive for
//! `push_ms`, stop for `settle_ms`, re-evaluate. Continuous correction carries
//! the platform past center and rocks it; the pause lets it settle.
//!
//! The pulse is a state machine advanced by [`BalanceController::tick`], so a
//! tick never blocks. Dropping the controller hands the drivetrain back with a
//! zero command.

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use super::{
    drive::Drivetrain,
    driver::{IdleMode, OrientationSensor},
    sensors::Calibration,
};
use crate::utils::{math::tilt::correction_speed, telemetry::TelemetrySink};

/// Invalid controller configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// The on-balance threshold must be below the off-balance threshold.
    Hysteresis { on: f32, off: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMode {
    #[default]
    Level,
    Correcting,
}

/// Balance tuning. Angles are in degrees, durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Tilt at or beyond which correction starts.
    pub off_balance_deg: f32,
    /// Tilt at or under which correction stops.
    pub on_balance_deg: f32,
    pub correction_multiplier: f32,
    pub push_ms: u64,
    pub settle_ms: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            off_balance_deg: 10.0,
            on_balance_deg: 5.0,
            correction_multiplier: 0.6,
            push_ms: 1000,
            settle_ms: 1000,
        }
    }
}

impl BalanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let on = self.on_balance_deg.abs();
        let off = self.off_balance_deg.abs();
        if on < off {
            Ok(())
        } else {
            Err(ConfigError::Hysteresis { on, off })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pulse {
    Idle,
    Push { speed: f32, until: Instant },
    Settle { until: Instant },
}

/// Hysteresis auto-balance driving a borrowed drivetrain.
///
/// The mutable borrow of the drivetrain is the ownership handoff: nothing
/// else can command the drive while this controller exists.
pub struct BalanceController<'a, D, O>
where
    D: Drivetrain,
    O: OrientationSensor,
{
    drive: &'a mut D,
    sensor: &'a mut O,
    calibration: Calibration,
    config: BalanceConfig,
    mode: BalanceMode,
    pulse: Pulse,
    engaged: bool,
    tilt: f32,
    speed: f32,
}

impl<'a, D, O> BalanceController<'a, D, O>
where
    D: Drivetrain,
    O: OrientationSensor,
{
    pub fn new(
        drive: &'a mut D,
        sensor: &'a mut O,
        calibration: Calibration,
        config: BalanceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(BalanceController {
            drive,
            sensor,
            calibration,
            config,
            mode: BalanceMode::Level,
            pulse: Pulse::Idle,
            engaged: false,
            tilt: 0.0,
            speed: 0.0,
        })
    }

    pub fn mode(&self) -> BalanceMode {
        self.mode
    }

    /// Calibrated tilt seen on the last tick.
    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    /// Forward speed commanded on the last tick.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn drivetrain(&self) -> &D {
        &*self.drive
    }

    /// Mutable access for telemetry and encoder reads. Drive commands issued
    /// through it are overwritten on the next tick.
    pub fn drivetrain_mut(&mut self) -> &mut D {
        &mut *self.drive
    }

    /// Run one control step at time `now`.
    pub fn tick(
        &mut self,
        now: Instant,
    ) -> BalanceMode {
        if !self.engaged {
            self.engaged = true;
            tracing::info!("auto-balance engaged");
            if let Err(e) = self.drive.set_idle_mode(IdleMode::Brake) {
                tracing::error!("failed to set brake mode: {:?}", e);
            }
        }

        self.tilt = self.read_tilt();
        self.update_mode();

        let speed = match self.mode {
            BalanceMode::Level => {
                if self.pulse != Pulse::Idle {
                    tracing::debug!("level reached mid-pulse");
                    self.pulse = Pulse::Idle;
                }
                0.0
            }
            BalanceMode::Correcting => self.advance_pulse(now),
        };
        self.command(speed);
        self.mode
    }

    /// Hand the drivetrain back. Equivalent to dropping the controller.
    pub fn end(self) {}

    fn read_tilt(&mut self) -> f32 {
        match self.sensor.read_orientation() {
            Ok(raw) => self.calibration.tilt(raw),
            Err(e) => {
                tracing::warn!("orientation read failed, assuming level: {:?}", e);
                0.0
            }
        }
    }

    fn update_mode(&mut self) {
        let magnitude = self.tilt.abs();
        let next = match self.mode {
            BalanceMode::Level if magnitude >= self.config.off_balance_deg.abs() => {
                BalanceMode::Correcting
            }
            BalanceMode::Correcting if magnitude <= self.config.on_balance_deg.abs() => {
                BalanceMode::Level
            }
            mode => mode,
        };
        if next != self.mode {
            tracing::info!(tilt = self.tilt, ?next, "balance mode changed");
            self.mode = next;
        }
    }

    fn advance_pulse(
        &mut self,
        now: Instant,
    ) -> f32 {
        match self.pulse {
            Pulse::Push { speed, until } if now < until => speed,
            Pulse::Push { .. } => {
                self.pulse = Pulse::Settle {
                    until: now + Duration::from_millis(self.config.settle_ms),
                };
                0.0
            }
            Pulse::Settle { until } if now < until => 0.0,
            Pulse::Idle | Pulse::Settle { .. } => {
                let speed = correction_speed(self.tilt, self.config.correction_multiplier);
                tracing::debug!(tilt = self.tilt, speed, "correction pulse");
                self.pulse = Pulse::Push {
                    speed,
                    until: now + Duration::from_millis(self.config.push_ms),
                };
                speed
            }
        }
    }

    fn command(
        &mut self,
        speed: f32,
    ) {
        self.speed = speed;
        if let Err(e) = self.drive.drive(speed, 0.0) {
            tracing::error!("balance drive command failed: {:?}", e);
        }
    }

    pub fn publish<T: TelemetrySink>(
        &self,
        sink: &mut T,
    ) {
        sink.put("AutoBalanceSpeed", self.speed);
        sink.put("BalanceTilt", self.tilt);
        sink.put(
            "BalanceCorrecting",
            if self.mode == BalanceMode::Correcting { 1.0 } else { 0.0 },
        );
    }
}

impl<D, O> Drop for BalanceController<'_, D, O>
where
    D: Drivetrain,
    O: OrientationSensor,
{
    fn drop(&mut self) {
        tracing::info!("auto-balance released");
        self.command(0.0);
    }
}
