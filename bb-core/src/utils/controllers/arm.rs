//! Potentiometer-positioned arm.
//!
//! Every output goes through [`ClampedActuator`], which owns the motor and
//! applies the [`SafetyClamp`] against the current angle. There is no other
//! path to the arm motor.
//!
//! A move is two-phase: approach at the requested speed (or return at a fixed
//! negative speed from above), then hold a small gravity offset once inside
//! the tolerance band. [`ArmController::tick`] advances the move one step per
//! call instead of looping until arrival.

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use super::driver::{Actuator, AngleSensor, IdleMode};
use crate::utils::telemetry::TelemetrySink;

/// Output limits enforced on the arm motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyClamp {
    /// Past this angle (deg) only `creep_output` is allowed.
    pub max_angle: f32,
    /// Small positive output that slows the fall back below `max_angle`.
    pub creep_output: f32,
    /// Most negative output permitted (bounds fast descent).
    pub descent_floor: f32,
}

impl Default for SafetyClamp {
    fn default() -> Self {
        Self {
            max_angle: 95.0,
            creep_output: 0.2,
            descent_floor: -0.5,
        }
    }
}

impl SafetyClamp {
    /// Output actually allowed for `requested` at `angle`.
    pub fn apply(
        &self,
        angle: f32,
        requested: f32,
    ) -> f32 {
        if angle > self.max_angle {
            self.creep_output
        } else if requested < self.descent_floor {
            self.descent_floor
        } else {
            requested
        }
    }
}

/// Arm motor that can only be driven through a [`SafetyClamp`].
pub struct ClampedActuator<M> {
    motor: M,
    clamp: SafetyClamp,
}

impl<M: Actuator> ClampedActuator<M> {
    pub fn new(
        motor: M,
        clamp: SafetyClamp,
    ) -> Self {
        Self { motor, clamp }
    }

    /// Clamp `requested` against `angle` and send it. Returns the applied output.
    pub fn set(
        &mut self,
        angle: f32,
        requested: f32,
    ) -> Result<f32, M::Error> {
        let output = self.clamp.apply(angle, requested);
        if output != requested {
            tracing::debug!(angle, requested, output, "arm output clamped");
        }
        self.motor.set(output)?;
        Ok(output)
    }

    pub fn output(&self) -> f32 {
        self.motor.get()
    }

    pub fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), M::Error> {
        self.motor.set_idle_mode(mode)
    }

    pub fn idle_mode(&self) -> IdleMode {
        self.motor.idle_mode()
    }

    pub fn clamp(&self) -> &SafetyClamp {
        &self.clamp
    }
}

/// Where to go and how to get there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmTarget {
    /// Target angle (deg).
    pub angle: f32,
    /// Output used while below the target.
    pub approach_speed: f32,
    /// Output held once the target is reached.
    pub hold_offset: f32,
}

impl ArmTarget {
    pub const fn new(
        angle: f32,
        approach_speed: f32,
        hold_offset: f32,
    ) -> Self {
        Self {
            angle,
            approach_speed,
            hold_offset,
        }
    }
}

/// Preset arm positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmLevel {
    Bottom,
    Middle,
    Top,
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmPresets {
    pub bottom: ArmTarget,
    pub middle: ArmTarget,
    pub top: ArmTarget,
    pub loading: ArmTarget,
}

impl Default for ArmPresets {
    fn default() -> Self {
        Self {
            bottom: ArmTarget::new(5.0, 0.3, 0.0),
            middle: ArmTarget::new(45.0, 0.5, 0.18),
            top: ArmTarget::new(85.0, 0.6, 0.25),
            loading: ArmTarget::new(60.0, 0.5, 0.22),
        }
    }
}

impl ArmPresets {
    pub fn target(
        &self,
        level: ArmLevel,
    ) -> ArmTarget {
        match level {
            ArmLevel::Bottom => self.bottom,
            ArmLevel::Middle => self.middle,
            ArmLevel::Top => self.top,
            ArmLevel::Loading => self.loading,
        }
    }
}

/// Arm tuning. Angles in degrees, outputs normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub clamp: SafetyClamp,
    /// Half-width of the arrival band around a target.
    pub tolerance: f32,
    /// Output used to come down onto a target from above.
    pub return_speed: f32,
    pub jog_up_speed: f32,
    pub jog_down_speed: f32,
    /// Below this angle `stop` holds with `hold_below`, otherwise `hold_above`.
    pub hold_threshold: f32,
    pub hold_below: f32,
    pub hold_above: f32,
    /// Give up on a move after this long; `None` waits forever.
    pub move_timeout_ms: Option<u64>,
    pub presets: ArmPresets,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            clamp: SafetyClamp::default(),
            tolerance: 3.0,
            return_speed: -0.3,
            jog_up_speed: 0.8,
            jog_down_speed: -0.3,
            hold_threshold: 10.0,
            hold_below: -0.2,
            hold_above: 0.2,
            move_timeout_ms: Some(4000),
            presets: ArmPresets::default(),
        }
    }
}

/// Result of one arm tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmStatus {
    /// Still converging on a target.
    Moving,
    /// Entered the tolerance band on this tick.
    Arrived,
    Holding,
    Jogging,
    /// The move timed out on this tick and the arm fell back to a stop hold.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Moving {
        target: ArmTarget,
        started: Option<Instant>,
    },
    Holding {
        output: f32,
    },
    Jogging {
        speed: f32,
    },
}

/// Arm position controller.
pub struct ArmController<S, M> {
    sensor: S,
    actuator: ClampedActuator<M>,
    config: ArmConfig,
    motion: Motion,
    angle: f32,
    desired_angle: f32,
    hold_offset: f32,
}

impl<S, M> ArmController<S, M>
where
    S: AngleSensor,
    M: Actuator,
{
    /// Take over the arm: brake, then rest on the low-angle hold output.
    pub fn new(
        sensor: S,
        motor: M,
        config: ArmConfig,
    ) -> Self {
        let mut arm = ArmController {
            sensor,
            actuator: ClampedActuator::new(motor, config.clamp),
            config,
            motion: Motion::Holding {
                output: config.hold_below,
            },
            angle: 0.0,
            desired_angle: config.presets.bottom.angle,
            hold_offset: 0.0,
        };
        arm.set_idle(IdleMode::Brake);
        arm.angle = arm.read_angle();
        arm.set_safe(config.hold_below);
        arm
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// Angle seen on the last read.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Output currently applied to the motor.
    pub fn output(&self) -> f32 {
        self.actuator.output()
    }

    pub fn idle_mode(&self) -> IdleMode {
        self.actuator.idle_mode()
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.motion, Motion::Moving { .. })
    }

    /// Start a move toward `angle`. The motion happens in [`Self::tick`].
    pub fn move_to(
        &mut self,
        angle: f32,
        approach_speed: f32,
        hold_offset: f32,
    ) {
        self.start_move(ArmTarget::new(angle, approach_speed, hold_offset));
    }

    pub fn go_to_level(
        &mut self,
        level: ArmLevel,
    ) {
        tracing::info!(?level, "arm level requested");
        self.start_move(self.config.presets.target(level));
    }

    pub fn bottom(&mut self) {
        self.go_to_level(ArmLevel::Bottom)
    }

    pub fn middle(&mut self) {
        self.go_to_level(ArmLevel::Middle)
    }

    pub fn top(&mut self) {
        self.go_to_level(ArmLevel::Top)
    }

    pub fn loading(&mut self) {
        self.go_to_level(ArmLevel::Loading)
    }

    /// Coast and drive up at the jog speed until told otherwise.
    pub fn jog_up(&mut self) {
        self.jog(self.config.jog_up_speed);
    }

    /// Coast and drive down at the jog speed until told otherwise.
    pub fn jog_down(&mut self) {
        self.jog(self.config.jog_down_speed);
    }

    /// Brake and hold against gravity where the arm is.
    pub fn stop(&mut self) {
        self.set_idle(IdleMode::Brake);
        self.angle = self.read_angle();
        self.hold_here();
    }

    /// Run one control step at time `now`.
    pub fn tick(
        &mut self,
        now: Instant,
    ) -> ArmStatus {
        self.angle = self.read_angle();

        match self.motion {
            Motion::Holding { output } => {
                self.set_safe(output);
                ArmStatus::Holding
            }
            Motion::Jogging { speed } => {
                self.set_safe(speed);
                ArmStatus::Jogging
            }
            Motion::Moving { target, started } => {
                let started = started.unwrap_or(now);
                self.motion = Motion::Moving {
                    target,
                    started: Some(started),
                };
                let status = self.step_toward(target);
                if status != ArmStatus::Moving {
                    return status;
                }
                if let Some(ms) = self.config.move_timeout_ms {
                    if now.saturating_duration_since(started) >= Duration::from_millis(ms) {
                        tracing::warn!(
                            angle = self.angle,
                            target = target.angle,
                            "arm move timed out, holding"
                        );
                        self.set_idle(IdleMode::Brake);
                        self.hold_here();
                        return ArmStatus::TimedOut;
                    }
                }
                status
            }
        }
    }

    fn step_toward(
        &mut self,
        target: ArmTarget,
    ) -> ArmStatus {
        let tolerance = self.config.tolerance;
        if self.angle > target.angle + tolerance {
            self.set_safe(self.config.return_speed);
            ArmStatus::Moving
        } else if self.angle < target.angle - tolerance {
            self.set_safe(target.approach_speed);
            ArmStatus::Moving
        } else {
            tracing::info!(angle = self.angle, target = target.angle, "arm arrived");
            self.hold_offset = target.hold_offset;
            self.motion = Motion::Holding {
                output: target.hold_offset,
            };
            self.set_safe(target.hold_offset);
            ArmStatus::Arrived
        }
    }

    fn start_move(
        &mut self,
        target: ArmTarget,
    ) {
        tracing::debug!(?target, "arm move");
        self.desired_angle = target.angle;
        self.motion = Motion::Moving {
            target,
            started: None,
        };
    }

    fn jog(
        &mut self,
        speed: f32,
    ) {
        self.set_idle(IdleMode::Coast);
        self.motion = Motion::Jogging { speed };
        self.angle = self.read_angle();
        self.set_safe(speed);
    }

    // Crude gravity compensation: push down into the rest near the bottom,
    // push up against the load everywhere else.
    fn hold_here(&mut self) {
        let output = if self.angle < self.config.hold_threshold {
            self.config.hold_below
        } else {
            self.config.hold_above
        };
        self.motion = Motion::Holding { output };
        self.set_safe(output);
    }

    fn read_angle(&mut self) -> f32 {
        match self.sensor.read_angle() {
            Ok(angle) => angle,
            Err(e) => {
                tracing::warn!("arm angle read failed, using last known: {:?}", e);
                self.angle
            }
        }
    }

    fn set_safe(
        &mut self,
        speed: f32,
    ) {
        if let Err(e) = self.actuator.set(self.angle, speed) {
            tracing::error!("arm motor command failed: {:?}", e);
        }
    }

    fn set_idle(
        &mut self,
        mode: IdleMode,
    ) {
        if let Err(e) = self.actuator.set_idle_mode(mode) {
            tracing::error!("arm idle mode change failed: {:?}", e);
        }
    }

    pub fn publish<T: TelemetrySink>(
        &self,
        sink: &mut T,
    ) {
        sink.put("Gravity Offset", self.hold_offset);
        sink.put("Desired angle", self.desired_angle);
        sink.put("pot position", self.angle);
        sink.put("Arm output", self.actuator.output());
    }
}
