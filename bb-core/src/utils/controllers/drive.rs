//! Four-motor differential (skid-steer) drivetrain.
//!
//! `DifferentialDrive` owns the four drive actuators and their encoders. It
//! turns a forward/rotation command into left/right outputs through
//! [`arcade_mix`], applies the idle mode to every actuator at once, and
//! aggregates encoder readings into a distance and a rotation estimate.
//!
//! Only three encoders feed the aggregates: the left-front encoder is read and
//! published but never averaged in.

use serde::{Deserialize, Serialize};

use super::driver::{Actuator, Encoder, IdleMode};
use crate::utils::{
    math::mixing::{arcade_mix, WheelSpeeds},
    telemetry::TelemetrySink,
};

/// Errors raised while commanding the drivetrain.
#[derive(Debug)]
pub enum DriveError<ME: core::fmt::Debug, EE: core::fmt::Debug> {
    Motor(Wheel, ME),
    Encoder(Wheel, EE),
}

/// Wheel position, used to index motors and encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    LeftFront = 0,
    LeftRear = 1,
    RightFront = 2,
    RightRear = 3,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::LeftFront,
        Wheel::LeftRear,
        Wheel::RightFront,
        Wheel::RightRear,
    ];

    pub const fn is_left(self) -> bool {
        matches!(self, Wheel::LeftFront | Wheel::LeftRear)
    }
}

/// Drivetrain tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Both inputs are multiplied by this before mixing.
    pub scale: f32,
    /// Square inputs (keeping sign) before mixing.
    pub square_inputs: bool,
    /// Inches of travel per encoder rotation.
    pub encoder_conversion: f32,
    pub left_inverted: bool,
    pub right_inverted: bool,
    /// Idle mode applied at construction.
    pub idle_mode: IdleMode,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            scale: 0.85,
            square_inputs: false,
            encoder_conversion: 1.76,
            left_inverted: false,
            right_inverted: true,
            idle_mode: IdleMode::Brake,
        }
    }
}

/// Anything a controller can steer with a forward/rotation pair.
pub trait Drivetrain {
    type Error: core::fmt::Debug;

    fn drive(
        &mut self,
        forward: f32,
        rotation: f32,
    ) -> Result<(), Self::Error>;

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error>;
}

impl<T: Drivetrain + ?Sized> Drivetrain for &mut T {
    type Error = T::Error;

    fn drive(
        &mut self,
        forward: f32,
        rotation: f32,
    ) -> Result<(), Self::Error> {
        (**self).drive(forward, rotation)
    }

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error> {
        (**self).set_idle_mode(mode)
    }
}

/// Four-motor arcade drivetrain with encoder aggregation.
pub struct DifferentialDrive<M, E> {
    motors: [M; 4],
    encoders: [E; 4],
    config: DriveConfig,
    idle_mode: IdleMode,
    output: WheelSpeeds,
}

impl<M, E> DifferentialDrive<M, E>
where
    M: Actuator,
    E: Encoder,
{
    /// Build the drivetrain, apply the configured idle mode and zero the encoders.
    ///
    /// Motors and encoders are indexed by [`Wheel`].
    pub fn new(
        motors: [M; 4],
        encoders: [E; 4],
        config: DriveConfig,
    ) -> Result<Self, DriveError<M::Error, E::Error>> {
        let mut drive = DifferentialDrive {
            motors,
            encoders,
            config,
            idle_mode: config.idle_mode,
            output: WheelSpeeds::default(),
        };
        drive.apply_idle_mode(config.idle_mode)?;
        drive.reset_encoders()?;
        Ok(drive)
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Last mixed output, before per-side inversion.
    pub fn output(&self) -> WheelSpeeds {
        self.output
    }

    pub fn idle_mode(&self) -> IdleMode {
        self.idle_mode
    }

    pub fn motor(
        &self,
        wheel: Wheel,
    ) -> &M {
        &self.motors[wheel as usize]
    }

    /// Arcade drive. Both inputs are nominally in [-1, 1]; positive rotation turns clockwise.
    pub fn drive(
        &mut self,
        forward: f32,
        rotation: f32,
    ) -> Result<(), DriveError<M::Error, E::Error>> {
        let scale = self.config.scale;
        let speeds = arcade_mix(forward * scale, -rotation * scale, self.config.square_inputs);
        tracing::debug!(forward, rotation, left = speeds.left, right = speeds.right, "drive");

        // Every motor gets its write even if an earlier one fails.
        let mut result = Ok(());
        for wheel in Wheel::ALL {
            let (value, inverted) = if wheel.is_left() {
                (speeds.left, self.config.left_inverted)
            } else {
                (speeds.right, self.config.right_inverted)
            };
            let value = if inverted { -value } else { value };
            if let Err(e) = self.motors[wheel as usize].set(value) {
                tracing::error!(?wheel, value, "motor write failed");
                if result.is_ok() {
                    result = Err(DriveError::Motor(wheel, e));
                }
            }
        }
        if result.is_ok() {
            self.output = speeds;
        }
        result
    }

    /// Command zero on every side.
    pub fn stop(&mut self) -> Result<(), DriveError<M::Error, E::Error>> {
        self.drive(0.0, 0.0)
    }

    pub fn set_brake_mode(&mut self) -> Result<(), DriveError<M::Error, E::Error>> {
        self.apply_idle_mode(IdleMode::Brake)
    }

    pub fn set_coast_mode(&mut self) -> Result<(), DriveError<M::Error, E::Error>> {
        self.apply_idle_mode(IdleMode::Coast)
    }

    /// Apply `mode` to all four motors.
    ///
    /// If any motor rejects the change, the motors already switched are put
    /// back so the drivetrain never runs with mixed idle modes.
    fn apply_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), DriveError<M::Error, E::Error>> {
        let previous = self.idle_mode;
        for (i, wheel) in Wheel::ALL.into_iter().enumerate() {
            if let Err(e) = self.motors[wheel as usize].set_idle_mode(mode) {
                tracing::error!(?wheel, ?mode, "idle mode rejected, rolling back");
                for undo in &Wheel::ALL[..i] {
                    let _ = self.motors[*undo as usize].set_idle_mode(previous);
                }
                return Err(DriveError::Motor(wheel, e));
            }
        }
        if mode != previous {
            tracing::info!(?mode, "drive idle mode changed");
        }
        self.idle_mode = mode;
        Ok(())
    }

    /// Raw positions of all four encoders, indexed by [`Wheel`].
    pub fn encoder_positions(&mut self) -> Result<[f32; 4], DriveError<M::Error, E::Error>> {
        let mut positions = [0.0; 4];
        for wheel in Wheel::ALL {
            positions[wheel as usize] = self.encoders[wheel as usize]
                .position()
                .map_err(|e| DriveError::Encoder(wheel, e))?;
        }
        Ok(positions)
    }

    /// Mean rotations of the left-rear, right-front and right-rear encoders.
    pub fn average_position(&mut self) -> Result<f32, DriveError<M::Error, E::Error>> {
        let p = self.encoder_positions()?;
        Ok(aggregate_position(&p))
    }

    /// [`Self::average_position`] converted to inches.
    pub fn average_distance(&mut self) -> Result<f32, DriveError<M::Error, E::Error>> {
        Ok(self.config.encoder_conversion * self.average_position()?)
    }

    /// Left-rear rotations minus the mean of the two right encoders.
    pub fn average_rotation(&mut self) -> Result<f32, DriveError<M::Error, E::Error>> {
        let p = self.encoder_positions()?;
        Ok(aggregate_rotation(&p))
    }

    pub fn reset_encoders(&mut self) -> Result<(), DriveError<M::Error, E::Error>> {
        for wheel in Wheel::ALL {
            self.encoders[wheel as usize]
                .reset()
                .map_err(|e| DriveError::Encoder(wheel, e))?;
        }
        Ok(())
    }

    /// Publish encoder positions, motor outputs and the aggregates.
    pub fn publish<T: TelemetrySink>(
        &mut self,
        sink: &mut T,
    ) {
        const ENC_KEYS: [&str; 4] = ["LF_Enc", "LR_Enc", "RF_Enc", "RR_Enc"];
        const SPEED_KEYS: [&str; 4] = ["LF_Speed", "LR_Speed", "RF_Speed", "RR_Speed"];

        for wheel in Wheel::ALL {
            sink.put(SPEED_KEYS[wheel as usize], self.motors[wheel as usize].get());
        }

        match self.encoder_positions() {
            Ok(p) => {
                for wheel in Wheel::ALL {
                    sink.put(ENC_KEYS[wheel as usize], p[wheel as usize]);
                }
                let position = aggregate_position(&p);
                sink.put("AveragePosition", position);
                sink.put("AverageRotation", aggregate_rotation(&p));
                sink.put("AveragePosition(inch)", self.config.encoder_conversion * position);
            }
            Err(e) => tracing::warn!("encoder read failed, skipping drive telemetry: {:?}", e),
        }
    }
}

impl<M, E> Drivetrain for DifferentialDrive<M, E>
where
    M: Actuator,
    E: Encoder,
{
    type Error = DriveError<M::Error, E::Error>;

    fn drive(
        &mut self,
        forward: f32,
        rotation: f32,
    ) -> Result<(), Self::Error> {
        DifferentialDrive::drive(self, forward, rotation)
    }

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error> {
        self.apply_idle_mode(mode)
    }
}

fn aggregate_position(p: &[f32; 4]) -> f32 {
    (p[Wheel::LeftRear as usize] + p[Wheel::RightFront as usize] + p[Wheel::RightRear as usize])
        / 3.0
}

fn aggregate_rotation(p: &[f32; 4]) -> f32 {
    p[Wheel::LeftRear as usize]
        - (p[Wheel::RightFront as usize] + p[Wheel::RightRear as usize]) / 2.0
}
