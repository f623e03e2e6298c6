//! Abstract actuator and sensor interfaces.
//!
//! Controllers only talk to hardware through these traits; concrete devices
//! live in [`super::i2c`] and [`super::sensors`], and the simulator provides
//! its own implementations.

use serde::{Deserialize, Serialize};

/// What a motor does when commanded to zero output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleMode {
    /// Short the windings and resist motion.
    #[default]
    Brake,
    /// Let the output spin freely.
    Coast,
}

/// A single motor output taking a normalized command in [-1, 1].
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Command a new normalized output.
    fn set(
        &mut self,
        output: f32,
    ) -> Result<(), Self::Error>;

    /// Last output accepted by [`Actuator::set`].
    fn get(&self) -> f32;

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error>;

    fn idle_mode(&self) -> IdleMode;
}

/// Raw chassis orientation in degrees (uncalibrated).
pub trait OrientationSensor {
    type Error: core::fmt::Debug;

    fn read_orientation(&mut self) -> Result<f32, Self::Error>;
}

/// Arm pivot angle in degrees.
pub trait AngleSensor {
    type Error: core::fmt::Debug;

    fn read_angle(&mut self) -> Result<f32, Self::Error>;
}

/// Analog input reporting a fraction of its full-scale range in [0, 1].
pub trait AnalogInput {
    type Error: core::fmt::Debug;

    fn read_fraction(&mut self) -> Result<f32, Self::Error>;
}

/// Relative wheel encoder reporting rotations since the last reset.
pub trait Encoder {
    type Error: core::fmt::Debug;

    fn position(&mut self) -> Result<f32, Self::Error>;

    fn reset(&mut self) -> Result<(), Self::Error>;
}

impl<T: Actuator + ?Sized> Actuator for &mut T {
    type Error = T::Error;

    fn set(
        &mut self,
        output: f32,
    ) -> Result<(), Self::Error> {
        (**self).set(output)
    }

    fn get(&self) -> f32 {
        (**self).get()
    }

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error> {
        (**self).set_idle_mode(mode)
    }

    fn idle_mode(&self) -> IdleMode {
        (**self).idle_mode()
    }
}

impl<T: OrientationSensor + ?Sized> OrientationSensor for &mut T {
    type Error = T::Error;

    fn read_orientation(&mut self) -> Result<f32, Self::Error> {
        (**self).read_orientation()
    }
}

impl<T: AngleSensor + ?Sized> AngleSensor for &mut T {
    type Error = T::Error;

    fn read_angle(&mut self) -> Result<f32, Self::Error> {
        (**self).read_angle()
    }
}
