//! I2C-attached drive hardware.
//!
//! Motors are H-bridges whose two inputs sit on channels of a shared PCA9685
//! PWM driver; the chassis tilt comes from an ICM-42670 accelerometer. Both
//! share one bus through `embedded_hal_bus::i2c::RefCellDevice`.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use icm42670::{
    accelerometer::{Accelerometer, Error as AccelerometerError},
    Address as ImuAddress, Error as ImuError, Icm42670, PowerMode,
};
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::driver::{Actuator, IdleMode, OrientationSensor};
use crate::utils::math::tilt::pitch_from_accel;

const MAX_DUTY: u16 = 4095;

/// Errors that can occur when interacting with I2C-based devices.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
    ImuError(ImuError<E>),
    AccelError(AccelerometerError<ImuError<E>>),
}

/// Bring up the PCA9685 at `address`: wake it and set the PWM prescale.
pub fn init_pwm<I2C, E>(
    i2c_bus: &RefCell<I2C>,
    address: u8,
    prescale: u8,
) -> Result<Pca9685<RefCellDevice<'_, I2C>>, DeviceError<E>>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    let mut pca = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))
        .map_err(DeviceError::PwmError)?;
    pca.enable().map_err(DeviceError::PwmError)?;
    pca.set_prescale(prescale).map_err(DeviceError::PwmError)?;
    tracing::info!(address, prescale, "PWM enabled");
    Ok(pca)
}

/// One H-bridge motor driven from two PCA9685 channels (IN1/IN2 mode).
///
/// | output | IN1   | IN2   |
/// |--------|-------|-------|
/// | > 0    | duty  | off   |
/// | < 0    | off   | duty  |
/// | 0, brake | on  | on    |
/// | 0, coast | off | off   |
pub struct Pca9685Motor<'a, I2C> {
    pwm: &'a RefCell<Pca9685<I2C>>,
    channels: (Channel, Channel),
    output: f32,
    idle: IdleMode,
}

impl<'a, I2C, E> Pca9685Motor<'a, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Wrap two channels of a shared PWM driver. Nothing is written until the first command.
    pub fn new(
        pwm: &'a RefCell<Pca9685<I2C>>,
        in1: Channel,
        in2: Channel,
    ) -> Self {
        Pca9685Motor {
            pwm,
            channels: (in1, in2),
            output: 0.0,
            idle: IdleMode::Brake,
        }
    }

    fn write(
        &mut self,
        output: f32,
    ) -> Result<(), DeviceError<E>> {
        let (in1, in2) = self.channels;
        let duty = (output.abs() * MAX_DUTY as f32) as u16;
        let (a, b) = if duty == 0 {
            match self.idle {
                IdleMode::Brake => (MAX_DUTY, MAX_DUTY),
                IdleMode::Coast => (0, 0),
            }
        } else if output > 0.0 {
            (duty, 0)
        } else {
            (0, duty)
        };

        let mut pca = self.pwm.borrow_mut();
        pca.set_channel_on_off(in1, 0, a)
            .map_err(DeviceError::PwmError)?;
        pca.set_channel_on_off(in2, 0, b)
            .map_err(DeviceError::PwmError)?;
        Ok(())
    }
}

impl<I2C, E> Actuator for Pca9685Motor<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

    fn set(
        &mut self,
        output: f32,
    ) -> Result<(), Self::Error> {
        let output = output.clamp(-1.0, 1.0);
        self.write(output)?;
        self.output = output;
        Ok(())
    }

    fn get(&self) -> f32 {
        self.output
    }

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error> {
        let previous = self.idle;
        self.idle = mode;
        // A stopped bridge has to be rewritten to change its decay mode.
        if self.output == 0.0 && previous != mode {
            if let Err(e) = self.write(0.0) {
                self.idle = previous;
                return Err(e);
            }
        }
        Ok(())
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle
    }
}

/// Chassis pitch from the ICM-42670 accelerometer.
pub struct Icm42670Tilt<'a, I2C> {
    imu: Icm42670<RefCellDevice<'a, I2C>>,
}

impl<'a, I2C, E> Icm42670Tilt<'a, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    pub fn new(i2c_bus: &'a RefCell<I2C>) -> Result<Self, DeviceError<E>> {
        let imu = Icm42670::new(RefCellDevice::new(i2c_bus), ImuAddress::Primary)
            .map_err(DeviceError::ImuError)?;
        Ok(Icm42670Tilt { imu })
    }

    /// Power the accelerometer up (`true`) or put the IMU to sleep.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<(), DeviceError<E>> {
        let mode = if enabled {
            PowerMode::SixAxisLowNoise
        } else {
            PowerMode::Sleep
        };
        self.imu
            .set_power_mode(mode)
            .map_err(DeviceError::ImuError)
    }
}

impl<I2C, E> OrientationSensor for Icm42670Tilt<'_, I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

    fn read_orientation(&mut self) -> Result<f32, Self::Error> {
        let accel = self.imu.accel_norm().map_err(DeviceError::AccelError)?;
        Ok(pitch_from_accel(accel.x, accel.y, accel.z))
    }
}
