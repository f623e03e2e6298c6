//! Simulated hardware: a robot on a seesaw charging platform and its arm.
//!
//! The devices share state with the world through `Rc<Cell<_>>`, so the
//! controllers own their sensors while the physics step keeps writing to them.

use std::{cell::Cell, convert::Infallible, f32::consts::PI, rc::Rc};

use bb_core::utils::{
    TelemetrySink,
    controllers::{Actuator, AnalogInput, Encoder, IdleMode, OrientationSensor, Potentiometer},
    math::mixing::WheelSpeeds,
};

/// Full travel of the platform either side of level (deg).
const PLATFORM_MAX_DEG: f32 = 15.0;
/// Distance from the pivot at which the platform reaches full travel (m).
const PLATFORM_HALF_SPAN_M: f32 = 0.6;
/// How fast the platform can rotate (deg/s).
const PLATFORM_RATE_DEG_S: f32 = 20.0;
/// Chassis speed at full output (m/s).
const MAX_SPEED_M_S: f32 = 1.5;
/// Downhill slide per unit sin(tilt) (m/s), free-rolling and braked.
const SLIDE_ROLLING: f32 = 0.6;
const SLIDE_BRAKED: f32 = 0.05;
const INCHES_PER_M: f32 = 39.37;

/// Arm speed at full net output (deg/s).
const ARM_RATE_DEG_S: f32 = 120.0;
/// Output needed to hold the arm horizontal.
const ARM_GRAVITY: f32 = 0.25;
const ARM_STICTION: f32 = 0.03;
const ARM_MIN_DEG: f32 = 0.0;
const ARM_MAX_DEG: f32 = 110.0;
/// Potentiometer mapping used by the arm.
pub const POT_RANGE_DEG: f32 = 333.0;
pub const POT_OFFSET_DEG: f32 = -92.0;

#[derive(Debug, Default, Clone)]
pub struct SimMotor {
    output: f32,
    idle: IdleMode,
}

impl Actuator for SimMotor {
    type Error = Infallible;

    fn set(
        &mut self,
        output: f32,
    ) -> Result<(), Self::Error> {
        self.output = output.clamp(-1.0, 1.0);
        Ok(())
    }

    fn get(&self) -> f32 {
        self.output
    }

    fn set_idle_mode(
        &mut self,
        mode: IdleMode,
    ) -> Result<(), Self::Error> {
        self.idle = mode;
        Ok(())
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle
    }
}

#[derive(Debug, Clone)]
pub struct SimEncoder(Rc<Cell<f32>>);

impl Encoder for SimEncoder {
    type Error = Infallible;

    fn position(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0.get())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.0.set(0.0);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimImu(Rc<Cell<f32>>);

impl OrientationSensor for SimImu {
    type Error = Infallible;

    fn read_orientation(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0.get())
    }
}

#[derive(Debug, Clone)]
pub struct SimAdc(Rc<Cell<f32>>);

impl AnalogInput for SimAdc {
    type Error = Infallible;

    fn read_fraction(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0.get())
    }
}

/// Plant state for the chassis, the platform and the arm.
pub struct World {
    /// Robot position along the platform, 0 at the pivot (m).
    position: f32,
    /// Platform angle, positive nose-up (deg).
    platform: f32,
    on_platform: bool,
    /// The IMU is mounted this far off level (deg).
    mount_offset: f32,
    /// Arm angle, 0 hanging straight down (deg).
    arm: f32,
    imu: Rc<Cell<f32>>,
    pot: Rc<Cell<f32>>,
    encoders: [Rc<Cell<f32>>; 4],
    encoder_conversion: f32,
}

impl World {
    pub fn new(
        mount_offset: f32,
        arm: f32,
        encoder_conversion: f32,
    ) -> Self {
        let world = World {
            position: 0.0,
            platform: 0.0,
            on_platform: false,
            mount_offset,
            arm,
            imu: Rc::default(),
            pot: Rc::default(),
            encoders: Default::default(),
            encoder_conversion,
        };
        world.sync_sensors();
        world
    }

    /// Drive onto the platform and stop at `position`; it tips under the robot.
    pub fn place_on_platform(
        &mut self,
        position: f32,
    ) {
        self.on_platform = true;
        self.position = position;
        self.platform = Self::platform_target(position);
        self.sync_sensors();
    }

    pub fn imu(&self) -> SimImu {
        SimImu(self.imu.clone())
    }

    pub fn pot(&self) -> Potentiometer<SimAdc> {
        Potentiometer::new(SimAdc(self.pot.clone()), POT_RANGE_DEG, POT_OFFSET_DEG)
    }

    pub fn encoders(&self) -> [SimEncoder; 4] {
        self.encoders.clone().map(SimEncoder)
    }

    pub fn platform(&self) -> f32 {
        self.platform
    }

    fn platform_target(position: f32) -> f32 {
        (-position / PLATFORM_HALF_SPAN_M * PLATFORM_MAX_DEG)
            .clamp(-PLATFORM_MAX_DEG, PLATFORM_MAX_DEG)
    }

    /// Advance the plant by `dt` seconds under the given outputs.
    pub fn step(
        &mut self,
        dt: f32,
        wheels: WheelSpeeds,
        drive_idle: IdleMode,
        arm_output: f32,
        arm_idle: IdleMode,
    ) {
        let tilt = (self.platform * PI / 180.0).sin();
        let stopped = wheels.left == 0.0 && wheels.right == 0.0;
        let slide_rate = if stopped && drive_idle == IdleMode::Brake {
            SLIDE_BRAKED
        } else {
            SLIDE_ROLLING
        };
        let slide = slide_rate * tilt;

        let left = wheels.left * MAX_SPEED_M_S - slide;
        let right = wheels.right * MAX_SPEED_M_S - slide;
        self.position += (left + right) / 2.0 * dt;

        let rotations = |m: f32| m * INCHES_PER_M / self.encoder_conversion;
        let (dl, dr) = (rotations(left * dt), rotations(right * dt));
        for (i, enc) in self.encoders.iter().enumerate() {
            // left front, left rear, right front, right rear
            enc.set(enc.get() + if i < 2 { dl } else { dr });
        }

        if self.on_platform {
            let target = Self::platform_target(self.position);
            let max_step = PLATFORM_RATE_DEG_S * dt;
            self.platform += (target - self.platform).clamp(-max_step, max_step);
        }

        let net = arm_output - ARM_GRAVITY * (self.arm * PI / 180.0).sin();
        let held = arm_output == 0.0 && arm_idle == IdleMode::Brake;
        if !held && net.abs() > ARM_STICTION {
            self.arm = (self.arm + net * ARM_RATE_DEG_S * dt).clamp(ARM_MIN_DEG, ARM_MAX_DEG);
        }

        self.sync_sensors();
    }

    fn sync_sensors(&self) {
        self.imu.set(self.platform + self.mount_offset);
        self.pot.set((self.arm - POT_OFFSET_DEG) / POT_RANGE_DEG);
    }

    pub fn publish<T: TelemetrySink>(
        &self,
        sink: &mut T,
    ) {
        sink.put("Sim platform", self.platform);
        sink.put("Sim position", self.position);
        sink.put("Sim arm", self.arm);
    }
}
