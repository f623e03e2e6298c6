//! In-memory actuators and sensors shared by the integration tests.
#![allow(dead_code)]

use std::{cell::Cell, rc::Rc};

use bb_core::utils::{
    controllers::{Actuator, AngleSensor, Drivetrain, Encoder, IdleMode, OrientationSensor},
    telemetry::TelemetrySink,
};

#[derive(Debug, Default, Clone)]
pub struct FakeMotor {
    pub output: f32,
    pub idle: IdleMode,
    /// Reject any request to switch into this idle mode.
    pub fail_on: Option<IdleMode>,
    /// Reject `set(0.0)`, leaving the previous output in place.
    pub reject_zero: bool,
}

impl Actuator for FakeMotor {
    type Error = &'static str;

    fn set(&mut self, output: f32) -> Result<(), Self::Error> {
        if self.reject_zero && output == 0.0 {
            return Err("zero output rejected");
        }
        self.output = output;
        Ok(())
    }

    fn get(&self) -> f32 {
        self.output
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), Self::Error> {
        if self.fail_on == Some(mode) {
            return Err("idle mode rejected");
        }
        self.idle = mode;
        Ok(())
    }

    fn idle_mode(&self) -> IdleMode {
        self.idle
    }
}

/// Encoder whose position the test controls through a shared cell.
#[derive(Debug, Default, Clone)]
pub struct FakeEncoder(pub Rc<Cell<f32>>);

impl Encoder for FakeEncoder {
    type Error = &'static str;

    fn position(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0.get())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.0.set(0.0);
        Ok(())
    }
}

/// Sensor reading a shared cell; `None` simulates a failed read.
#[derive(Debug, Default, Clone)]
pub struct FakeSensor(pub Rc<Cell<Option<f32>>>);

impl FakeSensor {
    pub fn reading(value: f32) -> Self {
        FakeSensor(Rc::new(Cell::new(Some(value))))
    }

    pub fn set(&self, value: f32) {
        self.0.set(Some(value));
    }

    pub fn fail(&self) {
        self.0.set(None);
    }
}

impl OrientationSensor for FakeSensor {
    type Error = &'static str;

    fn read_orientation(&mut self) -> Result<f32, Self::Error> {
        self.0.get().ok_or("imu offline")
    }
}

impl AngleSensor for FakeSensor {
    type Error = &'static str;

    fn read_angle(&mut self) -> Result<f32, Self::Error> {
        self.0.get().ok_or("pot disconnected")
    }
}

/// Drivetrain that records every command it receives.
#[derive(Debug, Default)]
pub struct RecordingDrive {
    pub commands: Vec<(f32, f32)>,
    pub idle: Option<IdleMode>,
}

impl RecordingDrive {
    pub fn last(&self) -> Option<(f32, f32)> {
        self.commands.last().copied()
    }
}

impl Drivetrain for RecordingDrive {
    type Error = &'static str;

    fn drive(&mut self, forward: f32, rotation: f32) -> Result<(), Self::Error> {
        self.commands.push((forward, rotation));
        Ok(())
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), Self::Error> {
        self.idle = Some(mode);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct VecSink(pub Vec<(&'static str, f32)>);

impl VecSink {
    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

impl TelemetrySink for VecSink {
    fn put(&mut self, key: &'static str, value: f32) {
        self.0.push((key, value));
    }
}

pub fn encoders() -> ([FakeEncoder; 4], [Rc<Cell<f32>>; 4]) {
    let cells: [Rc<Cell<f32>>; 4] = Default::default();
    let encs = [
        FakeEncoder(cells[0].clone()),
        FakeEncoder(cells[1].clone()),
        FakeEncoder(cells[2].clone()),
        FakeEncoder(cells[3].clone()),
    ];
    (encs, cells)
}
