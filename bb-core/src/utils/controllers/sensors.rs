//! Sensor adapters: startup calibration of the orientation sensor and the
//! potentiometer-to-degrees mapping for the arm.

use serde::{Deserialize, Serialize};

use super::driver::{AnalogInput, AngleSensor, OrientationSensor};

/// Orientation reading captured at rest during startup.
///
/// The sensor is not mounted level, so every tilt reading is taken relative
/// to this value. It is fixed once created and copied into each consumer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    offset: f32,
}

impl Calibration {
    pub const fn new(offset: f32) -> Self {
        Self { offset }
    }

    pub const fn offset(&self) -> f32 {
        self.offset
    }

    /// Calibrated tilt for a raw orientation reading.
    pub fn tilt(
        &self,
        raw: f32,
    ) -> f32 {
        raw - self.offset
    }
}

/// Average `samples` raw orientation readings into a [`Calibration`].
///
/// Failed reads are skipped. If every read fails the offset is zero.
pub fn calibrate<O: OrientationSensor>(
    sensor: &mut O,
    samples: usize,
) -> Calibration {
    let mut sum = 0.0f32;
    let mut good = 0u32;
    for _ in 0..samples {
        match sensor.read_orientation() {
            Ok(raw) => {
                sum += raw;
                good += 1;
            }
            Err(e) => tracing::warn!("orientation read failed during calibration: {:?}", e),
        }
    }

    if good == 0 {
        tracing::error!("calibration got no orientation samples, using zero offset");
        return Calibration::default();
    }

    let offset = sum / good as f32;
    tracing::info!(offset, samples = good, "orientation calibrated");
    Calibration::new(offset)
}

/// Linear potentiometer reporting degrees: `fraction * full_range + offset`.
pub struct Potentiometer<A> {
    input: A,
    full_range: f32,
    offset: f32,
}

impl<A: AnalogInput> Potentiometer<A> {
    pub fn new(
        input: A,
        full_range: f32,
        offset: f32,
    ) -> Self {
        Self {
            input,
            full_range,
            offset,
        }
    }

    pub fn into_inner(self) -> A {
        self.input
    }
}

impl<A: AnalogInput> AngleSensor for Potentiometer<A> {
    type Error = A::Error;

    fn read_angle(&mut self) -> Result<f32, Self::Error> {
        let fraction = self.input.read_fraction()?.clamp(0.0, 1.0);
        Ok(fraction * self.full_range + self.offset)
    }
}
