//! Arcade mixing for a two-sided (skid-steer) drivetrain.
//!
//! One forward and one rotation input are combined into left/right outputs
//! and desaturated so that neither side leaves the actuator range.
//!
//! # Example
//! ```rust
//! use bb_core::utils::math::mixing::arcade_mix;
//! let speeds = arcade_mix(0.5, 0.0, false);
//! assert_eq!((speeds.left, speeds.right), (0.5, 0.5));
//! ```

use serde::{Deserialize, Serialize};

/// Normalized left/right outputs produced by the mixer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSpeeds {
    pub left: f32,
    pub right: f32,
}

/// Mix a forward speed and a counter-clockwise-positive rotation into side outputs.
///
/// Inputs are clamped to [-1, 1]. With `square_inputs` each input is squared
/// while keeping its sign, which gives finer control near zero.
pub fn arcade_mix(
    forward: f32,
    rotation: f32,
    square_inputs: bool,
) -> WheelSpeeds {
    let mut x = forward.clamp(-1.0, 1.0);
    let mut z = rotation.clamp(-1.0, 1.0);

    if square_inputs {
        x = libm::copysignf(x * x, x);
        z = libm::copysignf(z * z, z);
    }

    let greater = x.abs().max(z.abs());
    let lesser = x.abs().min(z.abs());
    if greater == 0.0 {
        return WheelSpeeds::default();
    }

    // Largest reachable |x| + |z| along the commanded direction.
    let saturated = (greater + lesser) / greater;
    WheelSpeeds {
        left: (x - z) / saturated,
        right: (x + z) / saturated,
    }
}
