//! Tilt helpers shared by the orientation adapters and the balance controller.

/// Pitch of the chassis in degrees from a normalized accelerometer sample.
///
/// Positive when the sensor's +X axis points above the horizon.
pub fn pitch_from_accel(
    ax: f32,
    ay: f32,
    az: f32,
) -> f32 {
    libm::atan2f(ax, libm::sqrtf(ay * ay + az * az)).to_degrees()
}

/// Forward drive command that pushes the chassis back toward level.
///
/// `sin(tilt) * multiplier`: steep ramps get a stronger push, but the
/// command never exceeds `multiplier` in magnitude.
pub fn correction_speed(
    tilt_degrees: f32,
    multiplier: f32,
) -> f32 {
    libm::sinf(tilt_degrees.to_radians()) * multiplier
}
