//! Quaternion to roll/pitch/yaw readout

use nalgebra::{ComplexField, RealField, UnitQuaternion};

use crate::math::RAD_TO_DEG;

/// Roll, pitch and yaw in radians (ZYX convention)
///
/// Derived from the filter quaternion on demand and never stored as state.
///
/// # Example
/// ```
/// use mahony_ahrs::{EulerAngles, QuaternionExt};
/// use nalgebra::UnitQuaternion;
///
/// let angles = UnitQuaternion::identity().to_euler();
/// assert_eq!(angles, EulerAngles::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EulerAngles {
    /// Rotation about the X axis
    pub roll: f32,
    /// Rotation about the Y axis
    pub pitch: f32,
    /// Rotation about the Z axis
    pub yaw: f32,
}

impl EulerAngles {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Convert a quaternion to Euler angles.
    ///
    /// The pitch term goes through `asin`, whose argument is clamped to
    /// `[-1, 1]`. Near +/-90 degrees of pitch rounding can push the raw value
    /// just past the domain; clamping yields +/-pi/2 instead of NaN.
    pub fn from_quaternion(quaternion: &UnitQuaternion<f32>) -> Self {
        let q0 = quaternion.w;
        let q1 = quaternion.i;
        let q2 = quaternion.j;
        let q3 = quaternion.k;

        let roll = (q0 * q1 + q2 * q3).atan2(0.5 - q1 * q1 - q2 * q2);
        let sin_pitch = (-2.0 * (q1 * q3 - q0 * q2)).clamp(-1.0, 1.0);
        let pitch = sin_pitch.asin();
        let yaw = (q1 * q2 + q0 * q3).atan2(0.5 - q2 * q2 - q3 * q3);

        Self { roll, pitch, yaw }
    }

    /// Same angles in degrees
    pub fn to_degrees(self) -> Self {
        Self {
            roll: self.roll * RAD_TO_DEG,
            pitch: self.pitch * RAD_TO_DEG,
            yaw: self.yaw * RAD_TO_DEG,
        }
    }
}

impl From<UnitQuaternion<f32>> for EulerAngles {
    fn from(quaternion: UnitQuaternion<f32>) -> Self {
        Self::from_quaternion(&quaternion)
    }
}
