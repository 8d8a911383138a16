//! Numeric primitives and nalgebra extensions for the Mahony filter

use nalgebra::{UnitQuaternion, Vector3};

use crate::euler::EulerAngles;

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Initial guess constant for the bit-level reciprocal square root
const INVERSE_SQRT_MAGIC: u32 = 0x5f37_59df;

/// Fast reciprocal square root.
///
/// Returns an approximation of `1 / sqrt(x)` accurate to a few parts per
/// million without a square-root instruction. The IEEE-754 bit pattern of `x`
/// is reinterpreted as an integer through [`f32::to_bits`], shifted and
/// subtracted from a magic constant, reinterpreted back with [`f32::from_bits`]
/// and then refined by two Newton-Raphson passes.
///
/// The result is meaningless for `x <= 0`. Every caller in this crate passes a
/// sum of squares of a vector already checked to be non-zero.
///
/// # Example
/// ```
/// use mahony_ahrs::fast_inverse_sqrt;
///
/// let r = fast_inverse_sqrt(4.0);
/// assert!((r - 0.5).abs() < 1e-4);
/// ```
#[inline]
pub fn fast_inverse_sqrt(x: f32) -> f32 {
    let half_x = 0.5 * x;
    let i = INVERSE_SQRT_MAGIC.wrapping_sub(x.to_bits() >> 1);
    let mut y = f32::from_bits(i);

    y *= 1.5 - half_x * y * y;
    y *= 1.5 - half_x * y * y;

    y
}

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Whether every component is exactly zero (the "no reading" sentinel)
    fn is_exactly_zero(&self) -> bool;

    /// Normalize with [`fast_inverse_sqrt`]. Must not be called on a zero vector.
    fn fast_normalize(&self) -> Vector3<f32>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn is_exactly_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn fast_normalize(&self) -> Vector3<f32> {
        *self * fast_inverse_sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Roll, pitch and yaw (ZYX) in radians
    fn to_euler(&self) -> EulerAngles;

    /// Create a quaternion from roll, pitch and yaw (ZYX) in radians
    fn from_euler(angles: EulerAngles) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_euler(&self) -> EulerAngles {
        EulerAngles::from_quaternion(self)
    }

    fn from_euler(angles: EulerAngles) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(angles.roll, angles.pitch, angles.yaw)
    }
}
