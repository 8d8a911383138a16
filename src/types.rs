//! Configuration and status types for the Mahony filter

/// Default sample frequency in Hz
pub const DEFAULT_SAMPLE_FREQUENCY: f32 = 100.0;
/// Default proportional gain, pre-doubled (2 * 0.5)
pub const DEFAULT_TWO_KP: f32 = 2.0 * 0.5;
/// Default integral gain, pre-doubled (2 * 0.1)
pub const DEFAULT_TWO_KI: f32 = 2.0 * 0.1;

/// Mahony filter settings
///
/// Both gains are stored pre-doubled, the form in which they enter the
/// feedback terms. The filter keeps only the reciprocal of the sample
/// frequency, so `update` must be called at (approximately) that rate.
///
/// # Example
/// ```
/// use mahony_ahrs::{Mahony, MahonySettings};
///
/// let settings = MahonySettings {
///     sample_frequency: 512.0,
///     two_ki: 0.0, // integral feedback disabled
///     ..Default::default()
/// };
/// let mahony = Mahony::with_settings(settings)?;
/// # Ok::<(), mahony_ahrs::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MahonySettings {
    /// Sample frequency in Hz. Must be finite and greater than zero.
    pub sample_frequency: f32,
    /// Twice the proportional gain
    ///
    /// Higher values trust the accelerometer and magnetometer more and
    /// converge faster at the cost of passing more sensor noise through.
    pub two_kp: f32,
    /// Twice the integral gain
    ///
    /// Zero or negative disables integral feedback; the bias accumulator
    /// is then cleared on every update.
    pub two_ki: f32,
}

impl Default for MahonySettings {
    fn default() -> Self {
        Self {
            sample_frequency: DEFAULT_SAMPLE_FREQUENCY,
            two_kp: DEFAULT_TWO_KP,
            two_ki: DEFAULT_TWO_KI,
        }
    }
}

/// Sensor set used for one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FusionMode {
    /// Magnetometer, angular rate and gravity
    Marg,
    /// Angular rate and gravity only; the magnetometer reading was the zero vector
    Imu,
}

/// Outcome of a single filter update
///
/// Neither field signals a failure. The quaternion has been advanced and
/// renormalized in every case.
///
/// # Example
/// ```
/// use mahony_ahrs::{FusionMode, Mahony};
/// use nalgebra::Vector3;
///
/// let mut mahony = Mahony::default();
/// let status = mahony.update(
///     Vector3::zeros(),
///     Vector3::new(0.0, 0.0, 1.0),
///     Vector3::zeros(),
/// );
///
/// assert_eq!(status.mode, FusionMode::Imu);
/// assert!(status.magnetometer_unavailable());
/// assert!(status.corrected);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateStatus {
    /// Which sensors were fused
    pub mode: FusionMode,
    /// Whether feedback correction was applied
    ///
    /// False when the accelerometer reading was the zero vector; the gyroscope
    /// was integrated without correction for that sample.
    pub corrected: bool,
}

impl UpdateStatus {
    /// True when the update fell back to gravity-only fusion
    pub fn magnetometer_unavailable(&self) -> bool {
        self.mode == FusionMode::Imu
    }
}
