//! Mahony complementary filter
//!
//! Fuses angular rate with the measured directions of gravity and, when
//! available, the local magnetic field. The error between measured and
//! estimated directions drives proportional and integral feedback onto the
//! gyroscope rate before it is integrated into the orientation quaternion.

use nalgebra::{ComplexField, Quaternion, UnitQuaternion, Vector3};

use crate::error::{Error, Result};
use crate::euler::EulerAngles;
use crate::math::{Vector3Ext, fast_inverse_sqrt};
use crate::types::{FusionMode, MahonySettings, UpdateStatus};

/// Mahony attitude filter
///
/// Owns the orientation estimate and the gyroscope bias accumulator. One
/// instance is advanced once per sample period by a single caller; separate
/// estimates need separate instances.
#[derive(Debug, Clone)]
pub struct Mahony {
    /// Filter settings
    settings: MahonySettings,
    /// Reciprocal of the sample frequency in seconds
    sample_period: f32,
    /// Current orientation (w = q0, i/j/k = q1/q2/q3)
    quaternion: UnitQuaternion<f32>,
    /// Integral feedback accumulated per axis, in rad/s
    integral_feedback: Vector3<f32>,
}

impl Mahony {
    /// Create a filter for the given sample frequency with default gains
    pub fn new(sample_frequency: f32) -> Result<Self> {
        Self::with_settings(MahonySettings {
            sample_frequency,
            ..Default::default()
        })
    }

    /// Create a filter with the specified settings
    ///
    /// Fails with [`Error::InvalidSampleFrequency`] unless the sample frequency
    /// is finite and positive, and with [`Error::InvalidGain`] if either gain is
    /// not finite.
    pub fn with_settings(settings: MahonySettings) -> Result<Self> {
        let sample_period = validate(&settings)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("mahony filter created: {}", settings);

        Ok(Self {
            settings,
            sample_period,
            quaternion: UnitQuaternion::identity(),
            integral_feedback: Vector3::zeros(),
        })
    }

    /// Return to the identity orientation and clear the bias accumulator
    pub fn reset(&mut self) {
        self.quaternion = UnitQuaternion::identity();
        self.integral_feedback = Vector3::zeros();

        #[cfg(feature = "defmt")]
        defmt::debug!("mahony filter reset");
    }

    /// Current settings
    pub fn settings(&self) -> MahonySettings {
        self.settings
    }

    /// Replace the settings
    ///
    /// On error the previous settings stay in effect. Disabling integral
    /// feedback clears the accumulator immediately.
    pub fn set_settings(&mut self, settings: MahonySettings) -> Result<()> {
        self.sample_period = validate(&settings)?;
        self.settings = settings;
        if !integral_enabled(&settings) {
            self.integral_feedback = Vector3::zeros();
        }
        Ok(())
    }

    /// Sample period in seconds
    pub fn sample_period(&self) -> f32 {
        self.sample_period
    }

    /// Current orientation quaternion
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    /// Seed the orientation, e.g. from a known starting pose
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.quaternion = quaternion;
    }

    /// Accumulated integral feedback (estimated gyroscope bias correction), rad/s
    pub fn integral_feedback(&self) -> Vector3<f32> {
        self.integral_feedback
    }

    /// Roll, pitch and yaw of the current estimate
    pub fn euler(&self) -> EulerAngles {
        EulerAngles::from_quaternion(&self.quaternion)
    }

    /// Unit gravity direction in the sensor frame implied by the current estimate
    pub fn gravity(&self) -> Vector3<f32> {
        self.half_gravity() * 2.0
    }

    /// Advance the filter by one sample
    ///
    /// # Arguments
    /// * `gyroscope` - Angular rate in rad/s
    /// * `accelerometer` - Specific force in any consistent unit
    /// * `magnetometer` - Magnetic field in any consistent unit, or the zero
    ///   vector when no reading is available this cycle
    ///
    /// A zero magnetometer falls back to [`Mahony::update_imu`]. A zero
    /// accelerometer integrates the gyroscope without correction.
    pub fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
    ) -> UpdateStatus {
        if magnetometer.is_exactly_zero() {
            #[cfg(feature = "defmt")]
            defmt::trace!("magnetometer unavailable, gravity-only update");
            return self.update_imu(gyroscope, accelerometer);
        }

        let mut rate = gyroscope;
        let corrected = !accelerometer.is_exactly_zero();
        if corrected {
            let accelerometer = accelerometer.fast_normalize();
            let magnetometer = magnetometer.fast_normalize();

            let half_error = accelerometer.cross(&self.half_gravity())
                + magnetometer.cross(&self.half_magnetic(magnetometer));
            rate = self.apply_feedback(rate, half_error);
        } else {
            #[cfg(feature = "defmt")]
            defmt::trace!("accelerometer unavailable, uncorrected update");
        }

        self.integrate_quaternion(rate);

        UpdateStatus {
            mode: FusionMode::Marg,
            corrected,
        }
    }

    /// Advance the filter with gyroscope and accelerometer only
    pub fn update_imu(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
    ) -> UpdateStatus {
        let mut rate = gyroscope;
        let corrected = !accelerometer.is_exactly_zero();
        if corrected {
            let accelerometer = accelerometer.fast_normalize();
            let half_error = accelerometer.cross(&self.half_gravity());
            rate = self.apply_feedback(rate, half_error);
        } else {
            #[cfg(feature = "defmt")]
            defmt::trace!("accelerometer unavailable, uncorrected update");
        }

        self.integrate_quaternion(rate);

        UpdateStatus {
            mode: FusionMode::Imu,
            corrected,
        }
    }

    /// Estimated gravity direction, halved, from the third row of the rotation matrix
    fn half_gravity(&self) -> Vector3<f32> {
        let q = self.quaternion.as_ref();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

        Vector3::new(
            q1 * q3 - q0 * q2,
            q0 * q1 + q2 * q3,
            q0 * q0 - 0.5 + q3 * q3,
        )
    }

    /// Estimated magnetic field direction, halved
    ///
    /// The measured field is rotated into the Earth frame and flattened onto
    /// a reference with horizontal component `bx` and vertical component
    /// `bz` only, then rotated back into the sensor frame.
    fn half_magnetic(&self, magnetometer: Vector3<f32>) -> Vector3<f32> {
        let q = self.quaternion.as_ref();
        let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
        let (mx, my, mz) = (magnetometer.x, magnetometer.y, magnetometer.z);

        let q0q1 = q0 * q1;
        let q0q2 = q0 * q2;
        let q0q3 = q0 * q3;
        let q1q1 = q1 * q1;
        let q1q2 = q1 * q2;
        let q1q3 = q1 * q3;
        let q2q2 = q2 * q2;
        let q2q3 = q2 * q3;
        let q3q3 = q3 * q3;

        let hx = 2.0 * (mx * (0.5 - q2q2 - q3q3) + my * (q1q2 - q0q3) + mz * (q1q3 + q0q2));
        let hy = 2.0 * (mx * (q1q2 + q0q3) + my * (0.5 - q1q1 - q3q3) + mz * (q2q3 - q0q1));
        let bx = (hx * hx + hy * hy).sqrt();
        let bz = 2.0 * (mx * (q1q3 - q0q2) + my * (q2q3 + q0q1) + mz * (0.5 - q1q1 - q2q2));

        Vector3::new(
            bx * (0.5 - q2q2 - q3q3) + bz * (q1q3 - q0q2),
            bx * (q1q2 - q0q3) + bz * (q0q1 + q2q3),
            bx * (q0q2 + q1q3) + bz * (0.5 - q1q1 - q2q2),
        )
    }

    /// Apply integral and proportional feedback to the angular rate
    fn apply_feedback(&mut self, rate: Vector3<f32>, half_error: Vector3<f32>) -> Vector3<f32> {
        let mut rate = rate;

        // Gain is checked every call so a disabled integral term cannot wind up
        if integral_enabled(&self.settings) {
            self.integral_feedback += half_error * self.settings.two_ki * self.sample_period;
            rate += self.integral_feedback;
        } else {
            self.integral_feedback = Vector3::zeros();
        }

        rate + half_error * self.settings.two_kp
    }

    /// First-order quaternion integration followed by renormalization
    fn integrate_quaternion(&mut self, rate: Vector3<f32>) {
        let half_rate = rate * (0.5 * self.sample_period);
        let (wx, wy, wz) = (half_rate.x, half_rate.y, half_rate.z);

        let q = self.quaternion.as_ref();
        let (qa, qb, qc, qd) = (q.w, q.i, q.j, q.k);

        let q0 = qa + (-qb * wx - qc * wy - qd * wz);
        let q1 = qb + (qa * wx + qc * wz - qd * wy);
        let q2 = qc + (qa * wy - qb * wz + qd * wx);
        let q3 = qd + (qa * wz + qb * wy - qc * wx);

        let recip_norm = fast_inverse_sqrt(q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3);
        self.quaternion = UnitQuaternion::new_unchecked(Quaternion::new(
            q0 * recip_norm,
            q1 * recip_norm,
            q2 * recip_norm,
            q3 * recip_norm,
        ));
    }
}

impl Default for Mahony {
    fn default() -> Self {
        let settings = MahonySettings::default();
        Self {
            settings,
            sample_period: 1.0 / settings.sample_frequency,
            quaternion: UnitQuaternion::identity(),
            integral_feedback: Vector3::zeros(),
        }
    }
}

/// Validate settings and return the sample period
fn validate(settings: &MahonySettings) -> Result<f32> {
    let frequency = settings.sample_frequency;
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(Error::InvalidSampleFrequency(frequency));
    }
    for gain in [settings.two_kp, settings.two_ki] {
        if !gain.is_finite() {
            return Err(Error::InvalidGain(gain));
        }
    }
    Ok(1.0 / frequency)
}

/// Integral feedback runs only for a strictly positive gain
fn integral_enabled(settings: &MahonySettings) -> bool {
    settings.two_ki > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    fn gravity() -> Vector3<f32> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    fn north() -> Vector3<f32> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    fn norm(q: UnitQuaternion<f32>) -> f32 {
        (q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k).sqrt()
    }

    #[test]
    fn test_new_mahony() {
        let mahony = Mahony::new(100.0).unwrap();
        assert_eq!(mahony.quaternion(), UnitQuaternion::identity());
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());
        assert!((mahony.sample_period() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_default_matches_default_settings() {
        let mahony = Mahony::default();
        assert_eq!(mahony.settings(), MahonySettings::default());
        assert_eq!(mahony.settings().two_kp, 1.0);
        assert_eq!(mahony.settings().two_ki, 0.2);
    }

    #[test]
    fn test_invalid_sample_frequency() {
        for frequency in [0.0, -10.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                Mahony::new(frequency),
                Err(Error::InvalidSampleFrequency(_))
            ));
        }
    }

    #[test]
    fn test_set_settings_keeps_previous_on_error() {
        let mut mahony = Mahony::default();
        let bad = MahonySettings {
            sample_frequency: 0.0,
            ..Default::default()
        };
        assert!(mahony.set_settings(bad).is_err());
        assert_eq!(mahony.settings(), MahonySettings::default());
        assert!((mahony.sample_period() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_gains_rejected() {
        for gain in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let proportional = MahonySettings {
                two_kp: gain,
                ..Default::default()
            };
            assert!(matches!(
                Mahony::with_settings(proportional),
                Err(Error::InvalidGain(_))
            ));

            let integral = MahonySettings {
                two_ki: gain,
                ..Default::default()
            };
            assert!(matches!(
                Mahony::with_settings(integral),
                Err(Error::InvalidGain(_))
            ));
        }
    }

    #[test]
    fn test_set_settings_nan_integral_gain_keeps_state() {
        let mut mahony = Mahony::default();
        mahony.set_quaternion(UnitQuaternion::from_euler_angles(0.5, 0.2, 0.0));
        mahony.update(Vector3::zeros(), gravity(), north());
        let integral = mahony.integral_feedback();
        assert_ne!(integral, Vector3::zeros());

        let nan = MahonySettings {
            two_ki: f32::NAN,
            ..mahony.settings()
        };
        assert!(matches!(
            mahony.set_settings(nan),
            Err(Error::InvalidGain(gain)) if gain.is_nan()
        ));
        assert_eq!(mahony.settings(), MahonySettings::default());
        assert_eq!(mahony.integral_feedback(), integral);
    }

    #[test]
    fn test_negative_integral_gain_clears_accumulator() {
        let mut mahony = Mahony::default();
        mahony.set_quaternion(UnitQuaternion::from_euler_angles(0.5, 0.2, 0.0));
        mahony.update(Vector3::zeros(), gravity(), north());
        assert_ne!(mahony.integral_feedback(), Vector3::zeros());

        let settings = MahonySettings {
            two_ki: -0.5,
            ..mahony.settings()
        };
        mahony.set_settings(settings).unwrap();
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());

        // uncorrected steps never reach the feedback branch
        mahony.update(Vector3::zeros(), Vector3::zeros(), north());
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());
    }

    #[test]
    fn test_gravity_at_identity() {
        let mahony = Mahony::default();
        let gravity = mahony.gravity();
        assert!((gravity.z - 1.0).abs() < 1e-6);
        assert!(gravity.x.abs() < 1e-6 && gravity.y.abs() < 1e-6);
    }

    #[test]
    fn test_zero_magnetometer_selects_imu_mode() {
        let mut mahony = Mahony::default();
        let status = mahony.update(Vector3::zeros(), gravity(), Vector3::zeros());
        assert_eq!(status.mode, FusionMode::Imu);
        assert!(status.corrected);

        let status = mahony.update(Vector3::zeros(), gravity(), north());
        assert_eq!(status.mode, FusionMode::Marg);
        assert!(!status.magnetometer_unavailable());
    }

    #[test]
    fn test_zero_accelerometer_skips_correction() {
        let mut mahony = Mahony::default();
        mahony.set_quaternion(UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0));
        let before = mahony.quaternion();

        let status = mahony.update(Vector3::zeros(), Vector3::zeros(), north());
        assert!(!status.corrected);
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());
        // no gyro and no correction: only the renormalization touches the quaternion
        assert!(before.angle_to(&mahony.quaternion()) < 1e-3);
    }

    #[test]
    fn test_gyro_integration_without_correction() {
        let mut mahony = Mahony::new(100.0).unwrap();
        let rate = Vector3::new(0.0, 0.0, FRAC_PI_2); // 90 deg/s about Z

        for _ in 0..100 {
            mahony.update(rate, Vector3::zeros(), Vector3::zeros());
        }

        let yaw = mahony.euler().yaw;
        assert!((yaw - FRAC_PI_2).abs() < 1e-2, "yaw: {yaw}");
        assert!((norm(mahony.quaternion()) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_tilt_converges_to_accelerometer() {
        let mut mahony = Mahony::default();
        // gravity measured along +Y: sensor rolled by -90 degrees
        let accel = Vector3::new(0.0, 1.0, 0.0);

        for _ in 0..3000 {
            mahony.update_imu(Vector3::zeros(), accel);
        }

        let gravity = mahony.gravity();
        assert!((gravity - accel).norm() < 1e-2, "gravity: {gravity:?}");
    }

    #[test]
    fn test_integral_disabled_clears_accumulator() {
        let mut mahony = Mahony::default();
        mahony.set_quaternion(UnitQuaternion::from_euler_angles(0.5, 0.2, 0.0));
        mahony.update(Vector3::zeros(), gravity(), north());
        assert_ne!(mahony.integral_feedback(), Vector3::zeros());

        let settings = MahonySettings {
            two_ki: 0.0,
            ..mahony.settings()
        };
        mahony.set_settings(settings).unwrap();
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());

        mahony.update(Vector3::zeros(), gravity(), north());
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());
    }

    #[test]
    fn test_reset() {
        let mut mahony = Mahony::default();
        mahony.set_quaternion(UnitQuaternion::from_euler_angles(0.5, 0.2, 0.0));
        mahony.update(Vector3::new(0.1, 0.0, 0.0), gravity(), north());

        mahony.reset();

        assert_eq!(mahony.quaternion(), UnitQuaternion::identity());
        assert_eq!(mahony.integral_feedback(), Vector3::zeros());
    }
}
