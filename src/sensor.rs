//! Sensor collaborator boundary
//!
//! Bus transport and register access belong to the device drivers. This
//! module defines what the filter expects from them, the raw-count scaling
//! for the FXAS21002C gyroscope and FXOS8700 accelerometer/magnetometer, and
//! a [`Sampler`] that pulls one reading from each sensor per period and feeds
//! it to a [`Mahony`] filter.

use core::cell::RefCell;

use nalgebra::Vector3;
use thiserror::Error;

use crate::error::Error as MahonyError;
use crate::mahony::Mahony;
use crate::math::DEG_TO_RAD;
use crate::types::UpdateStatus;

/// Standard gravity in m/s^2
pub const STANDARD_GRAVITY: f32 = 9.806_65;
/// Magnetometer resolution in uT per LSB
pub const MAGNETOMETER_UT_PER_LSB: f32 = 0.1;

/// Angular rate source
pub trait Gyroscope {
    type Error;

    /// Angular rate in rad/s, bias already removed
    fn read_angular_rate(&mut self) -> core::result::Result<Vector3<f32>, Self::Error>;
}

/// Specific force source
pub trait Accelerometer {
    type Error;

    /// Specific force in any consistent unit
    fn read_acceleration(&mut self) -> core::result::Result<Vector3<f32>, Self::Error>;
}

/// Magnetic field source
pub trait Magnetometer {
    type Error;

    /// Magnetic field in any consistent unit
    fn read_magnetic_field(&mut self) -> core::result::Result<Vector3<f32>, Self::Error>;
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
    #[default]
    Dps250,
    Dps500,
    Dps1000,
    Dps2000,
}

impl GyroRange {
    /// Sensitivity in deg/s per LSB
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 0.007_812_5,
            Self::Dps500 => 0.015_625,
            Self::Dps1000 => 0.031_25,
            Self::Dps2000 => 0.062_5,
        }
    }

    /// Convert raw counts to rad/s
    pub fn to_rad_per_sec(self, raw: [i16; 3]) -> Vector3<f32> {
        counts(raw) * (self.sensitivity() * DEG_TO_RAD)
    }
}

/// Accelerometer full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    G2,
    #[default]
    G4,
    G8,
}

impl AccelRange {
    /// Resolution in g per LSB (14-bit samples)
    pub const fn g_per_lsb(self) -> f32 {
        match self {
            Self::G2 => 0.000_244,
            Self::G4 => 0.000_488,
            Self::G8 => 0.000_976,
        }
    }

    /// Convert right-justified 14-bit counts to m/s^2
    pub fn to_meters_per_sec2(self, raw: [i16; 3]) -> Vector3<f32> {
        counts(raw) * (self.g_per_lsb() * STANDARD_GRAVITY)
    }

    /// Convert assembled 16-bit output register words to m/s^2
    ///
    /// The sample is left-justified in the register pair, so the two low bits
    /// are dropped with a sign-preserving shift before scaling.
    pub fn register_to_meters_per_sec2(self, words: [i16; 3]) -> Vector3<f32> {
        self.to_meters_per_sec2(words.map(|word| word >> 2))
    }
}

/// Convert raw magnetometer counts to uT
pub fn magnetometer_to_micro_tesla(raw: [i16; 3]) -> Vector3<f32> {
    counts(raw) * MAGNETOMETER_UT_PER_LSB
}

fn counts(raw: [i16; 3]) -> Vector3<f32> {
    Vector3::new(raw[0] as f32, raw[1] as f32, raw[2] as f32)
}

/// A single physical device that measures both specific force and magnetic field
pub trait ComboDevice {
    type Error;

    fn read_acceleration(&mut self) -> core::result::Result<Vector3<f32>, Self::Error>;

    fn read_magnetic_field(&mut self) -> core::result::Result<Vector3<f32>, Self::Error>;
}

/// Owner of a combo device, handing out accelerometer and magnetometer views
///
/// Views borrow the owner, so the device outlives every view and is released
/// when the owner is dropped after the last view.
///
/// # Example
/// ```
/// use mahony_ahrs::sensor::{Accelerometer, ComboDevice, ComboSensor, Magnetometer};
/// use nalgebra::Vector3;
///
/// struct Fixed;
///
/// impl ComboDevice for Fixed {
///     type Error = ();
///     fn read_acceleration(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(0.0, 0.0, 9.8))
///     }
///     fn read_magnetic_field(&mut self) -> Result<Vector3<f32>, ()> {
///         Ok(Vector3::new(20.0, 0.0, -40.0))
///     }
/// }
///
/// let combo = ComboSensor::new(Fixed);
/// let mut accelerometer = combo.accelerometer();
/// let mut magnetometer = combo.magnetometer();
/// assert_eq!(accelerometer.read_acceleration().unwrap().z, 9.8);
/// assert_eq!(magnetometer.read_magnetic_field().unwrap().x, 20.0);
/// ```
#[derive(Debug)]
pub struct ComboSensor<D> {
    device: RefCell<D>,
}

impl<D: ComboDevice> ComboSensor<D> {
    pub fn new(device: D) -> Self {
        Self {
            device: RefCell::new(device),
        }
    }

    pub fn accelerometer(&self) -> AccelerometerView<'_, D> {
        AccelerometerView {
            device: &self.device,
        }
    }

    pub fn magnetometer(&self) -> MagnetometerView<'_, D> {
        MagnetometerView {
            device: &self.device,
        }
    }

    /// Take the device back once no views remain
    pub fn into_inner(self) -> D {
        self.device.into_inner()
    }
}

/// Accelerometer half of a [`ComboSensor`]
#[derive(Debug)]
pub struct AccelerometerView<'a, D> {
    device: &'a RefCell<D>,
}

impl<D: ComboDevice> Accelerometer for AccelerometerView<'_, D> {
    type Error = D::Error;

    fn read_acceleration(&mut self) -> core::result::Result<Vector3<f32>, Self::Error> {
        // Views are used one at a time from a single task, so the borrow never overlaps
        self.device.borrow_mut().read_acceleration()
    }
}

/// Magnetometer half of a [`ComboSensor`]
#[derive(Debug)]
pub struct MagnetometerView<'a, D> {
    device: &'a RefCell<D>,
}

impl<D: ComboDevice> Magnetometer for MagnetometerView<'_, D> {
    type Error = D::Error;

    fn read_magnetic_field(&mut self) -> core::result::Result<Vector3<f32>, Self::Error> {
        self.device.borrow_mut().read_magnetic_field()
    }
}

/// Fatal sensor read failure, carrying the driver's error
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError<G, A> {
    #[error("gyroscope read failed")]
    Gyroscope(G),

    #[error("accelerometer read failed")]
    Accelerometer(A),
}

impl<G, A> From<SampleError<G, A>> for MahonyError {
    fn from(error: SampleError<G, A>) -> Self {
        match error {
            SampleError::Gyroscope(_) => MahonyError::GyroscopeRead,
            SampleError::Accelerometer(_) => MahonyError::AccelerometerRead,
        }
    }
}

/// Reads one sample from each sensor and advances the filter
///
/// The caller paces [`Sampler::sample`] at the filter's sample frequency. A
/// failed magnetometer read is not fatal: the zero-vector sentinel is passed
/// instead and the filter falls back to gravity-only fusion for that period.
pub struct Sampler<G, A, M> {
    gyroscope: G,
    accelerometer: A,
    magnetometer: M,
    filter: Mahony,
}

impl<G, A, M> Sampler<G, A, M>
where
    G: Gyroscope,
    A: Accelerometer,
    M: Magnetometer,
{
    pub fn new(gyroscope: G, accelerometer: A, magnetometer: M, filter: Mahony) -> Self {
        Self {
            gyroscope,
            accelerometer,
            magnetometer,
            filter,
        }
    }

    /// Read all sensors once and update the filter
    ///
    /// A gyroscope or accelerometer failure returns the driver's error and
    /// leaves the filter untouched.
    pub fn sample(
        &mut self,
    ) -> core::result::Result<UpdateStatus, SampleError<G::Error, A::Error>> {
        let gyroscope = self
            .gyroscope
            .read_angular_rate()
            .map_err(SampleError::Gyroscope)?;
        let accelerometer = self
            .accelerometer
            .read_acceleration()
            .map_err(SampleError::Accelerometer)?;
        let magnetometer = match self.magnetometer.read_magnetic_field() {
            Ok(field) => field,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("magnetometer read failed, falling back to gravity-only");
                Vector3::zeros()
            }
        };

        Ok(self.filter.update(gyroscope, accelerometer, magnetometer))
    }

    pub fn filter(&self) -> &Mahony {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Mahony {
        &mut self.filter
    }

    /// Release the sensors and the filter
    pub fn into_parts(self) -> (G, A, M, Mahony) {
        (self.gyroscope, self.accelerometer, self.magnetometer, self.filter)
    }
}
