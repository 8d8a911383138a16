#![no_std]

//! Mahony AHRS - quaternion attitude estimation for small embedded targets
//!
//! A complementary filter that fuses gyroscope, accelerometer and
//! magnetometer readings into a unit quaternion. The angle error between the
//! measured and estimated directions of gravity and the magnetic field feeds
//! back onto the gyroscope rate through a proportional term and an integral
//! term that tracks gyroscope bias.
//!
//! # Features
//!
//! - MARG fusion (magnetometer, angular rate, gravity)
//! - Gravity-only fallback when the magnetometer reading is the zero vector
//! - Integral bias compensation with anti-windup when disabled
//! - Bit-level fast reciprocal square root for normalization
//! - `#![no_std]`, no allocation per update
//! - Optional `defmt` logging
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use mahony_ahrs::Mahony;
//!
//! let mut mahony = Mahony::new(100.0)?; // 100 Hz
//!
//! // Sensor readings
//! let gyroscope = Vector3::new(0.01, -0.02, 0.005);   // rad/s
//! let accelerometer = Vector3::new(0.0, 0.0, 9.81);   // any unit
//! let magnetometer = Vector3::new(22.0, 0.0, -40.0);  // any unit
//!
//! // Update once per sample period
//! let status = mahony.update(gyroscope, accelerometer, magnetometer);
//! assert!(!status.magnetometer_unavailable());
//!
//! // Read orientation
//! let angles = mahony.euler();
//! let (_roll, _pitch, _yaw) = (angles.roll, angles.pitch, angles.yaw);
//! # Ok::<(), mahony_ahrs::Error>(())
//! ```

#[cfg(test)]
extern crate std;

mod error;
mod euler;
mod mahony;
mod math;
pub mod sensor;
mod types;

// Re-export all public types and functions
pub use error::{Error, Result};
pub use euler::EulerAngles;
pub use mahony::Mahony;
pub use math::{DEG_TO_RAD, QuaternionExt, RAD_TO_DEG, Vector3Ext, fast_inverse_sqrt};
pub use types::*;
