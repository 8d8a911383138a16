//! Error type for the Mahony filter and its sensor boundary

use thiserror::Error;

/// Errors surfaced by filter construction and sampling
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Sample frequency was zero, negative, NaN or infinite
    #[error("invalid sample frequency: {0} Hz")]
    InvalidSampleFrequency(f32),

    /// Proportional or integral gain was NaN or infinite
    #[error("invalid feedback gain: {0}")]
    InvalidGain(f32),

    #[error("gyroscope read failed")]
    GyroscopeRead,

    #[error("accelerometer read failed")]
    AccelerometerRead,
}

/// Result type for filter operations
pub type Result<T> = core::result::Result<T, Error>;
