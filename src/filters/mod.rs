//! Signal filtering algorithms for smoothing landmark coordinates.
//!
//! Each filter smooths one scalar channel (one axis of one landmark). The
//! [`LandmarkSmoother`](crate::smoother::LandmarkSmoother) holds one instance
//! per channel, so filters only ever see a single monotonic stream.

/// Kalman filter with a constant-velocity model
pub mod kalman;

/// Exponential moving average
pub mod exponential;

/// One-Euro speed-adaptive low-pass filter
pub mod one_euro;

use crate::{
    constants::{
        DEFAULT_EXPONENTIAL_ALPHA, DEFAULT_KALMAN_MEASUREMENT_NOISE, DEFAULT_KALMAN_PROCESS_NOISE,
        DEFAULT_ONE_EURO_BETA, DEFAULT_ONE_EURO_D_CUTOFF, DEFAULT_ONE_EURO_MIN_CUTOFF,
    },
    Error, Result,
};

/// Trait for all landmark filters
pub trait LandmarkFilter: Send + Sync {
    /// Filter one sample taken `dt` seconds after the previous one
    fn apply(&mut self, value: f32, dt: f32) -> f32;

    /// Reset filter state; the next sample passes through unchanged
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl LandmarkFilter for NoFilter {
    fn apply(&mut self, value: f32, _dt: f32) -> f32 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Parsed filter description, cheap to copy into every channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    None,
    Kalman { process_noise: f32, measurement_noise: f32 },
    Exponential { alpha: f32 },
    OneEuro { min_cutoff: f32, beta: f32, d_cutoff: f32 },
}

impl FilterKind {
    /// Parse a description of the form `kind[:p1[:p2[:p3]]]`
    ///
    /// Accepted kinds: `none`, `kalman[:q:r]`, `exponential[:alpha]`,
    /// `one_euro[:min_cutoff[:beta[:d_cutoff]]]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` for unknown kinds, unparsable numbers or
    /// out-of-range parameters.
    pub fn parse(description: &str) -> Result<Self> {
        let mut parts = description.trim().split(':');
        let kind = parts.next().unwrap_or_default().to_lowercase();
        let params = parts
            .map(|p| {
                p.trim()
                    .parse::<f32>()
                    .map_err(|_| Error::FilterError(format!("Invalid filter parameter '{p}' in '{description}'")))
            })
            .collect::<Result<Vec<f32>>>()?;
        let param = |i: usize, default: f32| params.get(i).copied().unwrap_or(default);

        let parsed = match kind.as_str() {
            "none" | "nofilter" => Self::None,
            "kalman" => Self::Kalman {
                process_noise: param(0, DEFAULT_KALMAN_PROCESS_NOISE),
                measurement_noise: param(1, DEFAULT_KALMAN_MEASUREMENT_NOISE),
            },
            "exponential" | "ema" => Self::Exponential {
                alpha: param(0, DEFAULT_EXPONENTIAL_ALPHA),
            },
            "one_euro" | "oneeuro" | "1euro" => Self::OneEuro {
                min_cutoff: param(0, DEFAULT_ONE_EURO_MIN_CUTOFF),
                beta: param(1, DEFAULT_ONE_EURO_BETA),
                d_cutoff: param(2, DEFAULT_ONE_EURO_D_CUTOFF),
            },
            _ => return Err(Error::FilterError(format!("Unknown filter type: {description}"))),
        };

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::Kalman {
                process_noise,
                measurement_noise,
            } => {
                if !(process_noise.is_finite() && process_noise > 0.0) {
                    return Err(Error::FilterError("Process noise must be positive".to_string()));
                }
                if !(measurement_noise.is_finite() && measurement_noise > 0.0) {
                    return Err(Error::FilterError("Measurement noise must be positive".to_string()));
                }
                Ok(())
            }
            Self::Exponential { alpha } => {
                if alpha > 0.0 && alpha <= 1.0 {
                    Ok(())
                } else {
                    Err(Error::FilterError("Alpha must be in (0, 1]".to_string()))
                }
            }
            Self::OneEuro {
                min_cutoff,
                beta,
                d_cutoff,
            } => {
                if !(min_cutoff.is_finite() && min_cutoff > 0.0) {
                    return Err(Error::FilterError("Minimum cutoff must be positive".to_string()));
                }
                if !(beta.is_finite() && beta >= 0.0) {
                    return Err(Error::FilterError("Beta must be non-negative".to_string()));
                }
                if !(d_cutoff.is_finite() && d_cutoff > 0.0) {
                    return Err(Error::FilterError("Derivative cutoff must be positive".to_string()));
                }
                Ok(())
            }
        }
    }

    /// Instantiate a fresh filter of this kind
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` when a parameter is out of range.
    pub fn build(&self) -> Result<Box<dyn LandmarkFilter>> {
        self.validate()?;
        Ok(self.instantiate())
    }

    /// Build without checking; only for kinds that already passed `validate`
    pub(crate) fn instantiate(&self) -> Box<dyn LandmarkFilter> {
        match *self {
            Self::None => Box::new(NoFilter),
            Self::Kalman {
                process_noise,
                measurement_noise,
            } => Box::new(kalman::KalmanFilter::with_noise(process_noise, measurement_noise)),
            Self::Exponential { alpha } => Box::new(exponential::ExponentialFilter::new(alpha)),
            Self::OneEuro {
                min_cutoff,
                beta,
                d_cutoff,
            } => Box::new(one_euro::OneEuroFilter::new(min_cutoff, beta, d_cutoff)),
        }
    }
}

impl Default for FilterKind {
    fn default() -> Self {
        Self::OneEuro {
            min_cutoff: DEFAULT_ONE_EURO_MIN_CUTOFF,
            beta: DEFAULT_ONE_EURO_BETA,
            d_cutoff: DEFAULT_ONE_EURO_D_CUTOFF,
        }
    }
}

/// Create a landmark filter by description (see [`FilterKind::parse`])
///
/// # Errors
///
/// Returns `Error::FilterError` if the description is invalid.
pub fn create_filter(description: &str) -> Result<Box<dyn LandmarkFilter>> {
    FilterKind::parse(description)?.build()
}
