use super::LandmarkFilter;
use crate::constants::DEFAULT_FRAME_DT;
use std::f32::consts::PI;

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * PI * cutoff * te;
    r / (r + 1.0)
}

/// One-Euro filter: a low-pass filter whose cutoff rises with signal speed
///
/// Slow movement is smoothed at `min_cutoff` Hz; fast movement raises the
/// cutoff by `beta` per unit/s so the avatar does not lag behind.
pub struct OneEuroFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    prev_value: Option<f32>,
    prev_filtered: Option<f32>,
    prev_derivative: f32,
}

impl OneEuroFilter {
    /// # Panics
    ///
    /// Panics if either cutoff is not positive or beta is negative
    #[must_use]
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        assert!(min_cutoff > 0.0, "Minimum cutoff must be positive");
        assert!(beta >= 0.0, "Beta must be non-negative");
        assert!(d_cutoff > 0.0, "Derivative cutoff must be positive");
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            prev_value: None,
            prev_filtered: None,
            prev_derivative: 0.0,
        }
    }

    /// Cutoff frequency that would apply at the current filtered speed
    #[must_use]
    pub fn current_cutoff(&self) -> f32 {
        self.min_cutoff + self.beta * self.prev_derivative.abs()
    }
}

impl LandmarkFilter for OneEuroFilter {
    fn apply(&mut self, value: f32, dt: f32) -> f32 {
        let (Some(prev_value), Some(prev_filtered)) = (self.prev_value, self.prev_filtered) else {
            self.prev_value = Some(value);
            self.prev_filtered = Some(value);
            return value;
        };

        let dt = if dt.is_finite() && dt > 0.0 { dt } else { DEFAULT_FRAME_DT };

        let dx = (value - prev_value) / dt;
        let a_d = smoothing_factor(dt, self.d_cutoff);
        let edx = a_d * dx + (1.0 - a_d) * self.prev_derivative;

        let cutoff = self.min_cutoff + self.beta * edx.abs();
        let a = smoothing_factor(dt, cutoff);
        let filtered = a * value + (1.0 - a) * prev_filtered;

        self.prev_value = Some(value);
        self.prev_filtered = Some(filtered);
        self.prev_derivative = edx;
        filtered
    }

    fn reset(&mut self) {
        self.prev_value = None;
        self.prev_filtered = None;
        self.prev_derivative = 0.0;
    }

    fn name(&self) -> &str {
        "OneEuroFilter"
    }
}
