use super::LandmarkFilter;

/// Exponential smoothing filter
///
/// Frame-rate independent only to the extent the tracker runs at a steady
/// rate; `dt` is ignored.
pub struct ExponentialFilter {
    alpha: f32,
    last: Option<f32>,
}

impl ExponentialFilter {
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { alpha, last: None }
    }
}

impl LandmarkFilter for ExponentialFilter {
    fn apply(&mut self, value: f32, _dt: f32) -> f32 {
        let filtered = match self.last {
            Some(last) => self.alpha * value + (1.0 - self.alpha) * last,
            None => value,
        };

        self.last = Some(filtered);
        filtered
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}
