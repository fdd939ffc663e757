use super::LandmarkFilter;
use crate::constants::{DEFAULT_FRAME_DT, DEFAULT_KALMAN_MEASUREMENT_NOISE, DEFAULT_KALMAN_PROCESS_NOISE};
use nalgebra::{Matrix2, RowVector2, Vector2};

/// Initial velocity variance after the first sample
const INITIAL_VELOCITY_VARIANCE: f32 = 1.0;

/// Kalman filter for one landmark coordinate
pub struct KalmanFilter {
    // State: [position, velocity]
    state: Vector2<f32>,
    // State covariance
    covariance: Matrix2<f32>,
    // Process noise intensity (white acceleration)
    process_noise: f32,
    // Measurement noise variance
    measurement_noise: f32,
    // Measurement matrix (we only measure position)
    measurement: RowVector2<f32>,
    initialized: bool,
}

impl KalmanFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_noise(DEFAULT_KALMAN_PROCESS_NOISE, DEFAULT_KALMAN_MEASUREMENT_NOISE)
    }

    /// Create a filter with explicit process and measurement noise
    ///
    /// # Panics
    ///
    /// Panics if either noise value is not positive
    #[must_use]
    pub fn with_noise(process_noise: f32, measurement_noise: f32) -> Self {
        assert!(process_noise > 0.0, "Process noise must be positive");
        assert!(measurement_noise > 0.0, "Measurement noise must be positive");
        Self {
            state: Vector2::zeros(),
            covariance: Matrix2::identity(),
            process_noise,
            measurement_noise,
            measurement: RowVector2::new(1.0, 0.0),
            initialized: false,
        }
    }

    /// Current velocity estimate in units per second
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.state[1]
    }

    #[rustfmt::skip]
    fn predict(&mut self, dt: f32) {
        let transition = Matrix2::new(
            1.0, dt,
            0.0, 1.0,
        );

        let q = self.process_noise;
        let process_noise = Matrix2::new(
            q * dt.powi(4) / 4.0, q * dt.powi(3) / 2.0,
            q * dt.powi(3) / 2.0, q * dt.powi(2),
        );

        self.state = transition * self.state;
        self.covariance = transition * self.covariance * transition.transpose() + process_noise;
    }

    fn update(&mut self, measurement: f32) {
        let innovation = measurement - (self.measurement * self.state)[0];

        // Scalar innovation covariance, so no matrix inverse is needed
        let innovation_cov = (self.measurement * self.covariance * self.measurement.transpose())[0] + self.measurement_noise;
        let gain = self.covariance * self.measurement.transpose() / innovation_cov;

        self.state += gain * innovation;
        self.covariance = (Matrix2::identity() - gain * self.measurement) * self.covariance;
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkFilter for KalmanFilter {
    fn apply(&mut self, value: f32, dt: f32) -> f32 {
        if !value.is_finite() {
            // Keep the estimate rather than poisoning the covariance
            return if self.initialized { self.state[0] } else { value };
        }

        if !self.initialized {
            self.state = Vector2::new(value, 0.0);
            self.covariance = Matrix2::new(
                self.measurement_noise, 0.0,
                0.0, INITIAL_VELOCITY_VARIANCE,
            );
            self.initialized = true;
            return value;
        }

        let dt = if dt.is_finite() && dt > 0.0 { dt } else { DEFAULT_FRAME_DT };
        self.predict(dt);
        self.update(value);

        self.state[0]
    }

    fn reset(&mut self) {
        self.state = Vector2::zeros();
        self.covariance = Matrix2::identity();
        self.initialized = false;
    }

    fn name(&self) -> &str {
        "KalmanFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn test_kalman_filter() {
        let mut filter = KalmanFilter::new();

        // First measurement initializes the filter
        let p1 = filter.apply(10.0, DT);
        assert_eq!(p1, 10.0);

        // Subsequent measurements should be smoothed
        let p2 = filter.apply(11.0, DT);
        assert!(p2 > 10.0 && p2 < 11.0, "got {p2}");
    }

    #[test]
    fn test_kalman_converges_to_constant() {
        let mut filter = KalmanFilter::new();
        filter.apply(0.0, DT);
        let mut last = 0.0;
        for _ in 0..200 {
            last = filter.apply(5.0, DT);
        }
        assert!((last - 5.0).abs() < 1e-2, "got {last}");
    }

    #[test]
    fn test_kalman_tracks_velocity() {
        let mut filter = KalmanFilter::new();
        for i in 0..120 {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 * DT;
            filter.apply(2.0 * t, DT);
        }
        assert!((filter.velocity() - 2.0).abs() < 0.2, "velocity {}", filter.velocity());
    }

    #[test]
    fn test_kalman_ignores_non_finite() {
        let mut filter = KalmanFilter::new();
        filter.apply(1.0, DT);
        let out = filter.apply(f32::NAN, DT);
        assert_eq!(out, 1.0);
        let out = filter.apply(1.0, DT);
        assert!(out.is_finite());
    }

    #[test]
    fn test_kalman_reset() {
        let mut filter = KalmanFilter::new();
        filter.apply(1.0, DT);
        filter.apply(2.0, DT);
        filter.reset();
        assert_eq!(filter.apply(42.0, DT), 42.0);
    }
}
