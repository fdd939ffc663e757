//! Tests for filter parameter validation

use mirror_retarget::{
    filters::{
        create_filter, exponential::ExponentialFilter, kalman::KalmanFilter, one_euro::OneEuroFilter, FilterKind,
    },
    Error,
};

#[test]
#[should_panic(expected = "Alpha must be in (0, 1]")]
fn test_exponential_zero_alpha() {
    let _ = ExponentialFilter::new(0.0);
}

#[test]
#[should_panic(expected = "Alpha must be in (0, 1]")]
fn test_exponential_too_large_alpha() {
    let _ = ExponentialFilter::new(1.5);
}

#[test]
#[should_panic(expected = "Process noise must be positive")]
fn test_kalman_zero_process_noise() {
    let _ = KalmanFilter::with_noise(0.0, 0.01);
}

#[test]
#[should_panic(expected = "Measurement noise must be positive")]
fn test_kalman_negative_measurement_noise() {
    let _ = KalmanFilter::with_noise(0.1, -0.01);
}

#[test]
#[should_panic(expected = "Minimum cutoff must be positive")]
fn test_one_euro_zero_min_cutoff() {
    let _ = OneEuroFilter::new(0.0, 0.007, 1.0);
}

#[test]
#[should_panic(expected = "Beta must be non-negative")]
fn test_one_euro_negative_beta() {
    let _ = OneEuroFilter::new(1.0, -0.5, 1.0);
}

#[test]
#[should_panic(expected = "Derivative cutoff must be positive")]
fn test_one_euro_zero_derivative_cutoff() {
    let _ = OneEuroFilter::new(1.0, 0.007, 0.0);
}

#[test]
fn test_create_filter_validation() {
    // Parsing reports bad parameters as errors instead of panicking
    let cases = [
        ("exponential:0", "Alpha"),
        ("exponential:1.5", "Alpha"),
        ("kalman:0:0.01", "Process noise"),
        ("kalman:0.1:0", "Measurement noise"),
        ("one_euro:0", "Minimum cutoff"),
        ("one_euro:1.0:-1", "Beta"),
        ("one_euro:1.0:0.0:-2", "Derivative cutoff"),
        ("one_euro:nan", "Minimum cutoff"),
        ("one_euro:abc", "Invalid filter parameter"),
        ("butterworth", "Unknown filter type"),
        ("", "Unknown filter type"),
    ];

    for (description, expected) in cases {
        match create_filter(description) {
            Err(Error::FilterError(msg)) => {
                assert!(msg.contains(expected), "'{description}': expected '{expected}' in '{msg}'");
            }
            Err(e) => panic!("'{description}': expected FilterError, got {e}"),
            Ok(filter) => panic!("'{description}': expected an error, got {}", filter.name()),
        }
    }
}

#[test]
fn test_valid_filter_descriptions() {
    let cases = [
        ("none", "NoFilter"),
        ("NoFilter", "NoFilter"),
        ("kalman", "KalmanFilter"),
        ("kalman:0.5:0.05", "KalmanFilter"),
        ("exponential", "ExponentialFilter"),
        ("ema:1.0", "ExponentialFilter"),
        ("one_euro", "OneEuroFilter"),
        ("oneeuro:2.0:0.1", "OneEuroFilter"),
        ("1euro:1.0:0.0:1.0", "OneEuroFilter"),
        (" One_Euro ", "OneEuroFilter"),
    ];

    for (description, name) in cases {
        let filter = create_filter(description).unwrap_or_else(|e| panic!("'{description}' failed: {e}"));
        assert_eq!(filter.name(), name, "wrong filter for '{description}'");
    }
}

#[test]
fn test_filter_kind_defaults() {
    assert_eq!(
        FilterKind::parse("one_euro").unwrap(),
        FilterKind::OneEuro {
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
        }
    );
    assert_eq!(FilterKind::parse("exponential").unwrap(), FilterKind::Exponential { alpha: 0.5 });
    assert_eq!(
        FilterKind::parse("kalman:0.2").unwrap(),
        FilterKind::Kalman {
            process_noise: 0.2,
            measurement_noise: 0.01,
        }
    );
    assert_eq!(FilterKind::default(), FilterKind::parse("one_euro").unwrap());
}
