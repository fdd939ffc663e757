//! Constants used throughout the library

/// Number of landmarks in the full-body tracker layout
pub const NUM_POSE_LANDMARKS: usize = 33;

/// Number of landmarks per tracked hand
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Frame confidence below which the solver holds the last pose
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Multiplicative confidence decay per skipped frame
pub const DEFAULT_CONFIDENCE_DECAY: f32 = 0.95;

/// Per-landmark confidence below which a landmark counts as missing
pub const DEFAULT_MIN_LANDMARK_CONFIDENCE: f32 = 0.5;

/// Share of the head rotation handed to the neck
pub const DEFAULT_NECK_SHARE: f32 = 0.3;

/// Default blend factor toward the solved target
pub const DEFAULT_BLEND_FACTOR: f32 = 0.5;

/// Blend factor bounds
pub const BLEND_FACTOR_MIN: f32 = 0.01;
pub const BLEND_FACTOR_MAX: f32 = 1.0;

/// Default filter parameters
pub const DEFAULT_EXPONENTIAL_ALPHA: f32 = 0.5;
pub const DEFAULT_ONE_EURO_MIN_CUTOFF: f32 = 1.0;
pub const DEFAULT_ONE_EURO_BETA: f32 = 0.007;
pub const DEFAULT_ONE_EURO_D_CUTOFF: f32 = 1.0;
pub const DEFAULT_KALMAN_PROCESS_NOISE: f32 = 0.1;
pub const DEFAULT_KALMAN_MEASUREMENT_NOISE: f32 = 0.01;

/// Frame period assumed when two samples share a timestamp
pub const DEFAULT_FRAME_DT: f32 = 1.0 / 30.0;

/// Below this squared length a direction vector is treated as degenerate
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-12;

/// Dot product under which two unit vectors count as anti-parallel
pub const ANTIPARALLEL_DOT: f32 = -1.0 + 1e-5;

/// Reference adult proportions in meters, used to turn measurements into scales
pub const REFERENCE_HEIGHT: f32 = 1.70;
pub const REFERENCE_SHOULDER_WIDTH: f32 = 0.36;
pub const REFERENCE_TORSO_WIDTH: f32 = 0.29;
pub const REFERENCE_HIP_WIDTH: f32 = 0.22;
pub const REFERENCE_ARM_LENGTH: f32 = 0.55;
pub const REFERENCE_LEG_LENGTH: f32 = 0.85;
pub const REFERENCE_HEAD_WIDTH: f32 = 0.15;
