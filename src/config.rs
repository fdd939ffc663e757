//! Configuration management for the retargeting pipeline

use crate::{
    calibration::BodyScales,
    constants::{
        BLEND_FACTOR_MAX, BLEND_FACTOR_MIN, DEFAULT_BLEND_FACTOR, DEFAULT_CONFIDENCE_DECAY,
        DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_EXPONENTIAL_ALPHA, DEFAULT_KALMAN_MEASUREMENT_NOISE,
        DEFAULT_KALMAN_PROCESS_NOISE, DEFAULT_MIN_LANDMARK_CONFIDENCE, DEFAULT_NECK_SHARE, DEFAULT_ONE_EURO_BETA,
        DEFAULT_ONE_EURO_D_CUTOFF, DEFAULT_ONE_EURO_MIN_CUTOFF,
    },
    filters::{FilterKind, LandmarkFilter},
    skeleton::HumanoidBone,
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Solver and confidence gate settings
    pub retarget: RetargetConfig,

    /// Landmark smoothing settings
    pub smoothing: SmoothingConfig,

    /// Pose blending settings
    pub blend: BlendConfig,

    /// Body proportion scales
    pub body: BodyScales,
}

/// Solver configuration, hot-updatable through `PoseSolver::set_config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    /// Solve upper arms, lower arms and hands
    pub enable_arms: bool,

    /// Solve upper legs, lower legs and feet
    pub enable_legs: bool,

    /// Solve spine and chest
    pub enable_spine: bool,

    /// Solve neck and head
    pub enable_head: bool,

    /// Solve finger phalanges from hand landmarks
    pub enable_fingers: bool,

    /// Drive each avatar side from the same user side (negate x) rather
    /// than exchanging left and right landmarks
    pub mirror_mode: bool,

    /// Maximum rotation angle per bone, in degrees
    pub rotation_limits: BTreeMap<HumanoidBone, f32>,

    /// Frame confidence below which the last pose is held (0.0-1.0)
    pub confidence_threshold: f32,

    /// Confidence multiplier per held frame (0.0-1.0]
    pub confidence_decay: f32,

    /// Landmark confidence below which a landmark counts as missing (0.0-1.0)
    pub min_landmark_confidence: f32,

    /// Share of the head rotation given to the neck (0.0-1.0)
    pub neck_share: f32,
}

/// Landmark smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Filter type (none, kalman, exponential, one_euro) or a full
    /// `kind:param...` description
    pub filter: String,

    /// Exponential filter alpha value
    pub exponential_alpha: f32,

    /// One-Euro minimum cutoff frequency in Hz
    pub one_euro_min_cutoff: f32,

    /// One-Euro speed coefficient
    pub one_euro_beta: f32,

    /// One-Euro derivative cutoff frequency in Hz
    pub one_euro_d_cutoff: f32,

    /// Kalman process noise
    pub kalman_process_noise: f32,

    /// Kalman measurement noise
    pub kalman_measurement_noise: f32,
}

/// Pose blending configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Interpolation rate toward the solved pose (0.01-1.0, 1 = snap)
    pub blend_factor: f32,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            enable_arms: true,
            enable_legs: true,
            enable_spine: true,
            enable_head: true,
            enable_fingers: false,
            mirror_mode: true,
            rotation_limits: BTreeMap::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            confidence_decay: DEFAULT_CONFIDENCE_DECAY,
            min_landmark_confidence: DEFAULT_MIN_LANDMARK_CONFIDENCE,
            neck_share: DEFAULT_NECK_SHARE,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filter: "one_euro".to_string(),
            exponential_alpha: DEFAULT_EXPONENTIAL_ALPHA,
            one_euro_min_cutoff: DEFAULT_ONE_EURO_MIN_CUTOFF,
            one_euro_beta: DEFAULT_ONE_EURO_BETA,
            one_euro_d_cutoff: DEFAULT_ONE_EURO_D_CUTOFF,
            kalman_process_noise: DEFAULT_KALMAN_PROCESS_NOISE,
            kalman_measurement_noise: DEFAULT_KALMAN_MEASUREMENT_NOISE,
        }
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            blend_factor: DEFAULT_BLEND_FACTOR,
        }
    }
}

impl RetargetConfig {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(self.confidence_decay > 0.0 && self.confidence_decay <= 1.0) {
            return Err(Error::ConfigError(
                "Confidence decay must be greater than 0.0 and at most 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_landmark_confidence) {
            return Err(Error::ConfigError(
                "Minimum landmark confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.neck_share) {
            return Err(Error::ConfigError("Neck share must be between 0.0 and 1.0".to_string()));
        }
        for (bone, limit) in &self.rotation_limits {
            if !(limit.is_finite() && *limit > 0.0) {
                return Err(Error::ConfigError(format!(
                    "Rotation limit for {bone} must be a positive number of degrees"
                )));
            }
        }
        Ok(())
    }
}

impl SmoothingConfig {
    /// Resolve the configured filter into a validated [`FilterKind`]
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` for unknown filter names or invalid
    /// parameters.
    pub fn filter_kind(&self) -> Result<FilterKind> {
        let kind = match self.filter.trim().to_lowercase().as_str() {
            "none" | "nofilter" => FilterKind::None,
            "kalman" => FilterKind::Kalman {
                process_noise: self.kalman_process_noise,
                measurement_noise: self.kalman_measurement_noise,
            },
            "exponential" | "ema" => FilterKind::Exponential {
                alpha: self.exponential_alpha,
            },
            "one_euro" | "oneeuro" | "1euro" => FilterKind::OneEuro {
                min_cutoff: self.one_euro_min_cutoff,
                beta: self.one_euro_beta,
                d_cutoff: self.one_euro_d_cutoff,
            },
            _ => return FilterKind::parse(&self.filter),
        };
        kind.validate()?;
        Ok(kind)
    }
}

impl BlendConfig {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` when the blend factor is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(BLEND_FACTOR_MIN..=BLEND_FACTOR_MAX).contains(&self.blend_factor) {
            return Err(Error::ConfigError(format!(
                "Blend factor must be between {BLEND_FACTOR_MIN} and {BLEND_FACTOR_MAX}"
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("Parsing configuration from {}", path.display());

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Filter kind for the landmark smoother
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` if the smoothing section is invalid.
    pub fn filter_kind(&self) -> Result<FilterKind> {
        self.smoothing.filter_kind()
    }

    /// Create one landmark filter from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` if the smoothing section is invalid.
    pub fn create_filter(&self) -> Result<Box<dyn LandmarkFilter>> {
        self.filter_kind()?.build()
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first problem found in any section.
    pub fn validate(&self) -> Result<()> {
        self.retarget.validate()?;
        self.blend.validate()?;
        self.filter_kind()?;
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Mirror Retarget Configuration

# Pose solver and confidence gate
retarget:
  enable_arms: true
  enable_legs: true
  enable_spine: true
  enable_head: true
  enable_fingers: false
  # true: user's left arm drives the avatar's left arm; false: its right arm
  mirror_mode: true
  # Maximum rotation per bone in degrees
  rotation_limits:
    neck: 45.0
    head: 60.0
  confidence_threshold: 0.3
  confidence_decay: 0.95
  min_landmark_confidence: 0.5
  neck_share: 0.3

# Landmark smoothing (none, kalman, exponential, one_euro)
smoothing:
  filter: "one_euro"
  exponential_alpha: 0.5
  one_euro_min_cutoff: 1.0
  one_euro_beta: 0.007
  one_euro_d_cutoff: 1.0
  kalman_process_noise: 0.1
  kalman_measurement_noise: 0.01

# Pose blending (0.01 = very smooth, 1.0 = snap)
blend:
  blend_factor: 0.5

# Body proportions (values are clamped to their valid ranges)
body:
  height: 1.0
  shoulder_width: 1.0
  torso_width: 1.0
  hip_width: 1.0
  arm_length: 1.0
  leg_length: 1.0
  head_size: 1.0
"#;
