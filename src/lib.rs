//! Pose retargeting library for driving a humanoid avatar from body landmarks.
//!
//! This library turns per-frame 3D body landmark detections into bone-local
//! rotations for a fixed humanoid skeleton, using:
//! - Per-landmark temporal filters (Kalman, exponential, One-Euro)
//! - Analytic solving: orthonormal bases for the torso, shortest-arc rotations
//!   for limbs and a look-at rotation for the head
//! - Confidence gating and pose blending for graceful degradation
//! - Body-proportion calibration of the avatar's rest pose
//!
//! The retargeting pipeline consists of:
//! 1. Landmark smoothing
//! 2. Conversion from tracker space to avatar space
//! 3. Pose solving
//! 4. Confidence gating (hold and decay the last pose on bad frames)
//! 5. Blending toward the solved pose
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use mirror_retarget::{config::Config, landmarks::TrackingFrame, pipeline::RetargetPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("retarget.yaml")?;
//! let mut pipeline = RetargetPipeline::new(&config)?;
//!
//! // One frame from the body tracker
//! let json = std::fs::read_to_string("frame.json")?;
//! let frame = TrackingFrame::from_json(&json)?;
//!
//! if let Some(pose) = pipeline.process(&frame) {
//!     for rotation in pose.rotations() {
//!         println!("{}: {:?}", rotation.bone, rotation.rotation);
//!     }
//! }
//!
//! // Tracking lost: put the avatar back in its rest pose
//! let rest = pipeline.reset();
//! assert_eq!(rest.len(), 52);
//! # Ok(())
//! # }
//! ```
//!
//! ## Using Filters
//!
//! ```no_run
//! use mirror_retarget::filters::{LandmarkFilter, create_filter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a One-Euro filter with min cutoff 1 Hz and beta 0.01
//! let mut filter = create_filter("one_euro:1.0:0.01")?;
//!
//! // Filter one coordinate stream sampled at 30 Hz
//! let x = 0.42;
//! let filtered = filter.apply(x, 1.0 / 30.0);
//! println!("Filtered x: {filtered:.3}");
//!
//! // Reset filter if needed
//! filter.reset();
//! # Ok(())
//! # }
//! ```
//!
//! ## Body Calibration
//!
//! ```no_run
//! use mirror_retarget::calibration::{BodyCalibrator, BodyScales, BoneTransform, SkeletonRestState};
//! use mirror_retarget::skeleton::BoneAliasTable;
//! use nalgebra::Vector3;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Rest transforms as exported by the model loader
//! let rig = vec![
//!     ("mixamorig:Hips", BoneTransform::new(Vector3::new(0.0, 1.0, 0.0))),
//!     ("mixamorig:LeftArm", BoneTransform::new(Vector3::new(-0.1, 0.0, 0.0))),
//!     ("mixamorig:LeftForeArm", BoneTransform::new(Vector3::new(-0.28, 0.0, 0.0))),
//! ];
//! let rest = SkeletonRestState::from_rig(rig, &BoneAliasTable::new())?;
//! let mut calibrator = BodyCalibrator::new(rest);
//!
//! let scales = BodyScales::identity().with_height(1.05).with_arm_length(0.95);
//! let transforms = calibrator.apply(&scales);
//! println!("{} bones calibrated", transforms.len());
//! # Ok(())
//! # }
//! ```

/// Landmark and tracking frame types
pub mod landmarks;

/// Canonical humanoid skeleton and rig name resolution
pub mod skeleton;

/// Rotation math helpers
pub mod math;

/// Signal filtering algorithms for smoothing landmark coordinates
pub mod filters;

/// Per-landmark temporal smoothing
pub mod smoother;

/// Tracker space to avatar space conversion
pub mod transform;

/// Solved avatar poses
pub mod pose;

/// Analytic pose solver
pub mod solver;

/// Confidence gating of solved poses
pub mod gate;

/// Temporal pose blending
pub mod blender;

/// Body-proportion calibration
pub mod calibration;

/// End-to-end retargeting pipeline
pub mod pipeline;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
