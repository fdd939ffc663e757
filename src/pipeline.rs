//! End-to-end retargeting for one avatar.

use crate::{
    blender::PoseBlender,
    calibration::{BodyCalibrator, BodyScales, BoneTransform, SkeletonRestState},
    config::{Config, RetargetConfig},
    landmarks::TrackingFrame,
    pose::AvatarPose,
    skeleton::BoneMap,
    smoother::LandmarkSmoother,
    solver::{PoseSolver, RestPose},
    transform::transform_frame,
    Result,
};
use log::{debug, info};

/// Runs smoothing, coordinate transform, solving, gating and blending
pub struct RetargetPipeline {
    smoother: LandmarkSmoother,
    solver: PoseSolver,
    blender: PoseBlender,
    body: BodyScales,
    calibrator: Option<BodyCalibrator>,
    frames: u64,
}

impl RetargetPipeline {
    /// Build a pipeline from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let kind = config.filter_kind()?;
        info!(
            "Retarget pipeline: filter {kind:?}, blend factor {}, mirror {}",
            config.blend.blend_factor, config.retarget.mirror_mode
        );

        Ok(Self {
            smoother: LandmarkSmoother::new(kind)?,
            solver: PoseSolver::new(config.retarget.clone()),
            blender: PoseBlender::new(config.blend.blend_factor),
            body: config.body,
            calibrator: None,
            frames: 0,
        })
    }

    /// Process one tracker-space frame
    ///
    /// Returns the pose to apply, or `None` until the first confident frame.
    pub fn process(&mut self, frame: &TrackingFrame) -> Option<AvatarPose> {
        self.frames += 1;
        let smoothed = self.smoother.smooth_frame(frame);
        let avatar_space = transform_frame(&smoothed, self.solver.config().mirror_mode);
        let Some(target) = self.solver.solve(&avatar_space) else {
            debug!("Frame {} at {} ms: no pose yet", self.frames, frame.timestamp);
            return None;
        };
        Some(self.blender.update(&target))
    }

    /// Drop all temporal state and return the rest pose to apply
    pub fn reset(&mut self) -> AvatarPose {
        info!("Resetting retarget pipeline after {} frames", self.frames);
        self.smoother.reset();
        self.solver.reset();
        self.frames = 0;
        self.blender.reset_pose()
    }

    /// Hot-update the solver configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid; the
    /// previous configuration stays in effect.
    pub fn set_retarget_config(&mut self, config: RetargetConfig) -> Result<()> {
        config.validate()?;
        self.solver.set_config(config);
        Ok(())
    }

    pub fn set_blend_factor(&mut self, blend_factor: f32) {
        self.blender.set_blend_factor(blend_factor);
    }

    pub fn set_rest_pose(&mut self, rest: RestPose) {
        self.solver.set_rest_pose(rest);
    }

    /// Retarget onto a loaded rig
    ///
    /// Rest directions are taken from the rig and its rest transforms are
    /// calibrated with the current body scales. Returns the refreshed
    /// transforms for the renderer.
    pub fn load_rig(&mut self, rest: SkeletonRestState) -> &BoneMap<Option<BoneTransform>> {
        debug!("Retargeting onto rig with {} bones", rest.transforms().len());
        self.solver.set_rest_pose(RestPose::from_skeleton(&rest));
        let calibrator = self.calibrator.insert(BodyCalibrator::new(rest));
        calibrator.apply(&self.body)
    }

    /// Change the user's body proportions
    ///
    /// Returns the refreshed rest transforms when a rig is loaded.
    pub fn set_body_scales(&mut self, scales: BodyScales) -> Option<&BoneMap<Option<BoneTransform>>> {
        self.body = scales;
        self.calibrator.as_mut().map(|calibrator| calibrator.apply(&scales))
    }

    /// Body scales in effect
    #[must_use]
    pub fn body_scales(&self) -> &BodyScales {
        &self.body
    }

    /// Calibrated rest transforms of the loaded rig
    #[must_use]
    pub fn rest_transforms(&self) -> Option<&BoneMap<Option<BoneTransform>>> {
        self.calibrator.as_ref().map(BodyCalibrator::current)
    }

    #[must_use]
    pub fn solver(&self) -> &PoseSolver {
        &self.solver
    }

    /// Number of frames processed since creation or the last reset
    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }
}
