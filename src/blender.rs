//! Temporal blending of solved poses.

use crate::constants::{BLEND_FACTOR_MAX, BLEND_FACTOR_MIN, DEFAULT_BLEND_FACTOR};
use crate::math::slerp;
use crate::pose::{AvatarPose, BoneRotation};
use crate::skeleton::{BoneMap, HumanoidBone};
use log::{debug, warn};
use nalgebra::{UnitQuaternion, Vector3};

/// Eases the applied pose toward each new solved target
///
/// Each bone moves by `blend_factor × confidence` of the remaining arc per
/// update, so low-confidence targets pull the avatar less. A factor of 1
/// snaps to the target regardless of confidence.
pub struct PoseBlender {
    blend_factor: f32,
    current: BoneMap<Option<UnitQuaternion<f32>>>,
    root: Option<Vector3<f32>>,
    last_timestamp: f64,
}

impl PoseBlender {
    /// Create a blender; the factor is clamped to [0.01, 1]
    #[must_use]
    pub fn new(blend_factor: f32) -> Self {
        Self {
            blend_factor: clamp_blend_factor(blend_factor),
            current: BoneMap::default(),
            root: None,
            last_timestamp: 0.0,
        }
    }

    #[must_use]
    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Change the blend factor; clamped to [0.01, 1]
    pub fn set_blend_factor(&mut self, blend_factor: f32) {
        self.blend_factor = clamp_blend_factor(blend_factor);
    }

    /// Blend toward `target` and return the applied pose
    pub fn update(&mut self, target: &AvatarPose) -> AvatarPose {
        let t = if self.blend_factor >= BLEND_FACTOR_MAX {
            1.0
        } else {
            (self.blend_factor * target.confidence).clamp(0.0, 1.0)
        };

        for rotation in target.rotations() {
            let slot = &mut self.current[rotation.bone];
            let blended = match *slot {
                Some(current) => slerp(&current, &rotation.rotation, t),
                None => rotation.rotation,
            };
            *slot = Some(blended);
        }

        let root = match self.root {
            Some(current) if t < 1.0 => current.lerp(&target.root_position, t),
            _ => target.root_position,
        };
        self.root = Some(root);
        self.last_timestamp = target.timestamp;

        let mut applied = AvatarPose::empty(target.timestamp, target.confidence);
        applied.root_position = root;
        for (bone, rotation) in self.current.present() {
            applied.bone_rotations.insert(bone, BoneRotation::new(bone, *rotation));
        }
        applied
    }

    /// Currently applied rotation of a bone
    #[must_use]
    pub fn current(&self, bone: HumanoidBone) -> Option<UnitQuaternion<f32>> {
        self.current[bone]
    }

    /// Forget all blend state and return the rest pose to apply
    ///
    /// Safe to call at any time, any number of times.
    pub fn reset_pose(&mut self) -> AvatarPose {
        if !self.current.is_empty() {
            debug!("Resetting blended pose to rest");
        }
        self.current.clear();
        self.root = None;
        AvatarPose::identity(self.last_timestamp)
    }
}

impl Default for PoseBlender {
    fn default() -> Self {
        Self::new(DEFAULT_BLEND_FACTOR)
    }
}

fn clamp_blend_factor(blend_factor: f32) -> f32 {
    if !blend_factor.is_finite() {
        warn!("Ignoring non-finite blend factor, using {DEFAULT_BLEND_FACTOR}");
        return DEFAULT_BLEND_FACTOR;
    }
    blend_factor.clamp(BLEND_FACTOR_MIN, BLEND_FACTOR_MAX)
}
