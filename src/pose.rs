//! Solved avatar poses.

use crate::math::normalize_rotation;
use crate::skeleton::{BoneMap, HumanoidBone};
use nalgebra::{UnitQuaternion, Vector3};

/// Local rotation of one bone relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneRotation {
    pub bone: HumanoidBone,
    pub rotation: UnitQuaternion<f32>,
}

impl BoneRotation {
    /// Create a rotation, re-normalizing the quaternion
    #[must_use]
    pub fn new(bone: HumanoidBone, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            bone,
            rotation: normalize_rotation(rotation.into_inner()),
        }
    }

    /// Rest orientation
    #[must_use]
    pub fn identity(bone: HumanoidBone) -> Self {
        Self {
            bone,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Inverse rotation of the same bone
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::new(self.bone, self.rotation.inverse())
    }

    /// Apply `other` after this rotation
    #[must_use]
    pub fn then(&self, other: &UnitQuaternion<f32>) -> Self {
        Self::new(self.bone, self.rotation * other)
    }
}

/// One frame of avatar pose
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPose {
    /// Hip center in avatar space
    pub root_position: Vector3<f32>,
    /// Bone-local rotations; bones that could not be solved are absent
    pub bone_rotations: BoneMap<Option<BoneRotation>>,
    /// Milliseconds, copied from the source frame
    pub timestamp: f64,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl AvatarPose {
    /// Pose with no bone entries
    #[must_use]
    pub fn empty(timestamp: f64, confidence: f32) -> Self {
        Self {
            root_position: Vector3::zeros(),
            bone_rotations: BoneMap::default(),
            timestamp,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Rest (T-)pose: every bone at identity, root at the origin
    ///
    /// Carries no tracking confidence.
    #[must_use]
    pub fn identity(timestamp: f64) -> Self {
        Self {
            root_position: Vector3::zeros(),
            bone_rotations: BoneMap::from_fn(|bone| Some(BoneRotation::identity(bone))),
            timestamp,
            confidence: 0.0,
        }
    }

    /// Store a bone rotation (re-normalized)
    pub fn set_rotation(&mut self, bone: HumanoidBone, rotation: UnitQuaternion<f32>) {
        self.bone_rotations.insert(bone, BoneRotation::new(bone, rotation));
    }

    /// Local rotation of a bone, if solved
    #[must_use]
    pub fn rotation(&self, bone: HumanoidBone) -> Option<UnitQuaternion<f32>> {
        self.bone_rotations.get(bone).map(|r| r.rotation)
    }

    /// Solved bones with their rotations
    pub fn rotations(&self) -> impl Iterator<Item = &BoneRotation> {
        self.bone_rotations.present().map(|(_, rotation)| rotation)
    }

    /// Number of solved bones
    #[must_use]
    pub fn len(&self) -> usize {
        self.bone_rotations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bone_rotations.is_empty()
    }
}
