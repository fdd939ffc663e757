//! Body-proportion calibration.
//!
//! A rig's rest transforms are captured once at model load. Every call to
//! [`BodyCalibrator::apply`] starts again from those originals, so repeated
//! calibration never compounds and all-1.0 scales restore the rig exactly.

use crate::{
    constants::{
        DEFAULT_MIN_LANDMARK_CONFIDENCE, REFERENCE_ARM_LENGTH, REFERENCE_HEAD_WIDTH, REFERENCE_HEIGHT,
        REFERENCE_HIP_WIDTH, REFERENCE_LEG_LENGTH, REFERENCE_SHOULDER_WIDTH, REFERENCE_TORSO_WIDTH,
    },
    landmarks::{PoseLandmark, Side, TrackingFrame},
    skeleton::{BoneAliasTable, BoneMap, HumanoidBone},
    Error, Result,
};
use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Nose height as a fraction of standing height for an adult
const NOSE_HEIGHT_RATIO: f32 = 0.93;

const HEIGHT_RANGE: (f32, f32) = (0.8, 1.2);
const WIDTH_RANGE: (f32, f32) = (0.8, 1.3);
const LENGTH_RANGE: (f32, f32) = (0.9, 1.1);

fn clamp_scale(name: &str, value: f32, (min, max): (f32, f32)) -> f32 {
    if !value.is_finite() {
        debug!("Ignoring non-finite {name} scale");
        return 1.0;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        debug!("Clamped {name} scale {value} to {clamped}");
    }
    clamped
}

/// Rest-pose transform of one bone, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub offset: Vector3<f32>,
    #[serde(default = "unit_scale")]
    pub scale: Vector3<f32>,
}

fn unit_scale() -> Vector3<f32> {
    Vector3::repeat(1.0)
}

impl BoneTransform {
    #[must_use]
    pub fn new(offset: Vector3<f32>) -> Self {
        Self {
            offset,
            scale: unit_scale(),
        }
    }
}

/// Serialized form of [`BodyScales`]; every value is clamped on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ScaleValues {
    height: f32,
    shoulder_width: f32,
    torso_width: f32,
    hip_width: f32,
    arm_length: f32,
    leg_length: f32,
    head_size: f32,
}

impl Default for ScaleValues {
    fn default() -> Self {
        Self {
            height: 1.0,
            shoulder_width: 1.0,
            torso_width: 1.0,
            hip_width: 1.0,
            arm_length: 1.0,
            leg_length: 1.0,
            head_size: 1.0,
        }
    }
}

/// User body proportions relative to the avatar's rest pose
///
/// Every field is clamped to its valid range on construction and on every
/// setter call: height to [0.8, 1.2], widths to [0.8, 1.3], lengths and head
/// size to [0.9, 1.1]. Out-of-range input never fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScaleValues", into = "ScaleValues")]
pub struct BodyScales {
    height: f32,
    shoulder_width: f32,
    torso_width: f32,
    hip_width: f32,
    arm_length: f32,
    leg_length: f32,
    head_size: f32,
}

impl From<ScaleValues> for BodyScales {
    fn from(v: ScaleValues) -> Self {
        let mut scales = Self::identity();
        scales.set_height(v.height);
        scales.set_shoulder_width(v.shoulder_width);
        scales.set_torso_width(v.torso_width);
        scales.set_hip_width(v.hip_width);
        scales.set_arm_length(v.arm_length);
        scales.set_leg_length(v.leg_length);
        scales.set_head_size(v.head_size);
        scales
    }
}

impl From<BodyScales> for ScaleValues {
    fn from(s: BodyScales) -> Self {
        Self {
            height: s.height,
            shoulder_width: s.shoulder_width,
            torso_width: s.torso_width,
            hip_width: s.hip_width,
            arm_length: s.arm_length,
            leg_length: s.leg_length,
            head_size: s.head_size,
        }
    }
}

impl Default for BodyScales {
    fn default() -> Self {
        Self::identity()
    }
}

impl BodyScales {
    /// All factors at 1.0
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            height: 1.0,
            shoulder_width: 1.0,
            torso_width: 1.0,
            hip_width: 1.0,
            arm_length: 1.0,
            leg_length: 1.0,
            head_size: 1.0,
        }
    }

    /// Scales from user measurements, relative to reference adult proportions
    ///
    /// Missing measurements leave their factor at 1.0.
    #[must_use]
    pub fn from_measurements(m: &BodyMeasurements) -> Self {
        let ratio = |value: Option<f32>, reference: f32| value.map_or(1.0, |v| v / reference);
        ScaleValues {
            height: ratio(m.height, REFERENCE_HEIGHT),
            shoulder_width: ratio(m.shoulder_width, REFERENCE_SHOULDER_WIDTH),
            torso_width: ratio(m.torso_width, REFERENCE_TORSO_WIDTH),
            hip_width: ratio(m.hip_width, REFERENCE_HIP_WIDTH),
            arm_length: ratio(m.arm_length, REFERENCE_ARM_LENGTH),
            leg_length: ratio(m.leg_length, REFERENCE_LEG_LENGTH),
            head_size: ratio(m.head_width, REFERENCE_HEAD_WIDTH),
        }
        .into()
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn shoulder_width(&self) -> f32 {
        self.shoulder_width
    }

    #[must_use]
    pub fn torso_width(&self) -> f32 {
        self.torso_width
    }

    #[must_use]
    pub fn hip_width(&self) -> f32 {
        self.hip_width
    }

    #[must_use]
    pub fn arm_length(&self) -> f32 {
        self.arm_length
    }

    #[must_use]
    pub fn leg_length(&self) -> f32 {
        self.leg_length
    }

    #[must_use]
    pub fn head_size(&self) -> f32 {
        self.head_size
    }

    pub fn set_height(&mut self, value: f32) {
        self.height = clamp_scale("height", value, HEIGHT_RANGE);
    }

    pub fn set_shoulder_width(&mut self, value: f32) {
        self.shoulder_width = clamp_scale("shoulder width", value, WIDTH_RANGE);
    }

    pub fn set_torso_width(&mut self, value: f32) {
        self.torso_width = clamp_scale("torso width", value, WIDTH_RANGE);
    }

    pub fn set_hip_width(&mut self, value: f32) {
        self.hip_width = clamp_scale("hip width", value, WIDTH_RANGE);
    }

    pub fn set_arm_length(&mut self, value: f32) {
        self.arm_length = clamp_scale("arm length", value, LENGTH_RANGE);
    }

    pub fn set_leg_length(&mut self, value: f32) {
        self.leg_length = clamp_scale("leg length", value, LENGTH_RANGE);
    }

    pub fn set_head_size(&mut self, value: f32) {
        self.head_size = clamp_scale("head size", value, LENGTH_RANGE);
    }

    /// Builder-style setters
    #[must_use]
    pub fn with_height(mut self, value: f32) -> Self {
        self.set_height(value);
        self
    }

    #[must_use]
    pub fn with_shoulder_width(mut self, value: f32) -> Self {
        self.set_shoulder_width(value);
        self
    }

    #[must_use]
    pub fn with_torso_width(mut self, value: f32) -> Self {
        self.set_torso_width(value);
        self
    }

    #[must_use]
    pub fn with_hip_width(mut self, value: f32) -> Self {
        self.set_hip_width(value);
        self
    }

    #[must_use]
    pub fn with_arm_length(mut self, value: f32) -> Self {
        self.set_arm_length(value);
        self
    }

    #[must_use]
    pub fn with_leg_length(mut self, value: f32) -> Self {
        self.set_leg_length(value);
        self
    }

    #[must_use]
    pub fn with_head_size(mut self, value: f32) -> Self {
        self.set_head_size(value);
        self
    }
}

/// Metric body measurements taken from one world-landmark frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyMeasurements {
    pub shoulder_width: Option<f32>,
    pub hip_width: Option<f32>,
    /// Mean of shoulder and hip width
    pub torso_width: Option<f32>,
    /// Shoulder center to hip center
    pub torso_length: Option<f32>,
    /// Shoulder to wrist along the arm, mean of both sides
    pub arm_length: Option<f32>,
    /// Hip to ankle along the leg, mean of both sides
    pub leg_length: Option<f32>,
    /// Ear to ear
    pub head_width: Option<f32>,
    /// Standing height estimated from the nose-to-heel extent
    pub height: Option<f32>,
}

impl BodyMeasurements {
    /// Measure a user standing upright in a metric frame
    #[must_use]
    pub fn from_frame(frame: &TrackingFrame) -> Self {
        let point = |index: PoseLandmark| {
            frame
                .pose(index)
                .filter(|l| l.is_valid(DEFAULT_MIN_LANDMARK_CONFIDENCE))
                .map(|l| l.position())
        };
        let distance = |a: PoseLandmark, b: PoseLandmark| Some((point(a)? - point(b)?).norm());
        let midpoint = |a: PoseLandmark, b: PoseLandmark| Some((point(a)? + point(b)?) * 0.5);

        let shoulder_width = distance(PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder);
        let hip_width = distance(PoseLandmark::LeftHip, PoseLandmark::RightHip);
        let torso_width = shoulder_width.zip(hip_width).map(|(s, h)| (s + h) * 0.5);
        let torso_length = midpoint(PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder)
            .zip(midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip))
            .map(|(s, h)| (s - h).norm());

        let arm = |side: Side| {
            let (shoulder, elbow, wrist) = match side {
                Side::Left => (PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
                Side::Right => (PoseLandmark::RightShoulder, PoseLandmark::RightElbow, PoseLandmark::RightWrist),
            };
            Some(distance(shoulder, elbow)? + distance(elbow, wrist)?)
        };
        let leg = |side: Side| {
            let (hip, knee, ankle) = match side {
                Side::Left => (PoseLandmark::LeftHip, PoseLandmark::LeftKnee, PoseLandmark::LeftAnkle),
                Side::Right => (PoseLandmark::RightHip, PoseLandmark::RightKnee, PoseLandmark::RightAnkle),
            };
            Some(distance(hip, knee)? + distance(knee, ankle)?)
        };

        let heel = midpoint(PoseLandmark::LeftHeel, PoseLandmark::RightHeel)
            .or_else(|| point(PoseLandmark::LeftHeel))
            .or_else(|| point(PoseLandmark::RightHeel));
        let height = point(PoseLandmark::Nose)
            .zip(heel)
            .map(|(nose, heel)| (nose.y - heel.y).abs() / NOSE_HEIGHT_RATIO);

        Self {
            shoulder_width,
            hip_width,
            torso_width,
            torso_length,
            arm_length: mean_of_sides(arm(Side::Left), arm(Side::Right)),
            leg_length: mean_of_sides(leg(Side::Left), leg(Side::Right)),
            head_width: distance(PoseLandmark::LeftEar, PoseLandmark::RightEar),
            height,
        }
    }
}

fn mean_of_sides(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) * 0.5),
        (one, other) => one.or(other),
    }
}

/// Rest transforms of a loaded rig, captured once
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonRestState {
    transforms: BoneMap<Option<BoneTransform>>,
}

impl SkeletonRestState {
    /// Capture rest transforms keyed by canonical bone
    ///
    /// # Errors
    ///
    /// Returns `Error::Calibration` if the hips bone is missing.
    pub fn from_transforms(transforms: BoneMap<Option<BoneTransform>>) -> Result<Self> {
        if !transforms.contains(HumanoidBone::Hips) {
            return Err(Error::Calibration("Rig has no hips bone".to_string()));
        }
        Ok(Self { transforms })
    }

    /// Capture rest transforms from rig-specific bone names
    ///
    /// Names the alias table does not know are skipped. When two rig bones
    /// resolve to the same canonical bone the first one is kept.
    ///
    /// # Errors
    ///
    /// Returns `Error::Calibration` if no rig bone resolves to the hips.
    pub fn from_rig<I, S>(bones: I, aliases: &BoneAliasTable) -> Result<Self>
    where
        I: IntoIterator<Item = (S, BoneTransform)>,
        S: AsRef<str>,
    {
        let mut transforms = BoneMap::default();
        let mut skipped = 0usize;
        for (name, transform) in bones {
            let name = name.as_ref();
            match aliases.resolve(name) {
                Some(bone) if !transforms.contains(bone) => {
                    transforms.insert(bone, transform);
                }
                Some(bone) => debug!("Rig bone '{name}' duplicates {bone}, keeping the first"),
                None => {
                    debug!("Skipping unknown rig bone '{name}'");
                    skipped += 1;
                }
            }
        }

        let state = Self::from_transforms(transforms)?;
        info!(
            "Loaded rig with {} of {} humanoid bones ({skipped} unknown bones skipped)",
            state.transforms.len(),
            HumanoidBone::COUNT
        );
        Ok(state)
    }

    /// Rest transform of a bone, if the rig has it
    #[must_use]
    pub fn get(&self, bone: HumanoidBone) -> Option<&BoneTransform> {
        self.transforms.get(bone)
    }

    /// All captured transforms
    #[must_use]
    pub fn transforms(&self) -> &BoneMap<Option<BoneTransform>> {
        &self.transforms
    }
}

/// Applies [`BodyScales`] to a rig's rest transforms
pub struct BodyCalibrator {
    original: SkeletonRestState,
    current: BoneMap<Option<BoneTransform>>,
    scales: BodyScales,
}

impl BodyCalibrator {
    #[must_use]
    pub fn new(rest: SkeletonRestState) -> Self {
        Self {
            current: rest.transforms.clone(),
            original: rest,
            scales: BodyScales::identity(),
        }
    }

    /// Rebuild the rest transforms for `scales`, starting from the originals
    pub fn apply(&mut self, scales: &BodyScales) -> &BoneMap<Option<BoneTransform>> {
        self.reset();
        self.scales = *scales;

        if let Some(hips) = self.current[HumanoidBone::Hips].as_mut() {
            hips.scale *= scales.height();
        }

        for side in [Side::Left, Side::Right] {
            let shoulder = HumanoidBone::shoulder(side);
            let width_bone = if self.current.contains(shoulder) {
                shoulder
            } else {
                HumanoidBone::upper_arm(side)
            };
            if let Some(t) = self.current[width_bone].as_mut() {
                t.offset.x *= scales.shoulder_width();
            }
            if let Some(t) = self.current[HumanoidBone::upper_leg(side)].as_mut() {
                t.offset.x *= scales.hip_width();
            }
        }

        for bone in [HumanoidBone::Spine, HumanoidBone::Chest] {
            if let Some(t) = self.current[bone].as_mut() {
                t.scale.x *= scales.torso_width();
            }
        }

        for side in [Side::Left, Side::Right] {
            for bone in [HumanoidBone::upper_arm(side), HumanoidBone::lower_arm(side)] {
                self.scale_long_axis(bone, scales.arm_length());
            }
            for bone in [HumanoidBone::upper_leg(side), HumanoidBone::lower_leg(side)] {
                self.scale_long_axis(bone, scales.leg_length());
            }
        }

        if let Some(head) = self.current[HumanoidBone::Head].as_mut() {
            head.scale *= scales.head_size();
        }

        debug!("Applied body scales {scales:?}");
        &self.current
    }

    /// Scale a limb bone along the axis its child's rest offset points down
    fn scale_long_axis(&mut self, bone: HumanoidBone, factor: f32) {
        let Some(axis) = bone
            .segment_child()
            .and_then(|child| self.original.get(child))
            .map(|child| child.offset.iamax())
        else {
            return;
        };
        if let Some(t) = self.current[bone].as_mut() {
            t.scale[axis] *= factor;
        }
    }

    /// Restore every bone to its original rest transform
    pub fn reset(&mut self) {
        self.current.clone_from(&self.original.transforms);
        self.scales = BodyScales::identity();
    }

    /// Current (possibly scaled) rest transforms
    #[must_use]
    pub fn current(&self) -> &BoneMap<Option<BoneTransform>> {
        &self.current
    }

    /// Scales most recently applied
    #[must_use]
    pub fn scales(&self) -> &BodyScales {
        &self.scales
    }

    /// Original rest state
    #[must_use]
    pub fn rest(&self) -> &SkeletonRestState {
        &self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_clamp() {
        let mut scales = BodyScales::identity();
        scales.set_height(5.0);
        assert_eq!(scales.height(), 1.2);
        scales.set_height(0.1);
        assert_eq!(scales.height(), 0.8);
        scales.set_shoulder_width(2.0);
        assert_eq!(scales.shoulder_width(), 1.3);
        scales.set_head_size(0.0);
        assert_eq!(scales.head_size(), 0.9);
        scales.set_leg_length(f32::NAN);
        assert_eq!(scales.leg_length(), 1.0);
    }

    #[test]
    fn test_builders_clamp() {
        let scales = BodyScales::identity().with_arm_length(1.5).with_hip_width(1.1);
        assert_eq!(scales.arm_length(), 1.1);
        assert_eq!(scales.hip_width(), 1.1);
    }

    #[test]
    fn test_serde_clamps() {
        let scales: BodyScales = serde_yaml::from_str("height: 9.0\ntorso_width: 0.5\n").unwrap();
        assert_eq!(scales.height(), 1.2);
        assert_eq!(scales.torso_width(), 0.8);
        assert_eq!(scales.head_size(), 1.0);
    }

    #[test]
    fn test_from_measurements_missing_values_are_neutral() {
        let measurements = BodyMeasurements {
            shoulder_width: Some(REFERENCE_SHOULDER_WIDTH * 1.1),
            ..BodyMeasurements::default()
        };
        let scales = BodyScales::from_measurements(&measurements);
        assert!((scales.shoulder_width() - 1.1).abs() < 1e-5);
        assert_eq!(scales.height(), 1.0);
        assert_eq!(scales.arm_length(), 1.0);
    }

    #[test]
    fn test_mean_of_sides() {
        assert_eq!(mean_of_sides(Some(1.0), Some(3.0)), Some(2.0));
        assert_eq!(mean_of_sides(None, Some(3.0)), Some(3.0));
        assert_eq!(mean_of_sides(None, None), None);
    }

    #[test]
    fn test_rest_state_requires_hips() {
        let mut transforms = BoneMap::default();
        transforms.insert(HumanoidBone::Spine, BoneTransform::new(Vector3::y()));
        assert!(matches!(
            SkeletonRestState::from_transforms(transforms),
            Err(Error::Calibration(_))
        ));
    }
}
