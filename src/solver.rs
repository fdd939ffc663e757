//! Analytic pose solver.
//!
//! Turns one avatar-space [`TrackingFrame`] into bone-local rotations:
//!
//! 1. Hips from the hip line and world up
//! 2. Spine and chest from the shoulder line, relative to the hips, split
//!    evenly between the two bones
//! 3. Limbs by shortest-arc rotation from each bone's rest direction to the
//!    observed segment, expressed in the parent bone's solved frame
//! 4. Neck and head from a look-at rotation, shared between the two bones
//! 5. Optional finger phalanges from hand landmarks
//!
//! Any step whose landmarks are missing is skipped and its bones are left out
//! of the pose; descendants then treat the skipped bone as being at rest.

use crate::{
    calibration::SkeletonRestState,
    config::RetargetConfig,
    gate::ConfidenceGate,
    landmarks::{HandLandmark, Landmark3D, PoseLandmark, Side, TrackingFrame},
    math::{basis_to_quaternion, limit_angle, look_rotation, orthonormal_basis, shortest_arc, slerp, try_normalize},
    pose::AvatarPose,
    skeleton::{BoneMap, Finger, HumanoidBone, Phalanx},
};
use log::debug;
use nalgebra::{UnitQuaternion, Vector3};

/// Rest direction of each aimable bone, in its parent's frame
#[derive(Debug, Clone, PartialEq)]
pub struct RestPose {
    directions: BoneMap<Option<Vector3<f32>>>,
}

impl RestPose {
    /// Standard T-pose: arms and fingers straight out to the sides, legs
    /// straight down, feet pointing forward
    #[must_use]
    pub fn t_pose() -> Self {
        let directions = BoneMap::from_fn(|bone| {
            let outward = |side: Option<Side>| match side {
                Some(Side::Left) => -Vector3::x(),
                _ => Vector3::x(),
            };
            match bone {
                HumanoidBone::LeftUpperArm
                | HumanoidBone::LeftLowerArm
                | HumanoidBone::LeftHand
                | HumanoidBone::RightUpperArm
                | HumanoidBone::RightLowerArm
                | HumanoidBone::RightHand => Some(outward(bone.side())),
                HumanoidBone::LeftUpperLeg
                | HumanoidBone::LeftLowerLeg
                | HumanoidBone::RightUpperLeg
                | HumanoidBone::RightLowerLeg => Some(-Vector3::y()),
                HumanoidBone::LeftFoot | HumanoidBone::RightFoot => Some(Vector3::z()),
                _ if bone.finger().is_some() => Some(outward(bone.side())),
                _ => None,
            }
        });
        Self { directions }
    }

    /// Rest directions taken from a loaded rig
    ///
    /// Each aimable bone points along its segment child's rest offset. Bones
    /// whose child is missing or has a zero offset keep the T-pose direction.
    /// Assumes the rig's rest rotations are identity (a normalized humanoid).
    #[must_use]
    pub fn from_skeleton(rest: &SkeletonRestState) -> Self {
        let mut pose = Self::t_pose();
        for (bone, direction) in pose.directions.iter_mut() {
            if direction.is_none() {
                continue;
            }
            let derived = bone
                .segment_child()
                .and_then(|child| rest.get(child))
                .and_then(|t| try_normalize(&t.offset));
            match derived {
                Some(d) => *direction = Some(d),
                None => debug!("No rest offset below {bone}, using the T-pose direction"),
            }
        }
        pose
    }

    /// Rest direction of a bone, `None` for bones that are not aimed
    #[must_use]
    pub fn direction(&self, bone: HumanoidBone) -> Option<Vector3<f32>> {
        self.directions[bone]
    }
}

impl Default for RestPose {
    fn default() -> Self {
        Self::t_pose()
    }
}

/// Landmark lookup that treats unusable landmarks as absent
struct Points<'a> {
    frame: &'a TrackingFrame,
    min_confidence: f32,
}

impl Points<'_> {
    fn usable(&self, landmark: Option<&Landmark3D>) -> Option<Vector3<f32>> {
        landmark
            .filter(|l| l.is_valid(self.min_confidence))
            .map(Landmark3D::position)
    }

    fn pose(&self, index: PoseLandmark) -> Option<Vector3<f32>> {
        self.usable(self.frame.pose(index))
    }

    fn pose_mid(&self, a: PoseLandmark, b: PoseLandmark) -> Option<Vector3<f32>> {
        Some((self.pose(a)? + self.pose(b)?) * 0.5)
    }

    fn hand(&self, side: Side, index: HandLandmark) -> Option<Vector3<f32>> {
        self.usable(self.frame.hand(side, index))
    }
}

/// Pose landmarks along one side of the body
struct SideLandmarks {
    shoulder: PoseLandmark,
    elbow: PoseLandmark,
    wrist: PoseLandmark,
    index: PoseLandmark,
    pinky: PoseLandmark,
    hip: PoseLandmark,
    knee: PoseLandmark,
    ankle: PoseLandmark,
    foot_index: PoseLandmark,
}

impl SideLandmarks {
    fn of(side: Side) -> Self {
        match side {
            Side::Left => Self {
                shoulder: PoseLandmark::LeftShoulder,
                elbow: PoseLandmark::LeftElbow,
                wrist: PoseLandmark::LeftWrist,
                index: PoseLandmark::LeftIndex,
                pinky: PoseLandmark::LeftPinky,
                hip: PoseLandmark::LeftHip,
                knee: PoseLandmark::LeftKnee,
                ankle: PoseLandmark::LeftAnkle,
                foot_index: PoseLandmark::LeftFootIndex,
            },
            Side::Right => Self {
                shoulder: PoseLandmark::RightShoulder,
                elbow: PoseLandmark::RightElbow,
                wrist: PoseLandmark::RightWrist,
                index: PoseLandmark::RightIndex,
                pinky: PoseLandmark::RightPinky,
                hip: PoseLandmark::RightHip,
                knee: PoseLandmark::RightKnee,
                ankle: PoseLandmark::RightAnkle,
                foot_index: PoseLandmark::RightFootIndex,
            },
        }
    }
}

/// Hand landmarks along one finger, knuckle to tip
fn finger_chain(finger: Finger) -> [HandLandmark; 4] {
    match finger {
        Finger::Thumb => [HandLandmark::ThumbCmc, HandLandmark::ThumbMcp, HandLandmark::ThumbIp, HandLandmark::ThumbTip],
        Finger::Index => [HandLandmark::IndexMcp, HandLandmark::IndexPip, HandLandmark::IndexDip, HandLandmark::IndexTip],
        Finger::Middle => [
            HandLandmark::MiddleMcp,
            HandLandmark::MiddlePip,
            HandLandmark::MiddleDip,
            HandLandmark::MiddleTip,
        ],
        Finger::Ring => [HandLandmark::RingMcp, HandLandmark::RingPip, HandLandmark::RingDip, HandLandmark::RingTip],
        Finger::Little => [HandLandmark::PinkyMcp, HandLandmark::PinkyPip, HandLandmark::PinkyDip, HandLandmark::PinkyTip],
    }
}

/// Accumulates one frame's bone rotations
struct PoseBuilder<'a> {
    config: &'a RetargetConfig,
    limits: &'a BoneMap<Option<f32>>,
    rest: &'a RestPose,
    points: Points<'a>,
    pose: AvatarPose,
}

impl PoseBuilder<'_> {
    fn set(&mut self, bone: HumanoidBone, rotation: UnitQuaternion<f32>) {
        let rotation = match self.limits[bone] {
            Some(max_angle) => limit_angle(&rotation, max_angle),
            None => rotation,
        };
        self.pose.set_rotation(bone, rotation);
    }

    fn local(&self, bone: HumanoidBone) -> UnitQuaternion<f32> {
        self.pose.rotation(bone).unwrap_or_else(UnitQuaternion::identity)
    }

    /// Accumulated rotation from the root down to and including `bone`
    fn world(&self, bone: HumanoidBone) -> UnitQuaternion<f32> {
        match bone.parent() {
            Some(parent) => self.world(parent) * self.local(bone),
            None => self.local(bone),
        }
    }

    fn parent_world(&self, bone: HumanoidBone) -> UnitQuaternion<f32> {
        bone.parent().map_or_else(UnitQuaternion::identity, |parent| self.world(parent))
    }

    /// Rotate `bone` so its rest direction follows `observed` (world space)
    fn aim(&mut self, bone: HumanoidBone, observed: Option<Vector3<f32>>) {
        let (Some(rest), Some(observed)) = (self.rest.direction(bone), observed) else {
            return;
        };
        let local = self.parent_world(bone).inverse_transform_vector(&observed);
        if try_normalize(&local).is_none() {
            return;
        }
        self.set(bone, shortest_arc(&rest, &local));
    }

    fn segment(&self, from: PoseLandmark, to: PoseLandmark) -> Option<Vector3<f32>> {
        Some(self.points.pose(to)? - self.points.pose(from)?)
    }

    fn solve_hips(&mut self) {
        let (Some(left), Some(right)) = (self.points.pose(PoseLandmark::LeftHip), self.points.pose(PoseLandmark::RightHip))
        else {
            return;
        };
        self.pose.root_position = (left + right) * 0.5;
        if let Some(basis) = orthonormal_basis(&(right - left), &Vector3::y()) {
            self.set(HumanoidBone::Hips, basis_to_quaternion(&basis));
        }
    }

    fn solve_spine(&mut self) {
        let points = &self.points;
        let (Some(left), Some(right), Some(hip_center)) = (
            points.pose(PoseLandmark::LeftShoulder),
            points.pose(PoseLandmark::RightShoulder),
            points.pose_mid(PoseLandmark::LeftHip, PoseLandmark::RightHip),
        ) else {
            return;
        };
        let shoulder_center = (left + right) * 0.5;
        let Some(basis) = orthonormal_basis(&(right - left), &(shoulder_center - hip_center)) else {
            return;
        };

        let torso = basis_to_quaternion(&basis);
        let relative = self.world(HumanoidBone::Hips).inverse() * torso;
        let half = slerp(&UnitQuaternion::identity(), &relative, 0.5);
        self.set(HumanoidBone::Spine, half);
        let spine = self.local(HumanoidBone::Spine);
        self.set(HumanoidBone::Chest, spine.inverse() * relative);
    }

    fn solve_arm(&mut self, side: Side) {
        let lm = SideLandmarks::of(side);
        self.aim(HumanoidBone::upper_arm(side), self.segment(lm.shoulder, lm.elbow));
        self.aim(HumanoidBone::lower_arm(side), self.segment(lm.elbow, lm.wrist));

        let from_hand = self
            .points
            .hand(side, HandLandmark::Wrist)
            .zip(self.points.hand(side, HandLandmark::MiddleMcp))
            .map(|(wrist, mcp)| mcp - wrist);
        let from_pose = || Some(self.points.pose_mid(lm.index, lm.pinky)? - self.points.pose(lm.wrist)?);
        let hand_direction = from_hand.or_else(from_pose);
        self.aim(HumanoidBone::hand(side), hand_direction);
    }

    fn solve_leg(&mut self, side: Side) {
        let lm = SideLandmarks::of(side);
        self.aim(HumanoidBone::upper_leg(side), self.segment(lm.hip, lm.knee));
        self.aim(HumanoidBone::lower_leg(side), self.segment(lm.knee, lm.ankle));
        self.aim(HumanoidBone::foot(side), self.segment(lm.ankle, lm.foot_index));
    }

    fn solve_head(&mut self) {
        let points = &self.points;
        let (Some(nose), Some(left_ear), Some(right_ear)) = (
            points.pose(PoseLandmark::Nose),
            points.pose(PoseLandmark::LeftEar),
            points.pose(PoseLandmark::RightEar),
        ) else {
            return;
        };

        let forward = nose - (left_ear + right_ear) * 0.5;
        let up_hint = try_normalize(&forward.cross(&(right_ear - left_ear))).unwrap_or_else(Vector3::y);
        let Some(head_world) = look_rotation(&forward, &up_hint) else {
            return;
        };

        let head_local = self.parent_world(HumanoidBone::Neck).inverse() * head_world;
        let neck = slerp(&UnitQuaternion::identity(), &head_local, self.config.neck_share);
        self.set(HumanoidBone::Neck, neck);
        let neck = self.local(HumanoidBone::Neck);
        self.set(HumanoidBone::Head, neck.inverse() * head_local);
    }

    fn solve_fingers(&mut self, side: Side) {
        for finger in Finger::ALL {
            let chain = finger_chain(finger);
            for (i, phalanx) in Phalanx::ALL.into_iter().enumerate() {
                let direction = self
                    .points
                    .hand(side, chain[i])
                    .zip(self.points.hand(side, chain[i + 1]))
                    .map(|(from, to)| to - from);
                self.aim(HumanoidBone::finger_bone(side, finger, phalanx), direction);
            }
        }
    }
}

/// Solves avatar poses from avatar-space tracking frames
pub struct PoseSolver {
    config: RetargetConfig,
    limits: BoneMap<Option<f32>>,
    rest: RestPose,
    gate: ConfidenceGate,
}

impl PoseSolver {
    #[must_use]
    pub fn new(config: RetargetConfig) -> Self {
        let gate = ConfidenceGate::new(config.confidence_threshold, config.confidence_decay);
        Self {
            limits: radian_limits(&config),
            config,
            rest: RestPose::default(),
            gate,
        }
    }

    /// Use rest directions other than the default T-pose
    #[must_use]
    pub fn with_rest_pose(mut self, rest: RestPose) -> Self {
        self.rest = rest;
        self
    }

    pub fn set_rest_pose(&mut self, rest: RestPose) {
        self.rest = rest;
    }

    #[must_use]
    pub fn rest_pose(&self) -> &RestPose {
        &self.rest
    }

    /// Replace the configuration; takes effect on the next frame
    pub fn set_config(&mut self, config: RetargetConfig) {
        self.limits = radian_limits(&config);
        self.gate.set_parameters(config.confidence_threshold, config.confidence_decay);
        self.config = config;
    }

    #[must_use]
    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    /// Solve a frame through the confidence gate
    ///
    /// Returns a fresh pose for confident frames, the decayed last pose for
    /// low-confidence frames, and `None` before any pose has been solved.
    pub fn solve(&mut self, frame: &TrackingFrame) -> Option<AvatarPose> {
        let confidence = frame.confidence();
        let Self {
            config,
            limits,
            rest,
            gate,
        } = self;
        gate.admit(confidence, frame.timestamp, || solve_frame(config, limits, rest, frame))
    }

    /// Solve a frame ignoring its confidence
    ///
    /// Returns `None` only when no bone at all could be solved.
    #[must_use]
    pub fn solve_target(&self, frame: &TrackingFrame) -> Option<AvatarPose> {
        solve_frame(&self.config, &self.limits, &self.rest, frame)
    }

    /// Forget the held pose
    pub fn reset(&mut self) {
        self.gate.reset();
    }
}

impl Default for PoseSolver {
    fn default() -> Self {
        Self::new(RetargetConfig::default())
    }
}

fn radian_limits(config: &RetargetConfig) -> BoneMap<Option<f32>> {
    BoneMap::from_fn(|bone| config.rotation_limits.get(&bone).map(|degrees| degrees.to_radians()))
}

fn solve_frame(
    config: &RetargetConfig,
    limits: &BoneMap<Option<f32>>,
    rest: &RestPose,
    frame: &TrackingFrame,
) -> Option<AvatarPose> {
    let mut builder = PoseBuilder {
        config,
        limits,
        rest,
        points: Points {
            frame,
            min_confidence: config.min_landmark_confidence,
        },
        pose: AvatarPose::empty(frame.timestamp, frame.confidence()),
    };

    builder.solve_hips();
    if config.enable_spine {
        builder.solve_spine();
    }
    if config.enable_head {
        builder.solve_head();
    }
    for side in [Side::Left, Side::Right] {
        if config.enable_arms {
            builder.solve_arm(side);
        }
        if config.enable_legs {
            builder.solve_leg(side);
        }
        if config.enable_fingers {
            builder.solve_fingers(side);
        }
    }

    let pose = builder.pose;
    if pose.is_empty() {
        debug!("No bones solved for frame at {} ms", frame.timestamp);
        return None;
    }
    Some(pose)
}
