//! Common test utilities and helpers

#![allow(dead_code)]

use mirror_retarget::{
    landmarks::{HandLandmark, Landmark3D, PoseLandmark, TrackingFrame},
    pose::AvatarPose,
};
use nalgebra::UnitQuaternion;

/// Landmark with full confidence
pub fn point(x: f32, y: f32, z: f32) -> Landmark3D {
    Landmark3D::new(x, y, z, 1.0)
}

/// Avatar-space T-pose of a 1.7 m-ish body standing at the origin, facing +z
pub fn t_pose_landmarks() -> Vec<Landmark3D> {
    let mut landmarks = vec![point(0.0, 0.0, 0.0); PoseLandmark::COUNT];
    let mut set = |index: PoseLandmark, x: f32, y: f32, z: f32| landmarks[index as usize] = point(x, y, z);

    set(PoseLandmark::Nose, 0.0, 0.72, 0.1);
    set(PoseLandmark::LeftEyeInner, -0.02, 0.74, 0.08);
    set(PoseLandmark::LeftEye, -0.035, 0.74, 0.08);
    set(PoseLandmark::LeftEyeOuter, -0.05, 0.74, 0.07);
    set(PoseLandmark::RightEyeInner, 0.02, 0.74, 0.08);
    set(PoseLandmark::RightEye, 0.035, 0.74, 0.08);
    set(PoseLandmark::RightEyeOuter, 0.05, 0.74, 0.07);
    set(PoseLandmark::LeftEar, -0.07, 0.72, 0.0);
    set(PoseLandmark::RightEar, 0.07, 0.72, 0.0);
    set(PoseLandmark::MouthLeft, -0.02, 0.68, 0.08);
    set(PoseLandmark::MouthRight, 0.02, 0.68, 0.08);

    set(PoseLandmark::LeftShoulder, -0.2, 0.5, 0.0);
    set(PoseLandmark::RightShoulder, 0.2, 0.5, 0.0);
    set(PoseLandmark::LeftElbow, -0.5, 0.5, 0.0);
    set(PoseLandmark::RightElbow, 0.5, 0.5, 0.0);
    set(PoseLandmark::LeftWrist, -0.75, 0.5, 0.0);
    set(PoseLandmark::RightWrist, 0.75, 0.5, 0.0);
    set(PoseLandmark::LeftPinky, -0.85, 0.5, -0.02);
    set(PoseLandmark::RightPinky, 0.85, 0.5, -0.02);
    set(PoseLandmark::LeftIndex, -0.85, 0.5, 0.02);
    set(PoseLandmark::RightIndex, 0.85, 0.5, 0.02);
    set(PoseLandmark::LeftThumb, -0.8, 0.5, 0.04);
    set(PoseLandmark::RightThumb, 0.8, 0.5, 0.04);

    set(PoseLandmark::LeftHip, -0.1, 0.0, 0.0);
    set(PoseLandmark::RightHip, 0.1, 0.0, 0.0);
    set(PoseLandmark::LeftKnee, -0.1, -0.4, 0.0);
    set(PoseLandmark::RightKnee, 0.1, -0.4, 0.0);
    set(PoseLandmark::LeftAnkle, -0.1, -0.8, 0.0);
    set(PoseLandmark::RightAnkle, 0.1, -0.8, 0.0);
    set(PoseLandmark::LeftHeel, -0.1, -0.85, -0.05);
    set(PoseLandmark::RightHeel, 0.1, -0.85, -0.05);
    set(PoseLandmark::LeftFootIndex, -0.1, -0.8, 0.15);
    set(PoseLandmark::RightFootIndex, 0.1, -0.8, 0.15);

    landmarks
}

/// Avatar-space hand with every finger straight out along the arm
///
/// `outward` is -1 for the left hand and +1 for the right.
pub fn flat_hand(outward: f32) -> Vec<Landmark3D> {
    let mut hand = vec![point(0.0, 0.0, 0.0); HandLandmark::COUNT];
    let wrist_x = 0.75 * outward;
    let mut set = |index: HandLandmark, along: f32, z: f32| hand[index as usize] = point(wrist_x + along * outward, 0.5, z);

    set(HandLandmark::Wrist, 0.0, 0.0);
    set(HandLandmark::ThumbCmc, 0.02, 0.04);
    set(HandLandmark::ThumbMcp, 0.05, 0.04);
    set(HandLandmark::ThumbIp, 0.08, 0.04);
    set(HandLandmark::ThumbTip, 0.11, 0.04);

    let fingers = [
        ([HandLandmark::IndexMcp, HandLandmark::IndexPip, HandLandmark::IndexDip, HandLandmark::IndexTip], 0.02),
        ([HandLandmark::MiddleMcp, HandLandmark::MiddlePip, HandLandmark::MiddleDip, HandLandmark::MiddleTip], 0.0),
        ([HandLandmark::RingMcp, HandLandmark::RingPip, HandLandmark::RingDip, HandLandmark::RingTip], -0.02),
        ([HandLandmark::PinkyMcp, HandLandmark::PinkyPip, HandLandmark::PinkyDip, HandLandmark::PinkyTip], -0.04),
    ];
    for (chain, z) in fingers {
        for (index, along) in chain.into_iter().zip([0.07, 0.11, 0.14, 0.16]) {
            set(index, along, z);
        }
    }
    hand
}

/// Avatar-space T-pose frame without hands
pub fn t_pose_frame(timestamp: f64) -> TrackingFrame {
    TrackingFrame::new(timestamp, t_pose_landmarks())
}

/// Avatar-space T-pose frame with both hands flat
pub fn t_pose_frame_with_hands(timestamp: f64) -> TrackingFrame {
    t_pose_frame(timestamp).with_hands(Some(flat_hand(-1.0)), Some(flat_hand(1.0)))
}

/// Move one body landmark of a frame
pub fn set_landmark(frame: &mut TrackingFrame, index: PoseLandmark, x: f32, y: f32, z: f32) {
    let confidence = frame.pose_landmarks[index as usize].confidence;
    frame.pose_landmarks[index as usize] = Landmark3D::new(x, y, z, confidence);
}

/// Left/right pairs of the body layout
const SIDE_PAIRS: [(PoseLandmark, PoseLandmark); 16] = [
    (PoseLandmark::LeftEyeInner, PoseLandmark::RightEyeInner),
    (PoseLandmark::LeftEye, PoseLandmark::RightEye),
    (PoseLandmark::LeftEyeOuter, PoseLandmark::RightEyeOuter),
    (PoseLandmark::LeftEar, PoseLandmark::RightEar),
    (PoseLandmark::MouthLeft, PoseLandmark::MouthRight),
    (PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder),
    (PoseLandmark::LeftElbow, PoseLandmark::RightElbow),
    (PoseLandmark::LeftWrist, PoseLandmark::RightWrist),
    (PoseLandmark::LeftPinky, PoseLandmark::RightPinky),
    (PoseLandmark::LeftIndex, PoseLandmark::RightIndex),
    (PoseLandmark::LeftThumb, PoseLandmark::RightThumb),
    (PoseLandmark::LeftHip, PoseLandmark::RightHip),
    (PoseLandmark::LeftKnee, PoseLandmark::RightKnee),
    (PoseLandmark::LeftAnkle, PoseLandmark::RightAnkle),
    (PoseLandmark::LeftHeel, PoseLandmark::RightHeel),
    (PoseLandmark::LeftFootIndex, PoseLandmark::RightFootIndex),
];

/// Express an avatar-space frame the way the tracker reports it
///
/// Inverse of the tracker to avatar conversion for the given mirror mode.
/// For a left/right symmetric body both modes give the same tracker frame.
pub fn to_tracker_space(frame: &TrackingFrame, mirror: bool) -> TrackingFrame {
    let convert = |landmarks: &[Landmark3D]| -> Vec<Landmark3D> {
        landmarks
            .iter()
            .map(|l| Landmark3D::new(if mirror { -l.x } else { l.x }, -l.y, -l.z, l.confidence))
            .collect()
    };
    let mut pose_landmarks = convert(&frame.pose_landmarks);
    let mut left_hand = frame.left_hand.as_deref().map(convert);
    let mut right_hand = frame.right_hand.as_deref().map(convert);

    if !mirror {
        for (left, right) in SIDE_PAIRS {
            pose_landmarks.swap(left as usize, right as usize);
        }
        std::mem::swap(&mut left_hand, &mut right_hand);
    }

    TrackingFrame {
        timestamp: frame.timestamp,
        pose_landmarks,
        left_hand,
        right_hand,
        confidence: frame.confidence,
    }
}

/// Largest rotation angle of any bone in the pose
pub fn max_angle(pose: &AvatarPose) -> f32 {
    pose.rotations().map(|r| r.rotation.angle()).fold(0.0, f32::max)
}

/// Assert that every quaternion in the pose is unit length
pub fn assert_unit_norm(pose: &AvatarPose) {
    for r in pose.rotations() {
        let norm = r.rotation.quaternion().norm();
        assert!((norm - 1.0).abs() < 1e-4, "{} has norm {norm}", r.bone);
    }
}

/// Assert two rotations are equal up to sign within `epsilon` radians
pub fn assert_rotation_eq(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, epsilon: f32) {
    let angle = a.angle_to(b);
    assert!(angle < epsilon, "rotations differ by {angle} rad: {a:?} vs {b:?}");
}
