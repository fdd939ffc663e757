//! Pose solver tests on synthetic avatar-space bodies

mod test_helpers;

use approx::assert_relative_eq;
use mirror_retarget::{
    config::RetargetConfig,
    landmarks::{HandLandmark, Landmark3D, PoseLandmark, TrackingFrame},
    skeleton::HumanoidBone,
    solver::PoseSolver,
};
use nalgebra::{UnitQuaternion, Vector3};
use test_helpers::{
    assert_rotation_eq, assert_unit_norm, max_angle, set_landmark, t_pose_frame, t_pose_frame_with_hands,
};

fn all_regions() -> RetargetConfig {
    RetargetConfig {
        enable_fingers: true,
        ..RetargetConfig::default()
    }
}

#[test]
fn test_hips_only_solve_to_identity() {
    let mut landmarks = vec![Landmark3D::new(0.0, 0.0, 0.0, 0.0); PoseLandmark::COUNT];
    landmarks[PoseLandmark::LeftHip as usize] = Landmark3D::new(-0.1, 0.0, 0.0, 1.0);
    landmarks[PoseLandmark::RightHip as usize] = Landmark3D::new(0.1, 0.0, 0.0, 1.0);
    let frame = TrackingFrame::new(0.0, landmarks).with_confidence(1.0);

    let pose = PoseSolver::default().solve_target(&frame).expect("hips should solve");
    let hips = pose.rotation(HumanoidBone::Hips).expect("hips rotation");
    assert_rotation_eq(&hips, &UnitQuaternion::identity(), 5e-3);
    assert_eq!(pose.len(), 1, "only the hips have usable landmarks");
    assert_relative_eq!(pose.root_position, Vector3::zeros(), epsilon = 1e-6);
}

#[test]
fn test_t_pose_solves_to_rest() {
    let pose = PoseSolver::new(all_regions())
        .solve_target(&t_pose_frame_with_hands(0.0))
        .unwrap();

    // Everything but the shoulders, upper chest and toes
    assert_eq!(pose.len(), HumanoidBone::COUNT - 5);
    assert!(!pose.bone_rotations.contains(HumanoidBone::LeftShoulder));
    assert!(!pose.bone_rotations.contains(HumanoidBone::UpperChest));
    assert!(!pose.bone_rotations.contains(HumanoidBone::RightToes));
    assert!(max_angle(&pose) < 5e-3, "largest rotation {}", max_angle(&pose));
    assert_eq!(pose.confidence, 1.0);
}

#[test]
fn test_wrist_below_elbow_points_forearm_down() {
    // Right arm out to the side with the forearm hanging straight down
    let mut frame = t_pose_frame(0.0);
    set_landmark(&mut frame, PoseLandmark::RightElbow, 0.5, 0.5, 0.0);
    set_landmark(&mut frame, PoseLandmark::RightWrist, 0.5, 0.2, 0.0);

    let pose = PoseSolver::default().solve_target(&frame).unwrap();
    let upper = pose.rotation(HumanoidBone::RightUpperArm).unwrap();
    let lower = pose.rotation(HumanoidBone::RightLowerArm).unwrap();

    assert_rotation_eq(&upper, &UnitQuaternion::identity(), 5e-3);
    let direction = lower * Vector3::x();
    assert_relative_eq!(direction, -Vector3::y(), epsilon = 1e-4);
}

#[test]
fn test_raised_arm_is_relative_to_parent() {
    // Upper arm straight up, forearm continuing straight up
    let mut frame = t_pose_frame(0.0);
    set_landmark(&mut frame, PoseLandmark::LeftElbow, -0.2, 0.8, 0.0);
    set_landmark(&mut frame, PoseLandmark::LeftWrist, -0.2, 1.05, 0.0);

    let pose = PoseSolver::default().solve_target(&frame).unwrap();
    let upper = pose.rotation(HumanoidBone::LeftUpperArm).unwrap();
    let lower = pose.rotation(HumanoidBone::LeftLowerArm).unwrap();

    assert_relative_eq!(upper * -Vector3::x(), Vector3::y(), epsilon = 1e-4);
    // Forearm is straight relative to the raised upper arm
    assert!(lower.angle() < 5e-3, "forearm bent by {}", lower.angle());
}

#[test]
fn test_turned_hips_yaw_the_root() {
    let mut frame = t_pose_frame(0.0);
    // Quarter turn: the right hip now sits toward +z
    set_landmark(&mut frame, PoseLandmark::LeftHip, 0.0, 0.0, -0.1);
    set_landmark(&mut frame, PoseLandmark::RightHip, 0.0, 0.0, 0.1);

    let pose = PoseSolver::default().solve_target(&frame).unwrap();
    let hips = pose.rotation(HumanoidBone::Hips).unwrap();
    assert_relative_eq!(hips * Vector3::x(), Vector3::z(), epsilon = 1e-4);
    assert_relative_eq!(hips * Vector3::y(), Vector3::y(), epsilon = 1e-4);

    // Shoulders did not turn, so the spine undoes the hip yaw
    let spine = pose.rotation(HumanoidBone::Spine).unwrap();
    let chest = pose.rotation(HumanoidBone::Chest).unwrap();
    let torso = hips * spine * chest;
    assert_rotation_eq(&torso, &UnitQuaternion::identity(), 5e-3);
}

#[test]
fn test_confidence_sequence_holds_and_recovers() {
    let mut solver = PoseSolver::default();
    let confidences = [0.9, 0.1, 0.1, 0.9];
    let outputs: Vec<_> = confidences
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let frame = t_pose_frame(i as f64 * 33.0).with_confidence(c);
            solver.solve(&frame).expect("a pose after the first good frame")
        })
        .collect();

    assert_relative_eq!(outputs[0].confidence, 0.9);
    assert_relative_eq!(outputs[1].confidence, 0.9 * 0.95, epsilon = 1e-6);
    assert_relative_eq!(outputs[2].confidence, 0.9 * 0.95 * 0.95, epsilon = 1e-6);
    assert_relative_eq!(outputs[3].confidence, 0.9);

    // Held frames carry the previous rotations at the new timestamp
    assert_eq!(outputs[1].bone_rotations, outputs[0].bone_rotations);
    assert_eq!(outputs[2].timestamp, 66.0);
}

#[test]
fn test_decay_compounds_and_strictly_decreases() {
    let mut solver = PoseSolver::default();
    let first = solver.solve(&t_pose_frame(0.0).with_confidence(0.8)).unwrap();
    assert_relative_eq!(first.confidence, 0.8);

    let mut previous = first.confidence;
    for n in 1..=20 {
        let held = solver.solve(&t_pose_frame(f64::from(n) * 33.0).with_confidence(0.3 - 1e-3)).unwrap();
        let expected = 0.8 * 0.95f32.powi(n);
        assert_relative_eq!(held.confidence, expected, epsilon = 1e-5);
        assert!(held.confidence < previous, "frame {n} did not decay");
        previous = held.confidence;
    }
}

#[test]
fn test_threshold_is_inclusive() {
    let mut solver = PoseSolver::default();
    let pose = solver.solve(&t_pose_frame(0.0).with_confidence(0.3));
    assert_eq!(pose.map(|p| p.confidence), Some(0.3));
}

#[test]
fn test_cold_start_low_confidence_emits_nothing() {
    let mut solver = PoseSolver::default();
    assert!(solver.solve(&t_pose_frame(0.0).with_confidence(0.1)).is_none());
    assert!(solver.solve(&t_pose_frame(33.0).with_confidence(0.2)).is_none());
    assert!(solver.solve(&t_pose_frame(66.0).with_confidence(0.5)).is_some());
}

#[test]
fn test_random_bodies_produce_unit_quaternions() {
    let mut solver = PoseSolver::new(all_regions());
    for i in 0..200 {
        let mut frame = t_pose_frame_with_hands(f64::from(i) * 33.0);
        let jitter = |l: &mut Landmark3D| {
            l.x += rand::random::<f32>() - 0.5;
            l.y += rand::random::<f32>() - 0.5;
            l.z += rand::random::<f32>() - 0.5;
        };
        frame.pose_landmarks.iter_mut().for_each(jitter);
        if let Some(hand) = frame.right_hand.as_mut() {
            hand.iter_mut().for_each(jitter);
        }

        if let Some(pose) = solver.solve(&frame) {
            assert_unit_norm(&pose);
        }
    }
}

#[test]
fn test_rotation_composed_with_inverse_is_identity() {
    let mut frame = t_pose_frame(0.0);
    set_landmark(&mut frame, PoseLandmark::RightElbow, 0.4, 0.3, 0.25);
    set_landmark(&mut frame, PoseLandmark::Nose, 0.05, 0.74, 0.08);
    let pose = PoseSolver::default().solve_target(&frame).unwrap();

    for rotation in pose.rotations() {
        let composed = rotation.then(&rotation.inverse().rotation);
        assert_eq!(composed.bone, rotation.bone);
        assert_rotation_eq(&composed.rotation, &UnitQuaternion::identity(), 5e-3);
    }
}

#[test]
fn test_solve_is_deterministic() {
    let mut frame = t_pose_frame(0.0);
    set_landmark(&mut frame, PoseLandmark::LeftKnee, -0.15, -0.35, 0.2);
    set_landmark(&mut frame, PoseLandmark::RightWrist, 0.6, 0.7, 0.1);

    let mut a = PoseSolver::default();
    let mut b = PoseSolver::default();
    for i in 0..5 {
        frame.timestamp = f64::from(i) * 33.0;
        assert_eq!(a.solve(&frame), b.solve(&frame));
    }
}

#[test]
fn test_rotation_limits_cap_the_head() {
    let mut config = RetargetConfig::default();
    config.rotation_limits.insert(HumanoidBone::Head, 10.0);
    config.rotation_limits.insert(HumanoidBone::Neck, 5.0);

    // Head turned hard to the side
    let mut frame = t_pose_frame(0.0);
    set_landmark(&mut frame, PoseLandmark::Nose, 0.1, 0.72, 0.0);
    set_landmark(&mut frame, PoseLandmark::LeftEar, 0.0, 0.72, 0.07);
    set_landmark(&mut frame, PoseLandmark::RightEar, 0.0, 0.72, -0.07);

    let pose = PoseSolver::new(config).solve_target(&frame).unwrap();
    let head = pose.rotation(HumanoidBone::Head).unwrap();
    let neck = pose.rotation(HumanoidBone::Neck).unwrap();
    assert!(head.angle() <= 10f32.to_radians() + 1e-4, "head {}", head.angle().to_degrees());
    assert!(neck.angle() <= 5f32.to_radians() + 1e-4, "neck {}", neck.angle().to_degrees());
}

#[test]
fn test_fingers_only_when_enabled() {
    let frame = t_pose_frame_with_hands(0.0);
    let without = PoseSolver::default().solve_target(&frame).unwrap();
    assert!(!without.bone_rotations.contains(HumanoidBone::LeftIndexProximal));

    let with = PoseSolver::new(all_regions()).solve_target(&frame).unwrap();
    assert!(with.bone_rotations.contains(HumanoidBone::LeftIndexProximal));
    assert!(with.bone_rotations.contains(HumanoidBone::RightThumbDistal));
}

#[test]
fn test_curled_finger_bends_around_the_hand() {
    let mut frame = t_pose_frame_with_hands(0.0);
    // Right index tip folds down below the distal joint
    let hand = frame.right_hand.as_mut().unwrap();
    let dip = hand[HandLandmark::IndexDip as usize];
    hand[HandLandmark::IndexTip as usize] = Landmark3D::new(dip.x, dip.y - 0.02, dip.z, 1.0);

    let pose = PoseSolver::new(all_regions()).solve_target(&frame).unwrap();
    let distal = pose.rotation(HumanoidBone::RightIndexDistal).unwrap();
    assert_relative_eq!(distal * Vector3::x(), -Vector3::y(), epsilon = 1e-4);
    let intermediate = pose.rotation(HumanoidBone::RightIndexIntermediate).unwrap();
    assert!(intermediate.angle() < 5e-3);
}

#[test]
fn test_unusable_landmarks_skip_their_bones() {
    let mut frame = t_pose_frame(0.0);
    frame.pose_landmarks[PoseLandmark::LeftKnee as usize].confidence = 0.1;
    frame.pose_landmarks[PoseLandmark::RightWrist as usize].x = f32::NAN;

    let pose = PoseSolver::default().solve_target(&frame).unwrap();
    assert!(!pose.bone_rotations.contains(HumanoidBone::LeftUpperLeg));
    assert!(!pose.bone_rotations.contains(HumanoidBone::LeftLowerLeg));
    assert!(pose.bone_rotations.contains(HumanoidBone::LeftFoot));
    assert!(!pose.bone_rotations.contains(HumanoidBone::RightLowerArm));
    assert!(pose.bone_rotations.contains(HumanoidBone::RightUpperArm));
    assert_unit_norm(&pose);
}

#[test]
fn test_disabled_regions_are_left_out() {
    let config = RetargetConfig {
        enable_legs: false,
        enable_head: false,
        ..RetargetConfig::default()
    };
    let pose = PoseSolver::new(config).solve_target(&t_pose_frame(0.0)).unwrap();
    assert!(pose.bone_rotations.contains(HumanoidBone::Hips));
    assert!(pose.bone_rotations.contains(HumanoidBone::LeftUpperArm));
    assert!(!pose.bone_rotations.contains(HumanoidBone::Head));
    assert!(!pose.bone_rotations.contains(HumanoidBone::RightLowerLeg));
}
