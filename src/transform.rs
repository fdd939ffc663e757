//! Tracker space to avatar space conversion.
//!
//! Tracker space: x to the image right, y down, z away from the camera.
//! Avatar space: x to the avatar's right, y up, z toward the viewer (the
//! avatar's forward). A user facing the camera becomes an avatar facing the
//! viewer in both modes. Mirror mode negates x. Otherwise x is kept and the
//! left and right landmark sets (body and hands) trade places, which keeps
//! the handedness of the body frame intact.

use crate::{
    constants::NUM_POSE_LANDMARKS,
    landmarks::{Landmark3D, TrackingFrame},
};

/// Index of each body landmark's counterpart on the other side
const OPPOSITE_SIDE: [usize; NUM_POSE_LANDMARKS] = [
    0, // nose
    4, 5, 6, 1, 2, 3, // eyes
    8, 7, // ears
    10, 9, // mouth
    12, 11, 14, 13, 16, 15, // shoulders, elbows, wrists
    18, 17, 20, 19, 22, 21, // pinky, index, thumb
    24, 23, 26, 25, 28, 27, // hips, knees, ankles
    30, 29, 32, 31, // heels, foot index
];

/// Map one landmark into avatar space
#[must_use]
pub fn to_avatar_space(landmark: &Landmark3D, mirror: bool) -> Landmark3D {
    let x = if mirror { -landmark.x } else { landmark.x };
    Landmark3D {
        x,
        y: -landmark.y,
        z: -landmark.z,
        confidence: landmark.confidence,
    }
}

fn map_all(landmarks: &[Landmark3D], mirror: bool) -> Vec<Landmark3D> {
    landmarks.iter().map(|l| to_avatar_space(l, mirror)).collect()
}

/// Exchange left and right body landmarks
///
/// A slot whose counterpart lies past the end of a truncated frame becomes
/// an unusable zero-confidence landmark.
#[must_use]
pub fn swap_sides(landmarks: &[Landmark3D]) -> Vec<Landmark3D> {
    landmarks
        .iter()
        .enumerate()
        .map(|(i, own)| match OPPOSITE_SIDE.get(i) {
            Some(&j) => landmarks.get(j).copied().unwrap_or(Landmark3D::new(0.0, 0.0, 0.0, 0.0)),
            None => *own,
        })
        .collect()
}

/// Map every landmark of a frame into avatar space
#[must_use]
pub fn transform_frame(frame: &TrackingFrame, mirror: bool) -> TrackingFrame {
    let pose_landmarks = map_all(&frame.pose_landmarks, mirror);
    let left_hand = frame.left_hand.as_deref().map(|hand| map_all(hand, mirror));
    let right_hand = frame.right_hand.as_deref().map(|hand| map_all(hand, mirror));

    if mirror {
        TrackingFrame {
            timestamp: frame.timestamp,
            pose_landmarks,
            left_hand,
            right_hand,
            confidence: frame.confidence,
        }
    } else {
        TrackingFrame {
            timestamp: frame.timestamp,
            pose_landmarks: swap_sides(&pose_landmarks),
            left_hand: right_hand,
            right_hand: left_hand,
            confidence: frame.confidence,
        }
    }
}
