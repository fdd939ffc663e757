//! Landmark types produced by the external body tracker.
//!
//! Pose landmarks follow the 33-point full-body layout and hand landmarks the
//! 21-point hand layout. Index enums name the slots so solver code never
//! indexes by bare integers.

use crate::{
    constants::{NUM_HAND_LANDMARKS, NUM_POSE_LANDMARKS},
    Error, Result,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One tracked 3D point with its detector confidence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Detector confidence (visibility) in [0, 1]
    #[serde(default = "default_landmark_confidence")]
    pub confidence: f32,
}

fn default_landmark_confidence() -> f32 {
    1.0
}

impl Landmark3D {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, confidence: f32) -> Self {
        Self { x, y, z, confidence }
    }

    /// Position as a vector
    #[must_use]
    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Whether all coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Whether the landmark is usable at the given confidence threshold
    #[must_use]
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.is_finite() && self.confidence >= threshold
    }
}

/// Indices of the 33-point body layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = NUM_POSE_LANDMARKS;
}

/// Indices of the 21-point hand layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub const COUNT: usize = NUM_HAND_LANDMARKS;
}

/// Body side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// One detector tick of tracking output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    /// Monotonic timestamp in milliseconds
    pub timestamp: f64,
    /// Body landmarks in the 33-point layout
    pub pose_landmarks: Vec<Landmark3D>,
    #[serde(default)]
    pub left_hand: Option<Vec<Landmark3D>>,
    #[serde(default)]
    pub right_hand: Option<Vec<Landmark3D>>,
    /// Overall tracking confidence in [0, 1]
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl TrackingFrame {
    /// Create a frame without hands; confidence is derived from the torso
    #[must_use]
    pub fn new(timestamp: f64, pose_landmarks: Vec<Landmark3D>) -> Self {
        Self {
            timestamp,
            pose_landmarks,
            left_hand: None,
            right_hand: None,
            confidence: None,
        }
    }

    /// Parse one frame from tracker JSON output
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for malformed JSON and `Error::InvalidInput` when
    /// a landmark list is longer than its layout.
    pub fn from_json(text: &str) -> Result<Self> {
        let frame: Self = serde_json::from_str(text)?;
        if frame.pose_landmarks.len() > NUM_POSE_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Frame at {} ms has {} pose landmarks, expected at most {NUM_POSE_LANDMARKS}",
                frame.timestamp,
                frame.pose_landmarks.len()
            )));
        }
        for hand in [&frame.left_hand, &frame.right_hand].into_iter().flatten() {
            if hand.len() > NUM_HAND_LANDMARKS {
                return Err(Error::InvalidInput(format!(
                    "Frame at {} ms has {} hand landmarks, expected at most {NUM_HAND_LANDMARKS}",
                    frame.timestamp,
                    hand.len()
                )));
            }
        }
        Ok(frame)
    }

    /// Override the derived frame confidence
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach hand landmarks
    #[must_use]
    pub fn with_hands(mut self, left: Option<Vec<Landmark3D>>, right: Option<Vec<Landmark3D>>) -> Self {
        self.left_hand = left;
        self.right_hand = right;
        self
    }

    /// Body landmark by index, if the tracker reported it
    #[must_use]
    pub fn pose(&self, index: PoseLandmark) -> Option<&Landmark3D> {
        self.pose_landmarks.get(index as usize)
    }

    /// Hand landmark by side and index, if that hand was tracked
    #[must_use]
    pub fn hand(&self, side: Side, index: HandLandmark) -> Option<&Landmark3D> {
        let hand = match side {
            Side::Left => self.left_hand.as_ref(),
            Side::Right => self.right_hand.as_ref(),
        };
        hand.and_then(|points| points.get(index as usize))
    }

    /// Frame confidence: the tracker's value when present, otherwise the mean
    /// confidence of the shoulders and hips (0 when none were reported)
    #[must_use]
    pub fn confidence(&self) -> f32 {
        if let Some(confidence) = self.confidence {
            return confidence.clamp(0.0, 1.0);
        }

        let torso = [
            PoseLandmark::LeftShoulder,
            PoseLandmark::RightShoulder,
            PoseLandmark::LeftHip,
            PoseLandmark::RightHip,
        ];
        let values: Vec<f32> = torso
            .iter()
            .filter_map(|&index| self.pose(index))
            .map(|landmark| landmark.confidence)
            .collect();

        if values.is_empty() {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)] // at most four values
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        mean.clamp(0.0, 1.0)
    }
}
