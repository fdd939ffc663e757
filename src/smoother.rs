//! Per-landmark temporal smoothing.
//!
//! Every landmark axis gets its own filter instance, created on first use
//! from the configured [`FilterKind`]. Timestamps are milliseconds and must
//! not decrease; a regression resets all filters and the offending input is
//! returned raw.

use crate::{
    constants::{NUM_HAND_LANDMARKS, NUM_POSE_LANDMARKS},
    filters::{FilterKind, LandmarkFilter},
    landmarks::{Landmark3D, TrackingFrame},
    Result,
};
use log::{debug, warn};

const NUM_SLOTS: usize = NUM_POSE_LANDMARKS + 2 * NUM_HAND_LANDMARKS;

/// Identifies one tracked point across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkSlot {
    Pose(usize),
    LeftHand(usize),
    RightHand(usize),
}

impl LandmarkSlot {
    /// Flat channel index, `None` when the landmark index is out of range
    fn index(self) -> Option<usize> {
        match self {
            Self::Pose(i) if i < NUM_POSE_LANDMARKS => Some(i),
            Self::LeftHand(i) if i < NUM_HAND_LANDMARKS => Some(NUM_POSE_LANDMARKS + i),
            Self::RightHand(i) if i < NUM_HAND_LANDMARKS => Some(NUM_POSE_LANDMARKS + NUM_HAND_LANDMARKS + i),
            _ => None,
        }
    }
}

/// Filters for the x, y, z axes of one landmark
struct Channel {
    axes: [Box<dyn LandmarkFilter>; 3],
    last_timestamp: f64,
}

impl Channel {
    fn new(kind: &FilterKind, timestamp: f64) -> Self {
        Self {
            axes: std::array::from_fn(|_| kind.instantiate()),
            last_timestamp: timestamp,
        }
    }
}

/// Stateful landmark smoother for one tracked person
pub struct LandmarkSmoother {
    kind: FilterKind,
    channels: Vec<Option<Channel>>,
    last_frame_timestamp: Option<f64>,
}

impl LandmarkSmoother {
    /// Create a smoother whose channels use `kind`
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` if `kind` has out-of-range parameters.
    pub fn new(kind: FilterKind) -> Result<Self> {
        kind.validate()?;
        Ok(Self {
            kind,
            channels: std::iter::repeat_with(|| None).take(NUM_SLOTS).collect(),
            last_frame_timestamp: None,
        })
    }

    /// Filter kind used for new channels
    #[must_use]
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Switch filter kind; existing state is discarded
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` and keeps the current kind and state if
    /// `kind` is invalid.
    pub fn set_kind(&mut self, kind: FilterKind) -> Result<()> {
        kind.validate()?;
        self.kind = kind;
        self.reset();
        Ok(())
    }

    /// Clear all filter state (tracking lost, session restart)
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            *channel = None;
        }
        self.last_frame_timestamp = None;
    }

    /// Smooth one landmark observed at `timestamp` milliseconds
    pub fn smooth(&mut self, slot: LandmarkSlot, landmark: &Landmark3D, timestamp: f64) -> Landmark3D {
        let Some(index) = slot.index() else {
            return *landmark;
        };
        if !landmark.is_finite() {
            return *landmark;
        }

        if let Some(channel) = &self.channels[index] {
            if timestamp < channel.last_timestamp {
                warn!(
                    "Clock regression on {slot:?} ({} ms -> {timestamp} ms), resetting smoother",
                    channel.last_timestamp
                );
                self.reset();
            }
        }

        let kind = self.kind;
        let channel = self.channels[index].get_or_insert_with(|| Channel::new(&kind, timestamp));

        #[allow(clippy::cast_possible_truncation)] // frame gaps are far below f32 range
        let dt = ((timestamp - channel.last_timestamp) / 1000.0) as f32;
        channel.last_timestamp = timestamp;

        Landmark3D {
            x: channel.axes[0].apply(landmark.x, dt),
            y: channel.axes[1].apply(landmark.y, dt),
            z: channel.axes[2].apply(landmark.z, dt),
            confidence: landmark.confidence,
        }
    }

    /// Smooth every landmark of a frame
    ///
    /// A frame older than the previous one resets the smoother and is
    /// returned unchanged.
    pub fn smooth_frame(&mut self, frame: &TrackingFrame) -> TrackingFrame {
        let timestamp = frame.timestamp;
        if let Some(last) = self.last_frame_timestamp {
            if timestamp < last {
                warn!("Clock regression ({last} ms -> {timestamp} ms), resetting smoother");
                self.reset();
                self.last_frame_timestamp = Some(timestamp);
                return frame.clone();
            }
        } else {
            debug!("Smoother starting at {timestamp} ms with {}", self.kind_name());
        }
        self.last_frame_timestamp = Some(timestamp);

        let pose_landmarks = frame
            .pose_landmarks
            .iter()
            .enumerate()
            .map(|(i, l)| self.smooth(LandmarkSlot::Pose(i), l, timestamp))
            .collect();
        let left_hand = frame.left_hand.as_ref().map(|hand| {
            hand.iter()
                .enumerate()
                .map(|(i, l)| self.smooth(LandmarkSlot::LeftHand(i), l, timestamp))
                .collect()
        });
        let right_hand = frame.right_hand.as_ref().map(|hand| {
            hand.iter()
                .enumerate()
                .map(|(i, l)| self.smooth(LandmarkSlot::RightHand(i), l, timestamp))
                .collect()
        });

        TrackingFrame {
            timestamp,
            pose_landmarks,
            left_hand,
            right_hand,
            confidence: frame.confidence,
        }
    }

    fn kind_name(&self) -> String {
        self.kind.instantiate().name().to_string()
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self {
            kind: FilterKind::default(),
            channels: std::iter::repeat_with(|| None).take(NUM_SLOTS).collect(),
            last_frame_timestamp: None,
        }
    }
}
