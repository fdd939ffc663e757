//! Confidence gating between the solver and the blender.

use crate::constants::{DEFAULT_CONFIDENCE_DECAY, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::pose::AvatarPose;
use log::{debug, trace};

/// Holds the last good pose while tracking confidence is low
///
/// A frame at or above the threshold is solved and its pose is held. A frame
/// below it re-emits the held pose with its confidence multiplied by the decay
/// factor, compounding per skipped frame. Before the first good frame nothing
/// is emitted.
#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    threshold: f32,
    decay: f32,
    held: Option<AvatarPose>,
}

impl ConfidenceGate {
    #[must_use]
    pub fn new(threshold: f32, decay: f32) -> Self {
        Self {
            threshold,
            decay,
            held: None,
        }
    }

    /// Update threshold and decay, keeping the held pose
    pub fn set_parameters(&mut self, threshold: f32, decay: f32) {
        self.threshold = threshold;
        self.decay = decay;
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Run `solve` if `confidence` passes, otherwise decay the held pose
    ///
    /// A passing frame whose solve yields nothing is treated like a skipped
    /// frame.
    pub fn admit<F>(&mut self, confidence: f32, timestamp: f64, solve: F) -> Option<AvatarPose>
    where
        F: FnOnce() -> Option<AvatarPose>,
    {
        if confidence >= self.threshold {
            if let Some(pose) = solve() {
                self.held = Some(pose.clone());
                return Some(pose);
            }
            debug!("Frame at {timestamp} ms passed the gate but produced no pose");
        }

        let held = self.held.as_mut()?;
        held.confidence *= self.decay;
        held.timestamp = timestamp;
        trace!("Holding pose at confidence {:.3}", held.confidence);
        Some(held.clone())
    }

    /// Last emitted pose, if any
    #[must_use]
    pub fn held(&self) -> Option<&AvatarPose> {
        self.held.as_ref()
    }

    /// Forget the held pose
    pub fn reset(&mut self) {
        self.held = None;
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_CONFIDENCE_DECAY)
    }
}
