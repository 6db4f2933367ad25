//! Identity tracking across frames.
//!
//! A tracker receives one class's detections per frame and returns the detections it
//! could associate, each tagged with an identity that stays stable for as long as the
//! object keeps being seen (with a bounded tolerance for missed frames).

mod bytetrack;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::detect::Detection;

pub use bytetrack::ByteTracker;

/// A detection plus its persistent identity.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedDetection {
    pub tracker_id: u32,
    pub detection: Detection,
}

pub trait Tracker: Send {
    /// Feed one frame's detections; returns the detections tracked in this frame.
    fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackedDetection>>;
}

/// Association parameters. Defaults match the deployed counter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Minimum confidence for a detection to start a new track.
    pub track_activation_threshold: f32,
    /// Detections below this confidence are ignored entirely.
    pub low_score_threshold: f32,
    /// Frames a track survives without a matching detection.
    pub lost_track_buffer: u32,
    /// Largest accepted association cost, where cost is `1 - IoU`.
    pub minimum_matching_threshold: f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            track_activation_threshold: 0.25,
            low_score_threshold: 0.1,
            lost_track_buffer: 30,
            minimum_matching_threshold: 0.7,
        }
    }
}
