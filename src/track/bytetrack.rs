//! ByteTrack-style association.
//!
//! 1. Every track predicts its next box from its last displacement.
//! 2. High-score detections are matched to all tracks by IoU.
//! 3. Low-score detections rescue tracks left unmatched.
//! 4. Unmatched high-score detections start new tracks.
//! 5. Tracks unmatched for more than `lost_track_buffer` frames are dropped.
//!
//! Matching is greedy on ascending cost with index tie-breaks, so the same input always
//! yields the same identities.

use anyhow::{anyhow, Result};

use super::{TrackedDetection, Tracker, TrackerSettings};
use crate::detect::{BoundingBox, Detection};

struct Track {
    id: u32,
    bbox: BoundingBox,
    velocity: (f32, f32),
    frames_lost: u32,
}

impl Track {
    /// Last seen box advanced by one step per frame since it was seen.
    fn predicted(&self) -> BoundingBox {
        let steps = (self.frames_lost + 1) as f32;
        self.bbox.translate(self.velocity.0 * steps, self.velocity.1 * steps)
    }

    fn update(&mut self, bbox: BoundingBox) {
        let (ox, oy) = self.bbox.center();
        let (nx, ny) = bbox.center();
        // spread the displacement over any frames the track was lost for
        let steps = (self.frames_lost + 1) as f32;
        self.velocity = ((nx - ox) / steps, (ny - oy) / steps);
        self.bbox = bbox;
        self.frames_lost = 0;
    }

    fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }
}

pub struct ByteTracker {
    tracks: Vec<Track>,
    next_id: u32,
    settings: TrackerSettings,
}

impl ByteTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            settings,
        }
    }

    /// Tracks currently alive, including ones coasting through missed frames.
    pub fn live_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Greedy IoU matching. Returns `(detection index, track index)` pairs.
    fn associate(
        &self,
        detections: &[Detection],
        det_indices: &[usize],
        track_indices: &[usize],
        predictions: &[BoundingBox],
    ) -> Vec<(usize, usize)> {
        let mut candidates = Vec::new();
        for &d in det_indices {
            for &t in track_indices {
                let cost = 1.0 - detections[d].bbox.iou(&predictions[t]);
                if cost <= self.settings.minimum_matching_threshold {
                    candidates.push((cost, d, t));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; self.tracks.len()];
        let mut pairs = Vec::new();
        for (_, d, t) in candidates {
            if !used_det[d] && !used_track[t] {
                used_det[d] = true;
                used_track[t] = true;
                pairs.push((d, t));
            }
        }
        pairs
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

impl Tracker for ByteTracker {
    fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackedDetection>> {
        if let Some(bad) = detections.iter().find(|d| !d.bbox.is_finite()) {
            return Err(anyhow!("detector returned a non-finite box: {:?}", bad.bbox));
        }

        let predictions: Vec<BoundingBox> = self.tracks.iter().map(Track::predicted).collect();
        let (high, low): (Vec<usize>, Vec<usize>) = (0..detections.len())
            .filter(|&i| detections[i].confidence >= self.settings.low_score_threshold)
            .partition(|&i| detections[i].confidence >= self.settings.track_activation_threshold);

        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let mut assigned: Vec<Option<usize>> = vec![None; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        for (d, t) in self.associate(detections, &high, &all_tracks, &predictions) {
            assigned[d] = Some(t);
            matched_track[t] = true;
        }

        let unmatched: Vec<usize> = all_tracks
            .iter()
            .copied()
            .filter(|&t| !matched_track[t])
            .collect();
        for (d, t) in self.associate(detections, &low, &unmatched, &predictions) {
            assigned[d] = Some(t);
            matched_track[t] = true;
        }

        let mut output = Vec::new();
        for (d, detection) in detections.iter().enumerate() {
            let id = match assigned[d] {
                Some(t) => {
                    self.tracks[t].update(detection.bbox);
                    self.tracks[t].id
                }
                None if detection.confidence >= self.settings.track_activation_threshold => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.push(Track {
                        id,
                        bbox: detection.bbox,
                        velocity: (0.0, 0.0),
                        frames_lost: 0,
                    });
                    id
                }
                None => continue,
            };
            output.push(TrackedDetection {
                tracker_id: id,
                detection: detection.clone(),
            });
        }

        for (t, matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[t].mark_lost();
            }
        }
        let buffer = self.settings.lost_track_buffer;
        self.tracks.retain(|track| track.frames_lost <= buffer);

        Ok(output)
    }
}
