//! Per-class crossing counter.

use anyhow::Result;

use crate::detect::{Detection, ObjectClass};
use crate::histogram::bucket_intervals;
use crate::roi::LineBoundary;
use crate::track::Tracker;
use crate::zone::LineZone;

/// Tracks one class against one line and records when its crossing count rose.
///
/// The count never decreases. `crossing_frames` holds one entry per unit of increase, so
/// two objects crossing in the same frame record that frame twice.
pub struct ClassCrossingCounter {
    class: ObjectClass,
    tracker: Box<dyn Tracker>,
    zone: LineZone,
    count: u64,
    crossing_frames: Vec<u64>,
}

impl ClassCrossingCounter {
    pub fn new(class: ObjectClass, tracker: Box<dyn Tracker>, boundary: &LineBoundary) -> Self {
        Self {
            class,
            tracker,
            zone: LineZone::new(boundary.start, boundary.end),
            count: 0,
            crossing_frames: Vec::new(),
        }
    }

    /// Feed this class's detections for frame `frame_index`.
    pub fn observe(&mut self, detections: &[Detection], frame_index: u64) -> Result<()> {
        let tracked = self.tracker.update(detections)?;
        self.zone.trigger(&tracked);

        let total = self.zone.total_count();
        if total > self.count {
            let added = total - self.count;
            log::debug!(
                "{}: {} crossing(s) at frame {} (in {}, out {})",
                self.class,
                added,
                frame_index,
                self.zone.in_count(),
                self.zone.out_count()
            );
            self.crossing_frames
                .extend(std::iter::repeat(frame_index).take(added as usize));
            self.count = total;
        }
        Ok(())
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    /// Cumulative crossings so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn crossing_frames(&self) -> &[u64] {
        &self.crossing_frames
    }

    pub fn histogram(&self, total_frames: u64, bucket_count: usize) -> Vec<u64> {
        bucket_intervals(&self.crossing_frames, total_frames, bucket_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::roi::{ColorTag, Point};
    use crate::track::TrackedDetection;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    /// Replays fixed (id, y) positions per frame, ignoring its input.
    struct ScriptedTracker {
        frames: VecDeque<Vec<(u32, f32)>>,
    }

    impl ScriptedTracker {
        fn new(frames: Vec<Vec<(u32, f32)>>) -> Box<Self> {
            Box::new(Self {
                frames: frames.into(),
            })
        }
    }

    impl Tracker for ScriptedTracker {
        fn update(&mut self, _detections: &[Detection]) -> Result<Vec<TrackedDetection>> {
            let frame = self
                .frames
                .pop_front()
                .ok_or_else(|| anyhow!("tracker script exhausted"))?;
            Ok(frame
                .into_iter()
                .map(|(id, y)| TrackedDetection {
                    tracker_id: id,
                    detection: Detection {
                        bbox: BoundingBox::new(10.0 * id as f32, y, 10.0 * id as f32 + 5.0, y + 5.0),
                        confidence: 0.9,
                        class: ObjectClass::Bus,
                    },
                })
                .collect())
        }
    }

    fn boundary() -> LineBoundary {
        LineBoundary::new(Point(0, 50), Point(200, 50), ColorTag::Red, "v")
    }

    #[test]
    fn records_frame_once_per_unit_of_increase() -> Result<()> {
        let tracker = ScriptedTracker::new(vec![
            vec![(1, 10.0), (2, 10.0), (3, 10.0)],
            vec![(1, 60.0), (2, 60.0), (3, 10.0)],
            vec![(3, 60.0)],
        ]);
        let mut counter = ClassCrossingCounter::new(ObjectClass::Bus, tracker, &boundary());
        for frame in 0..3 {
            counter.observe(&[], frame + 4)?;
        }
        assert_eq!(counter.count(), 3);
        assert_eq!(counter.crossing_frames(), &[5, 5, 6]);
        assert_eq!(counter.class(), ObjectClass::Bus);
        Ok(())
    }

    #[test]
    fn count_is_monotonic_and_matches_histogram_total() -> Result<()> {
        let tracker = ScriptedTracker::new(vec![
            vec![(1, 10.0)],
            vec![(1, 60.0)],
            vec![],
            vec![(1, 10.0)],
            vec![(1, 60.0)],
        ]);
        let mut counter = ClassCrossingCounter::new(ObjectClass::Bus, tracker, &boundary());
        let mut last = 0;
        for frame in 0..5 {
            counter.observe(&[], frame)?;
            assert!(counter.count() >= last);
            last = counter.count();
        }
        assert_eq!(counter.crossing_frames(), &[1, 3, 4]);
        let histogram = counter.histogram(6, 6);
        assert_eq!(histogram, vec![1, 0, 1, 1, 0, 0]);
        assert_eq!(histogram.iter().sum::<u64>(), counter.count());
        Ok(())
    }

    #[test]
    fn tracker_faults_propagate() {
        let tracker = ScriptedTracker::new(vec![]);
        let mut counter = ClassCrossingCounter::new(ObjectClass::Bus, tracker, &boundary());
        assert!(counter.observe(&[], 0).is_err());
        assert_eq!(counter.count(), 0);
    }
}
