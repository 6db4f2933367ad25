//! One full video pass for one region.

use anyhow::{anyhow, Context, Result};

use crate::counter::ClassCrossingCounter;
use crate::detect::{partition_by_class, DetectorBackend, ObjectClass};
use crate::histogram::BUCKET_COUNT;
use crate::ingest::{FrameSource, VideoLibrary};
use crate::roi::{LineBoundary, RoiResult};
use crate::track::{ByteTracker, Tracker, TrackerSettings};

/// Owns a region's boundary and one crossing counter per tracked class.
///
/// Counters are held in `ObjectClass::ALL` order and updated in that order on every frame.
/// An evaluator runs exactly once; all state is dropped with it.
pub struct RoiEvaluator {
    boundary: LineBoundary,
    counters: Vec<ClassCrossingCounter>,
    bucket_count: usize,
}

impl RoiEvaluator {
    /// Evaluator with a fresh `ByteTracker` per class.
    pub fn new(boundary: LineBoundary, settings: TrackerSettings) -> Self {
        Self::with_trackers(boundary, |_| Box::new(ByteTracker::new(settings)))
    }

    pub fn with_trackers<F>(boundary: LineBoundary, mut make_tracker: F) -> Self
    where
        F: FnMut(ObjectClass) -> Box<dyn Tracker>,
    {
        let counters = ObjectClass::ALL
            .into_iter()
            .map(|class| ClassCrossingCounter::new(class, make_tracker(class), &boundary))
            .collect();
        Self {
            boundary,
            counters,
            bucket_count: BUCKET_COUNT,
        }
    }

    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Open the region's video and process it end to end.
    pub fn run(self, library: &VideoLibrary, detector: &mut dyn DetectorBackend) -> Result<RoiResult> {
        let mut source = library
            .open(&self.boundary.video)
            .with_context(|| format!("cannot open video '{}'", self.boundary.video))?;
        self.process(&mut source, detector)
    }

    /// Pull every frame from `source`, detect, and feed each class's counter.
    ///
    /// Every readable frame is consumed. Running out of data before the declared length is
    /// a fault and no partial result is ever produced; frames past the declared length
    /// extend the interval span instead.
    pub fn process<S>(mut self, source: &mut S, detector: &mut dyn DetectorBackend) -> Result<RoiResult>
    where
        S: FrameSource + ?Sized,
    {
        let declared_frames = source.total_frames();
        log::info!(
            "region {} on '{}': {} frames, line {:?} -> {:?}",
            self.boundary.color,
            self.boundary.video,
            declared_frames,
            self.boundary.start,
            self.boundary.end
        );

        let mut processed = 0u64;
        while let Some(frame) = source
            .next_frame()
            .with_context(|| format!("decode failed at frame {}", processed))?
        {
            let index = frame.index();
            let detections = detector
                .detect(&frame)
                .with_context(|| format!("detector '{}' failed at frame {}", detector.name(), index))?;

            let per_class = partition_by_class(detections);
            for counter in &mut self.counters {
                counter
                    .observe(&per_class[counter.class().index()], index)
                    .with_context(|| format!("tracking {} failed at frame {}", counter.class(), index))?;
            }
            processed += 1;
        }

        if processed < declared_frames {
            return Err(anyhow!(
                "video '{}' ended after {} of {} frames",
                self.boundary.video,
                processed,
                declared_frames
            ));
        }
        // intervals span what was actually read when the declared length undercounts
        let total_frames = processed;
        if total_frames > declared_frames {
            log::warn!(
                "video '{}' declared {} frames but {} were read",
                self.boundary.video,
                declared_frames,
                total_frames
            );
        }

        let mut result = RoiResult::with_bucket_count(self.boundary.color, self.bucket_count);
        for counter in &self.counters {
            *result.counts_mut(counter.class()) = counter.histogram(total_frames, self.bucket_count);
        }
        log::info!(
            "region {} on '{}' done: {}",
            self.boundary.color,
            self.boundary.video,
            self.counters
                .iter()
                .map(|c| format!("{}={}", c.class(), c.count()))
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(result)
    }
}
