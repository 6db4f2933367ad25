//! Request-level policy: ordering, degenerate regions and all-or-nothing responses.

use anyhow::{anyhow, Result};

use crate::detect::SharedDetector;
use crate::evaluator::RoiEvaluator;
use crate::histogram::BUCKET_COUNT;
use crate::ingest::VideoLibrary;
use crate::roi::{LineBoundary, Response, RoiResult};
use crate::track::TrackerSettings;

/// Runs one evaluator per region, strictly in submission order.
///
/// The detector is the only state shared between regions and requests; each region gets
/// fresh counters and trackers.
pub struct RequestOrchestrator {
    library: VideoLibrary,
    detector: SharedDetector,
    tracker: TrackerSettings,
    bucket_count: usize,
}

impl RequestOrchestrator {
    pub fn new(library: VideoLibrary, detector: SharedDetector, tracker: TrackerSettings) -> Self {
        Self {
            library,
            detector,
            tracker,
            bucket_count: BUCKET_COUNT,
        }
    }

    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Every result in order, or the first failure and nothing else.
    pub fn handle(&self, request: &[LineBoundary]) -> Response {
        match self.evaluate_all(request) {
            Ok(results) => Response::Results(results),
            Err(err) => {
                let message = format!("{:#}", err);
                log::warn!("request failed: {}", message);
                Response::error(message)
            }
        }
    }

    fn evaluate_all(&self, request: &[LineBoundary]) -> Result<Vec<RoiResult>> {
        if request.is_empty() {
            return Err(anyhow!("request contains no regions"));
        }
        request
            .iter()
            .filter(|boundary| {
                if boundary.is_degenerate() {
                    log::info!(
                        "skipping zero-length region {} at {:?}",
                        boundary.color,
                        boundary.start
                    );
                }
                !boundary.is_degenerate()
            })
            .try_fold(Vec::with_capacity(request.len()), |mut results, boundary| {
                results.push(self.evaluate(boundary)?);
                Ok(results)
            })
    }

    fn evaluate(&self, boundary: &LineBoundary) -> Result<RoiResult> {
        let evaluator = RoiEvaluator::new(boundary.clone(), self.tracker)
            .with_bucket_count(self.bucket_count);
        let mut detector = self
            .detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned"))?;
        evaluator.run(&self.library, &mut *detector)
    }
}
