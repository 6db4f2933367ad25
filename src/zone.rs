//! Line-crossing geometry.
//!
//! A `LineZone` remembers, per tracker id, which side of the segment the object was last
//! seen on. A box only has a side when all four corners lie within the segment's extent
//! and on the same side of it; boxes straddling the line or hanging past its ends are
//! ignored for that frame. A corner lying exactly on the line counts as the negative side,
//! so a box resting on the line from the negative side does not flip. A crossing is a side
//! flip of a known id.

use std::collections::HashMap;

use crate::roi::Point;
use crate::track::TrackedDetection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Negative,
    Positive,
}

pub struct LineZone {
    start: (f64, f64),
    end: (f64, f64),
    sides: HashMap<u32, Side>,
    in_count: u64,
    out_count: u64,
}

impl LineZone {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start: (f64::from(start.x()), f64::from(start.y())),
            end: (f64::from(end.x()), f64::from(end.y())),
            sides: HashMap::new(),
            in_count: 0,
            out_count: 0,
        }
    }

    /// Update the zone with one frame's tracked detections.
    /// Returns how many crossings this frame added.
    pub fn trigger(&mut self, tracked: &[TrackedDetection]) -> u64 {
        let before = self.total_count();
        for item in tracked {
            let Some(side) = self.box_side(item) else {
                continue;
            };
            match self.sides.insert(item.tracker_id, side) {
                Some(Side::Negative) if side == Side::Positive => self.in_count += 1,
                Some(Side::Positive) if side == Side::Negative => self.out_count += 1,
                _ => {}
            }
        }
        self.total_count() - before
    }

    /// Crossings from the negative to the positive side.
    pub fn in_count(&self) -> u64 {
        self.in_count
    }

    pub fn out_count(&self) -> u64 {
        self.out_count
    }

    /// Crossings in either direction.
    pub fn total_count(&self) -> u64 {
        self.in_count + self.out_count
    }

    fn box_side(&self, item: &TrackedDetection) -> Option<Side> {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let length_sq = dx * dx + dy * dy;
        if length_sq == 0.0 {
            return None;
        }

        let mut side = None;
        for (x, y) in item.detection.bbox.corners() {
            let (px, py) = (f64::from(x) - self.start.0, f64::from(y) - self.start.1);
            let t = (px * dx + py * dy) / length_sq;
            if !(0.0..=1.0).contains(&t) {
                return None;
            }
            let corner_side = if dx * py - dy * px > 0.0 {
                Side::Positive
            } else {
                Side::Negative
            };
            match side {
                None => side = Some(corner_side),
                Some(existing) if existing != corner_side => return None,
                Some(_) => {}
            }
        }
        side
    }
}
