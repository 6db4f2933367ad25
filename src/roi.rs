//! Region boundaries and the request/response payloads.
//!
//! Field order of every serialized struct is part of the wire format; result consumers
//! read `person, bicycle, motorcycle, car, bus, truck, color` in that order.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::detect::ObjectClass;
use crate::histogram::BUCKET_COUNT;

/// Colour tag identifying a region to the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Green,
    Red,
}

impl ColorTag {
    pub const ALL: [ColorTag; 3] = [ColorTag::Blue, ColorTag::Green, ColorTag::Red];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorTag::Blue => "blue",
            ColorTag::Green => "green",
            ColorTag::Red => "red",
        }
    }
}

impl fmt::Display for ColorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ColorTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown color tag '{}' (expected blue, green or red)", s))
    }
}

/// Integer pixel coordinate. Serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point(pub i32, pub i32);

impl Point {
    pub fn x(self) -> i32 {
        self.0
    }

    pub fn y(self) -> i32 {
        self.1
    }
}

/// One user-drawn line and the video it applies to. Immutable once submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBoundary {
    pub start: Point,
    pub end: Point,
    pub color: ColorTag,
    pub video: String,
}

impl LineBoundary {
    pub fn new(start: Point, end: Point, color: ColorTag, video: impl Into<String>) -> Self {
        Self {
            start,
            end,
            color,
            video: video.into(),
        }
    }

    /// A zero-length line has no crossing geometry and is skipped by the orchestrator.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// Per-class interval histogram for one region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiResult {
    pub person: Vec<u64>,
    pub bicycle: Vec<u64>,
    pub motorcycle: Vec<u64>,
    pub car: Vec<u64>,
    pub bus: Vec<u64>,
    pub truck: Vec<u64>,
    pub color: ColorTag,
}

impl RoiResult {
    /// All-zero histogram with the standard bucket count.
    pub fn empty(color: ColorTag) -> Self {
        Self::with_bucket_count(color, BUCKET_COUNT)
    }

    pub fn with_bucket_count(color: ColorTag, bucket_count: usize) -> Self {
        let zeros = vec![0; bucket_count];
        Self {
            person: zeros.clone(),
            bicycle: zeros.clone(),
            motorcycle: zeros.clone(),
            car: zeros.clone(),
            bus: zeros.clone(),
            truck: zeros,
            color,
        }
    }

    pub fn counts(&self, class: ObjectClass) -> &[u64] {
        match class {
            ObjectClass::Person => &self.person,
            ObjectClass::Bicycle => &self.bicycle,
            ObjectClass::Motorcycle => &self.motorcycle,
            ObjectClass::Car => &self.car,
            ObjectClass::Bus => &self.bus,
            ObjectClass::Truck => &self.truck,
        }
    }

    pub fn counts_mut(&mut self, class: ObjectClass) -> &mut Vec<u64> {
        match class {
            ObjectClass::Person => &mut self.person,
            ObjectClass::Bicycle => &mut self.bicycle,
            ObjectClass::Motorcycle => &mut self.motorcycle,
            ObjectClass::Car => &mut self.car,
            ObjectClass::Bus => &mut self.bus,
            ObjectClass::Truck => &mut self.truck,
        }
    }

    /// Total crossings for a class across all intervals.
    pub fn total(&self, class: ObjectClass) -> u64 {
        self.counts(class).iter().sum()
    }
}

/// Whole-request failure. Replaces every region result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

/// What the server writes back for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error(ErrorResult),
    Results(Vec<RoiResult>),
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResult {
            error: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_line_is_degenerate() {
        let roi = LineBoundary::new(Point(10, 10), Point(10, 10), ColorTag::Red, "sample");
        assert!(roi.is_degenerate());
    }

    #[test]
    fn axis_aligned_lines_are_not_degenerate() {
        let horizontal = LineBoundary::new(Point(0, 200), Point(400, 200), ColorTag::Blue, "v");
        let vertical = LineBoundary::new(Point(50, 0), Point(50, 300), ColorTag::Green, "v");
        assert!(!horizontal.is_degenerate());
        assert!(!vertical.is_degenerate());
    }

    #[test]
    fn result_serializes_in_wire_field_order() {
        let mut result = RoiResult::empty(ColorTag::Green);
        result.counts_mut(ObjectClass::Car)[2] = 4;
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"person":[0,0,0,0,0,0],"bicycle":[0,0,0,0,0,0],"motorcycle":[0,0,0,0,0,0],"car":[0,0,4,0,0,0],"bus":[0,0,0,0,0,0],"truck":[0,0,0,0,0,0],"color":"green"}"#
        );
        assert_eq!(result.total(ObjectClass::Car), 4);
    }

    #[test]
    fn response_decodes_error_and_result_shapes() {
        let err: Response = serde_json::from_str(r#"{"error":"video missing"}"#).unwrap();
        assert_eq!(err, Response::error("video missing"));

        let ok: Response = serde_json::from_str("[]").unwrap();
        assert_eq!(ok, Response::Results(vec![]));
        assert!(!ok.is_error());
    }

    #[test]
    fn color_tag_parses_case_insensitively() {
        assert_eq!("Blue".parse::<ColorTag>().unwrap(), ColorTag::Blue);
        assert!("purple".parse::<ColorTag>().is_err());
    }
}
