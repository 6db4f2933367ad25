use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, ObjectClass};
use crate::frame::Frame;

const MARKER_TAG: u8 = 0xFF;
const MARKER_BASE: u8 = 0x20;
const MARKER_STEP: u8 = 0x20;
const MARKER_CONFIDENCE: f32 = 0.9;

/// Solid fill colour that marks a pixel as belonging to an object of `class`.
///
/// Scene videos paint objects with these colours; `MarkerBackend` reads them back.
pub fn marker_color(class: ObjectClass) -> [u8; 3] {
    [
        MARKER_BASE + MARKER_STEP * class.index() as u8,
        MARKER_TAG,
        0,
    ]
}

fn class_at(px: &[u8]) -> Option<ObjectClass> {
    if px[1] != MARKER_TAG || px[2] != 0 {
        return None;
    }
    ObjectClass::ALL
        .into_iter()
        .find(|class| marker_color(*class)[0] == px[0])
}

/// CPU detector for marker-painted frames.
///
/// Every 4-connected region of one class's marker colour becomes one detection whose box
/// is the region's pixel extent. Stateless between calls.
pub struct MarkerBackend {
    min_area: u32,
}

impl MarkerBackend {
    pub fn new() -> Self {
        Self { min_area: 4 }
    }

    /// Regions smaller than this many pixels are ignored.
    pub fn with_min_area(mut self, min_area: u32) -> Self {
        self.min_area = min_area;
        self
    }
}

impl Default for MarkerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for MarkerBackend {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let width = frame.width();
        let height = frame.height();
        let mut visited = vec![false; width as usize * height as usize];
        let mut detections = Vec::new();
        let mut stack = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                if visited[idx] {
                    continue;
                }
                visited[idx] = true;
                let Some(class) = class_at(frame.pixel(x, y)) else {
                    continue;
                };

                let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
                let mut area = 0u32;
                stack.push((x, y));
                while let Some((cx, cy)) = stack.pop() {
                    area += 1;
                    min_x = min_x.min(cx);
                    min_y = min_y.min(cy);
                    max_x = max_x.max(cx);
                    max_y = max_y.max(cy);

                    let neighbours = [
                        (cx.wrapping_sub(1), cy),
                        (cx + 1, cy),
                        (cx, cy.wrapping_sub(1)),
                        (cx, cy + 1),
                    ];
                    for (nx, ny) in neighbours {
                        if nx >= width || ny >= height {
                            continue;
                        }
                        let nidx = (ny * width + nx) as usize;
                        if visited[nidx] || class_at(frame.pixel(nx, ny)) != Some(class) {
                            continue;
                        }
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                }

                if area < self.min_area {
                    continue;
                }
                detections.push(Detection {
                    bbox: BoundingBox::new(
                        min_x as f32,
                        min_y as f32,
                        (max_x + 1) as f32,
                        (max_y + 1) as f32,
                    ),
                    confidence: MARKER_CONFIDENCE,
                    class,
                });
            }
        }

        Ok(detections)
    }
}
