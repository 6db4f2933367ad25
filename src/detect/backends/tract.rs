use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, ObjectClass};
use crate::frame::{Frame, CHANNELS};

/// Tract-based backend for YOLOv8 ONNX exports.
///
/// Expects a square `[1, 3, S, S]` input and a `[1, 4 + C, N]` output (box centre, size,
/// then per-class scores over the COCO label set). Frames are resampled to the model input
/// size; boxes are scaled back to frame pixels.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        if width == 0 || height == 0 {
            return Err(anyhow!("frame {} has no pixels", frame.index()));
        }
        let side = self.input_size as usize;
        let pixels = frame.pixels();
        // nearest-neighbour resample straight into NCHW
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            let sx = x * width / side;
            let sy = y * height / side;
            pixels[(sy * width + sx) * CHANNELS + channel] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output is not [1, 4 + classes, anchors]")?;
        let rows = view.shape()[1];
        if rows <= 4 {
            return Err(anyhow!("model output has no class scores"));
        }

        let scale_x = frame.width() as f32 / self.input_size as f32;
        let scale_y = frame.height() as f32 / self.input_size as f32;
        let mut candidates = Vec::new();
        for anchor in 0..view.shape()[2] {
            let (mut best_id, mut best_score) = (0usize, f32::NEG_INFINITY);
            for row in 4..rows {
                let score = view[[0, row, anchor]];
                if score > best_score {
                    best_id = row - 4;
                    best_score = score;
                }
            }
            if best_score < self.confidence_threshold {
                continue;
            }
            let Some(class) = ObjectClass::from_coco_id(best_id as u32) else {
                continue;
            };
            let bbox = BoundingBox::from_center(
                view[[0, 0, anchor]] * scale_x,
                view[[0, 1, anchor]] * scale_y,
                view[[0, 2, anchor]] * scale_x,
                view[[0, 3, anchor]] * scale_y,
            );
            candidates.push(Detection {
                bbox,
                confidence: best_score,
                class,
            });
        }

        Ok(non_max_suppression(candidates, self.iou_threshold))
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class == candidate.class && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let blank = Frame::new(0, side, side, vec![0; (side * side) as usize * CHANNELS])?;
        self.detect(&blank).map(|_| ())
    }
}
