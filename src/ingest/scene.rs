//! Synthetic scene videos.
//!
//! A scene script describes a video as a list of objects moving in straight lines. Each
//! frame is rendered in memory: black background, every visible object painted as a solid
//! rectangle in its class's marker colour (see `detect::marker_color`). Scenes exist so the
//! whole counting pipeline can run against reproducible fixtures without a video decoder.
//!
//! `readable_frames` models a truncated file: the declared length stays `frames`, but only
//! the first `readable_frames` frames can be read.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detect::{marker_color, ObjectClass};
use crate::frame::{Frame, CHANNELS};

/// File suffix that selects the scene backend.
pub const SCENE_EXTENSION: &str = "scene.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneScript {
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable_frames: Option<u64>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

/// One object visible from `first_frame` to `last_frame` inclusive, its centre moving
/// linearly from `from` to `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub class: ObjectClass,
    pub first_frame: u64,
    pub last_frame: u64,
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub size: [u32; 2],
}

impl SceneObject {
    /// Pixel rectangle `(x0, y0, x1, y1)` at `frame`, clipped to the frame, or `None` when
    /// the object is not visible.
    fn rect_at(&self, frame: u64, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if frame < self.first_frame || frame > self.last_frame {
            return None;
        }
        let span = self.last_frame - self.first_frame;
        let t = if span == 0 {
            0.0
        } else {
            (frame - self.first_frame) as f64 / span as f64
        };
        let cx = self.from[0] + (self.to[0] - self.from[0]) * t;
        let cy = self.from[1] + (self.to[1] - self.from[1]) * t;
        let x0 = (cx - self.size[0] as f64 / 2.0).round() as i64;
        let y0 = (cy - self.size[1] as f64 / 2.0).round() as i64;
        let x1 = x0 + self.size[0] as i64;
        let y1 = y0 + self.size[1] as i64;

        let clip = |v: i64, max: u32| v.clamp(0, max as i64) as u32;
        let rect = (clip(x0, width), clip(y0, height), clip(x1, width), clip(y1, height));
        if rect.0 >= rect.2 || rect.1 >= rect.3 {
            return None;
        }
        Some(rect)
    }
}

impl SceneScript {
    pub fn new(width: u32, height: u32, frames: u64) -> Self {
        Self {
            width,
            height,
            frames,
            readable_frames: None,
            objects: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Truncate readable data after `readable` frames.
    pub fn truncated_at(mut self, readable: u64) -> Self {
        self.readable_frames = Some(readable);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        let script: SceneScript = serde_json::from_str(&raw)
            .with_context(|| format!("invalid scene {}", path.display()))?;
        script.validate()?;
        Ok(script)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write scene {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("scene dimensions must be non-zero"));
        }
        if let Some(readable) = self.readable_frames {
            if readable > self.frames {
                return Err(anyhow!(
                    "readable_frames ({}) exceeds declared frames ({})",
                    readable,
                    self.frames
                ));
            }
        }
        for (i, object) in self.objects.iter().enumerate() {
            if object.first_frame > object.last_frame {
                return Err(anyhow!("scene object {} ends before it starts", i));
            }
            if object.size[0] == 0 || object.size[1] == 0 {
                return Err(anyhow!("scene object {} has zero size", i));
            }
        }
        Ok(())
    }

    /// Render frame `index` as packed RGB24. Later objects paint over earlier ones.
    pub fn render(&self, index: u64) -> Vec<u8> {
        let mut pixels = vec![0u8; self.width as usize * self.height as usize * CHANNELS];
        for object in &self.objects {
            let Some((x0, y0, x1, y1)) = object.rect_at(index, self.width, self.height) else {
                continue;
            };
            let colour = marker_color(object.class);
            for y in y0..y1 {
                let row = y as usize * self.width as usize;
                for x in x0..x1 {
                    let offset = (row + x as usize) * CHANNELS;
                    pixels[offset..offset + CHANNELS].copy_from_slice(&colour);
                }
            }
        }
        pixels
    }
}

pub(crate) struct SceneSource {
    path: PathBuf,
    script: SceneScript,
}

impl SceneSource {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let script = SceneScript::load(path)?;
        log::debug!(
            "SceneSource: {} ({}x{}, {} frames, {} objects)",
            path.display(),
            script.width,
            script.height,
            script.frames,
            script.objects.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            script,
        })
    }

    pub(crate) fn total_frames(&self) -> u64 {
        self.script.frames
    }

    pub(crate) fn next_frame(&mut self, index: u64) -> Result<Option<Frame>> {
        let readable = self.script.readable_frames.unwrap_or(self.script.frames);
        if index >= readable {
            if index < self.script.frames {
                log::debug!(
                    "SceneSource: {} truncated at frame {}",
                    self.path.display(),
                    index
                );
            }
            return Ok(None);
        }
        let pixels = self.script.render(index);
        Frame::new(index, self.script.width, self.script.height, pixels).map(Some)
    }
}
