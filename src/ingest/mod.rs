//! Video frame sources.
//!
//! This module provides sources for decoded frames:
//! - Scene scripts (`*.scene.json`): synthetic marker videos, always available
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Sources yield frames strictly in original order, starting at index 0, and report the
//! declared frame count up front. No seeking is needed or offered.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod library;
pub mod scene;

use anyhow::Result;

use crate::frame::Frame;

pub use file::FileSource;
pub use library::VideoLibrary;
pub use scene::{SceneObject, SceneScript, SCENE_EXTENSION};

/// Sequential frame reader for one video.
pub trait FrameSource {
    /// Declared number of frames in the video.
    fn total_frames(&self) -> u64;

    /// Next frame in order; `Ok(None)` once readable data is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
