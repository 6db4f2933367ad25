//! Local file frame source.
//!
//! This module provides `FileSource` for reading frames from recorded videos.
//! The backend is chosen by file name:
//! - `*.scene.json`: synthetic scene renderer (no decoder needed)
//! - anything else: FFmpeg decode (feature: ingest-file-ffmpeg)

use anyhow::{anyhow, Result};
use std::path::Path;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::scene::{SceneSource, SCENE_EXTENSION};
use super::FrameSource;
use crate::frame::Frame;

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
    next_index: u64,
}

enum FileBackend {
    Scene(SceneSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("video file not found: {}", path.display()));
        }
        let backend = if is_scene_path(path) {
            FileBackend::Scene(SceneSource::open(path)?)
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::open(path)?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "cannot decode {}: video decoding requires the ingest-file-ffmpeg feature",
                    path.display()
                ));
            }
        };
        log::debug!("FileSource: opened {}", path.display());
        Ok(Self {
            backend,
            next_index: 0,
        })
    }
}

impl FrameSource for FileSource {
    fn total_frames(&self) -> u64 {
        match &self.backend {
            FileBackend::Scene(source) => source.total_frames(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.total_frames(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.backend {
            FileBackend::Scene(source) => source.next_frame(self.next_index)?,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(self.next_index)?,
        };
        if frame.is_some() {
            self.next_index += 1;
        }
        Ok(frame)
    }
}

fn is_scene_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(&format!(".{}", SCENE_EXTENSION)))
}
