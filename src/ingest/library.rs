//! Maps video ids from requests to files under the assets directory.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use super::file::FileSource;

/// Resolves video identifiers to files under a fixed assets directory.
#[derive(Clone, Debug)]
pub struct VideoLibrary {
    assets_dir: PathBuf,
    extension: String,
}

impl VideoLibrary {
    pub fn new(assets_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `<assets_dir>/<video>.<extension>`. Identifiers are bare names; anything that could
    /// escape the assets directory is refused.
    pub fn resolve(&self, video: &str) -> Result<PathBuf> {
        let invalid = video.trim().is_empty()
            || video.contains("..")
            || video.contains('/')
            || video.contains('\\')
            || video.contains("://");
        if invalid {
            return Err(anyhow!("invalid video identifier '{}'", video));
        }
        Ok(self
            .assets_dir
            .join(format!("{}.{}", video, self.extension)))
    }

    /// Open the frame source for a video identifier.
    pub fn open(&self, video: &str) -> Result<FileSource> {
        let path = self.resolve(video)?;
        FileSource::open(&path)
    }
}
