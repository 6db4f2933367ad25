use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::histogram::BUCKET_COUNT;
use crate::ingest::VideoLibrary;
use crate::protocol::{Framing, DEFAULT_MAX_MESSAGE_BYTES};
use crate::server::ListenerConfig;
use crate::track::TrackerSettings;

const DEFAULT_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_ASSETS_DIR: &str = "assets";
const DEFAULT_VIDEO_EXT: &str = "mp4";
const DEFAULT_DETECTOR: &str = "marker";
const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    listen: Option<ListenConfigFile>,
    videos: Option<VideosConfigFile>,
    detector: Option<DetectorConfigFile>,
    tracker: Option<TrackerSettings>,
    bucket_count: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ListenConfigFile {
    addr: Option<String>,
    framing: Option<Framing>,
    max_request_bytes: Option<usize>,
    read_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct VideosConfigFile {
    assets_dir: Option<PathBuf>,
    extension: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub framing: Framing,
    pub max_request_bytes: usize,
    pub read_timeout: Duration,
    pub assets_dir: PathBuf,
    pub video_extension: String,
    pub detector: DetectorSettings,
    pub tracker: TrackerSettings,
    pub bucket_count: usize,
}

/// Which detector backend to run, and the model parameters for model-backed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR.to_string(),
            model_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE,
        }
    }
}

impl ServerConfig {
    /// File named by `ROI_COUNTER_CONFIG` (if any), then environment overrides, then
    /// validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ROI_COUNTER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ServerConfigFile) -> Self {
        let listen = file.listen.unwrap_or_default();
        let videos = file.videos.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let defaults = DetectorSettings::default();
        Self {
            addr: listen.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            framing: listen.framing.unwrap_or_default(),
            max_request_bytes: listen.max_request_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_BYTES),
            read_timeout: Duration::from_secs(
                listen.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
            ),
            assets_dir: videos
                .assets_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR)),
            video_extension: videos
                .extension
                .unwrap_or_else(|| DEFAULT_VIDEO_EXT.to_string()),
            detector: DetectorSettings {
                backend: detector.backend.unwrap_or(defaults.backend),
                model_path: detector.model_path,
                input_size: detector.input_size.unwrap_or(defaults.input_size),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(defaults.confidence_threshold),
            },
            tracker: file.tracker.unwrap_or_default(),
            bucket_count: file.bucket_count.unwrap_or(BUCKET_COUNT),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("ROI_COUNTER_ADDR") {
            if !addr.trim().is_empty() {
                self.addr = addr;
            }
        }
        if let Ok(dir) = std::env::var("ROI_COUNTER_ASSETS_DIR") {
            if !dir.trim().is_empty() {
                self.assets_dir = PathBuf::from(dir);
            }
        }
        if let Ok(ext) = std::env::var("ROI_COUNTER_VIDEO_EXT") {
            if !ext.trim().is_empty() {
                self.video_extension = ext;
            }
        }
        if let Ok(backend) = std::env::var("ROI_COUNTER_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("ROI_COUNTER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(framing) = std::env::var("ROI_COUNTER_FRAMING") {
            self.framing = framing.parse()?;
        }
        if let Ok(max) = std::env::var("ROI_COUNTER_MAX_REQUEST_BYTES") {
            self.max_request_bytes = max.parse().map_err(|_| {
                anyhow!("ROI_COUNTER_MAX_REQUEST_BYTES must be an integer number of bytes")
            })?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.video_extension = self.video_extension.trim_start_matches('.').to_string();
        if self.video_extension.is_empty() {
            return Err(anyhow!("video extension must not be empty"));
        }
        if self.max_request_bytes == 0 {
            return Err(anyhow!("max_request_bytes must be greater than zero"));
        }
        if self.read_timeout.is_zero() {
            return Err(anyhow!("read timeout must be greater than zero"));
        }
        if self.bucket_count == 0 {
            return Err(anyhow!("bucket_count must be greater than zero"));
        }
        let t = &self.tracker;
        if !(0.0..=1.0).contains(&t.minimum_matching_threshold) {
            return Err(anyhow!("tracker minimum_matching_threshold must be within [0, 1]"));
        }
        if t.low_score_threshold > t.track_activation_threshold {
            return Err(anyhow!(
                "tracker low_score_threshold must not exceed track_activation_threshold"
            ));
        }
        Ok(())
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            addr: self.addr.clone(),
            framing: self.framing,
            max_request_bytes: self.max_request_bytes,
            read_timeout: self.read_timeout,
        }
    }

    pub fn video_library(&self) -> VideoLibrary {
        VideoLibrary::new(&self.assets_dir, &self.video_extension)
    }
}

fn read_config_file(path: &Path) -> Result<ServerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
