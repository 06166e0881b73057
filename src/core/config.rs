//! Configuration for the downloader and the map view
//!
//! Settings come from a preset ([`MapProfile`]), from JSON, or from code.
//! Every section deserializes with defaults so partial documents are fine.

use crate::core::constants::{
    CACHE_DIR_ENV, DEFAULT_CACHE_DIR, DEFAULT_CAP_TIME, DEFAULT_FADE_RATE, DEFAULT_MAX_WORKERS,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESULT_CAPACITY, DEFAULT_TICK_INTERVAL, MAX_DENSITY,
    USER_AGENT,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum MapProfile {
    Balanced,
    /// Fewer parallel requests and a more patient timeout for slow links
    LowBandwidth,
    /// Double-density tiles and a wider worker pool
    HighDensity,
    Custom(MapConfig),
}

impl MapProfile {
    pub fn resolve(&self) -> MapConfig {
        match self {
            Self::Balanced => MapConfig::default(),
            Self::LowBandwidth => MapConfig {
                downloader: DownloaderConfig {
                    max_workers: 2,
                    cap_time_ms: 32,
                    request_timeout_ms: 10_000,
                    ..DownloaderConfig::default()
                },
                view: ViewConfig::default(),
            },
            Self::HighDensity => MapConfig {
                downloader: DownloaderConfig {
                    max_workers: 8,
                    ..DownloaderConfig::default()
                },
                view: ViewConfig {
                    density: 2.0,
                    ..ViewConfig::default()
                },
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for MapProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub downloader: DownloaderConfig,
    pub view: ViewConfig,
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Applies `SLIPPY_VIEW_CACHE_DIR` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
            self.downloader.cache_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.downloader.validate()?;
        self.view.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    pub max_workers: usize,
    /// Drain budget per tick, in milliseconds
    pub cap_time_ms: u64,
    pub tick_hz: u32,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub cache_dir: PathBuf,
    pub result_capacity: usize,
}

impl DownloaderConfig {
    pub fn cap_time(&self) -> Duration {
        Duration::from_millis(self.cap_time_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(MapError::Config("max_workers must be at least 1".into()));
        }
        if self.result_capacity == 0 {
            return Err(MapError::Config("result_capacity must be at least 1".into()));
        }
        if self.tick_hz == 0 {
            return Err(MapError::Config("tick_hz must be at least 1".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(MapError::Config("user_agent must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            cap_time_ms: DEFAULT_CAP_TIME.as_millis() as u64,
            tick_hz: (1.0 / DEFAULT_TICK_INTERVAL.as_secs_f64()).round() as u32,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            user_agent: USER_AGENT.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            result_capacity: DEFAULT_RESULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Device pixels per logical pixel
    pub density: f64,
    pub fade_rate: f32,
    pub scale_min: f64,
    pub scale_max: f64,
    pub background_color: [f32; 4],
    pub default_zoom: u8,
}

impl ViewConfig {
    /// On-screen tile edge for a source tile size, capped at twice nominal.
    pub fn scaled_tile_size(&self, tile_size: u32) -> f64 {
        tile_size as f64 * self.density.clamp(f64::MIN_POSITIVE, MAX_DENSITY)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.density > 0.0) {
            return Err(MapError::Config("density must be positive".into()));
        }
        if !(self.scale_min > 0.0 && self.scale_min <= self.scale_max) {
            return Err(MapError::Config(format!(
                "invalid scale range {}..{}",
                self.scale_min, self.scale_max
            )));
        }
        if !(self.fade_rate > 0.0) {
            return Err(MapError::Config("fade_rate must be positive".into()));
        }
        Ok(())
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            fade_rate: DEFAULT_FADE_RATE,
            scale_min: 0.1,
            scale_max: 1e6,
            background_color: [181.0 / 255.0, 208.0 / 255.0, 208.0 / 255.0, 1.0],
            default_zoom: 0,
        }
    }
}
