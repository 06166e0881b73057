//! Core constants derived from common slippy-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use std::time::Duration;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Device-scaled tiles never grow beyond this multiple of the nominal size.
pub const MAX_DENSITY: f64 = 2.0;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Deepest zoom level any source may declare. Keeps `2^zoom` inside `u32`.
pub const MAX_ZOOM_LEVEL: u8 = 30;

/// Concurrent fetches allowed by the download worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Wall-clock budget for applying completions in one tick.
pub const DEFAULT_CAP_TIME: Duration = Duration::from_millis(64);

/// Intended cadence of the drain / animation tick (60 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(16_667);

/// Timeout for a single tile request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Public tile servers reject anonymous clients, so every request identifies itself.
pub const USER_AGENT: &str = concat!("slippy-view/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Completions buffered between the worker pool and the update thread.
pub const DEFAULT_RESULT_CAPACITY: usize = 1024;

/// Opacity gained per second while a tile fades in (10 ⇒ 100 ms).
pub const DEFAULT_FADE_RATE: f32 = 10.0;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "SLIPPY_VIEW_CACHE_DIR";

/// Mean earth radius used by the haversine helper, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Equatorial circumference in metres.
pub const EQUATOR_LENGTH_M: f64 = 40_075_004.0;
