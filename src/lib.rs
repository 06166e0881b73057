//! # slippy-view
//!
//! Tile pyramid manager for slippy maps: Web-Mercator projection, the
//! viewport-to-tile-range computation, center-out tile discovery, cross-zoom
//! tile retention, and a bounded-concurrency downloader with a flat disk
//! cache.
//!
//! The crate owns no pixels. A host UI drives a [`MapView`] from its event
//! loop (pan, zoom, resize, and a periodic [`MapView::tick`]) and draws the
//! tiles it exposes.

pub mod core;
pub mod events;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::Bounds,
    config::{DownloaderConfig, MapConfig, MapProfile, ViewConfig},
    geo::{LatLng, Point, TileCoord},
    map::{MapView, TickReport},
    viewport::Viewport,
};

pub use crate::events::{EventBus, MapEvent};

pub use crate::layers::tile::{
    SchedulePass, Tile, TileIndex, TileRange, TileSet, TileState, TileTicket,
    ViewportTileScheduler,
};

pub use crate::tiles::{
    Completion, Downloader, HttpTileSource, MapSource, MapSourceConfig, ProviderPreset,
    TileCache, TileOutcome, TileRequest, TileSource,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid map source: {0}")]
    InvalidSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
