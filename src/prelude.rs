//! Prelude module for common slippy-view types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use slippy_view::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{DownloaderConfig, MapConfig, MapProfile, ViewConfig},
    geo::{LatLng, Point, TileCoord},
    map::MapView,
    viewport::Viewport,
};

pub use crate::events::{EventBus, MapEvent};

pub use crate::layers::tile::{
    Tile, TileIndex, TileRange, TileSet, TileState, TileTicket, ViewportTileScheduler,
};

pub use crate::runtime::{AsyncSpawner, TokioSpawner};

pub use crate::tiles::{
    Completion, Downloader, HttpTileSource, MapSource, MapSourceConfig, ProviderPreset, TileCache,
    TileOutcome, TileRequest, TileSource,
};

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
