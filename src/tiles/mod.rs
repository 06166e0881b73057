//! Tile providers, the disk cache, and the download worker pool

pub mod cache;
pub mod loader;
pub mod source;

pub use cache::TileCache;
pub use loader::{Completion, Downloader, TileOutcome, TileRequest};
pub use source::{HttpTileSource, MapSource, MapSourceConfig, ProviderPreset, TileSource};
