use crate::core::constants::{MAX_ZOOM_LEVEL, TILE_SIZE};
use crate::core::geo::TileCoord;
use crate::core::projection;
use crate::layers::tile::Tile;
use crate::tiles::cache::TileCache;
use crate::tiles::loader::Downloader;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anything that can describe a tile pyramid and fill tiles for it.
///
/// The projection helpers default to spherical Mercator at the source's
/// nominal tile size.
pub trait TileSource: Send + Sync {
    fn min_zoom(&self) -> u8;

    fn max_zoom(&self) -> u8;

    /// Nominal edge of one tile, in pixels
    fn tile_size(&self) -> u32;

    fn attribution(&self) -> &str {
        ""
    }

    fn get_x(&self, zoom: u8, lon: f64) -> f64 {
        projection::pixel_x(zoom, lon, self.tile_size() as f64)
    }

    fn get_y(&self, zoom: u8, lat: f64) -> f64 {
        projection::pixel_y(zoom, lat, self.tile_size() as f64)
    }

    fn get_lon(&self, zoom: u8, x: f64) -> f64 {
        projection::lon(zoom, x, self.tile_size() as f64)
    }

    fn get_lat(&self, zoom: u8, y: f64) -> f64 {
        projection::lat(zoom, y, self.tile_size() as f64)
    }

    fn get_row_count(&self, zoom: u8) -> u32 {
        projection::row_count(zoom)
    }

    fn get_col_count(&self, zoom: u8) -> u32 {
        projection::col_count(zoom)
    }

    /// Starts producing imagery for `tile`.
    ///
    /// Implementations either attach a source right away or arrange for a
    /// later completion carrying the tile's ticket. Done tiles are ignored.
    fn fill_tile(&self, tile: &mut Tile);

    /// The downloader whose completions must be drained for this source,
    /// if it uses one.
    fn downloader(&self) -> Option<&Downloader> {
        None
    }
}

/// Raw description of a tile provider, as written in JSON or code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSourceConfig {
    /// Template with `{z}`, `{x}`, `{y}` and optionally `{s}`
    pub url: String,
    pub cache_key: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub tile_size: u32,
    pub image_ext: String,
    pub attribution: String,
    pub subdomains: Vec<String>,
    /// Substitute XYZ rows (north at 0) into `{y}`
    pub flip_y: bool,
}

impl MapSourceConfig {
    /// Config from the positional provider form
    /// `(cache_key, min_zoom, max_zoom, url, attribution)`.
    pub fn from_tuple(
        cache_key: &str,
        min_zoom: u8,
        max_zoom: u8,
        url: &str,
        attribution: &str,
    ) -> Self {
        Self {
            url: url.to_string(),
            cache_key: cache_key.to_string(),
            min_zoom,
            max_zoom,
            attribution: attribution.to_string(),
            ..Self::default()
        }
    }

    pub fn with_subdomains(mut self, subdomains: &str) -> Self {
        self.subdomains = subdomains.chars().map(String::from).collect();
        self
    }

    pub fn with_image_ext(mut self, ext: &str) -> Self {
        self.image_ext = ext.to_string();
        self
    }

    pub fn build(self) -> Result<MapSource> {
        MapSource::new(self)
    }
}

impl Default for MapSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            cache_key: "osm".to_string(),
            min_zoom: 0,
            max_zoom: 19,
            tile_size: TILE_SIZE,
            image_ext: "png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            flip_y: true,
        }
    }
}

/// A validated tile provider: URL template, zoom range, and cache naming.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSource {
    config: MapSourceConfig,
}

impl MapSource {
    pub fn new(config: MapSourceConfig) -> Result<Self> {
        let invalid = |reason: String| -> Result<Self> { Err(MapError::InvalidSource(reason)) };

        if config.min_zoom > config.max_zoom {
            return invalid(format!(
                "min_zoom {} above max_zoom {}",
                config.min_zoom, config.max_zoom
            ));
        }
        if config.max_zoom > MAX_ZOOM_LEVEL {
            return invalid(format!(
                "max_zoom {} above {}",
                config.max_zoom, MAX_ZOOM_LEVEL
            ));
        }
        if config.tile_size == 0 {
            return invalid("tile_size must be positive".into());
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !config.url.contains(placeholder) {
                return invalid(format!("url {:?} lacks {}", config.url, placeholder));
            }
        }
        if config.url.contains("{s}") && config.subdomains.is_empty() {
            return invalid("url uses {s} but no subdomains are configured".into());
        }
        if !is_file_safe(&config.cache_key) {
            return invalid(format!("cache_key {:?} is not a usable file name", config.cache_key));
        }
        if !is_file_safe(&config.image_ext) {
            return invalid(format!("image_ext {:?} is not a usable extension", config.image_ext));
        }

        Ok(Self { config })
    }

    /// Source for one of the built-in provider keys.
    pub fn from_provider(key: &str) -> Result<Self> {
        key.parse::<ProviderPreset>()?.source()
    }

    pub fn config(&self) -> &MapSourceConfig {
        &self.config
    }

    pub fn cache_key(&self) -> &str {
        &self.config.cache_key
    }

    pub fn image_ext(&self) -> &str {
        &self.config.image_ext
    }

    /// Request URL for `coord`.
    pub fn url_for(&self, coord: TileCoord) -> String {
        let y = if self.config.flip_y {
            coord.flipped_y()
        } else {
            coord.y
        };
        let mut url = self
            .config
            .url
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &y.to_string());
        if let Some(subdomain) = self.subdomain_for(coord) {
            url = url.replace("{s}", subdomain);
        }
        url
    }

    /// Cache file name for `coord`. Uses the internal (unflipped) row.
    pub fn cache_file_name(&self, coord: TileCoord) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.config.cache_key, coord.z, coord.x, coord.y, self.config.image_ext
        )
    }

    // Spread requests over the subdomains deterministically.
    fn subdomain_for(&self, coord: TileCoord) -> Option<&str> {
        let subdomains = &self.config.subdomains;
        if subdomains.is_empty() {
            return None;
        }
        let idx = ((coord.x as u64 + coord.y as u64) % subdomains.len() as u64) as usize;
        Some(subdomains[idx].as_str())
    }
}

impl Default for MapSource {
    fn default() -> Self {
        Self {
            config: MapSourceConfig::default(),
        }
    }
}

fn is_file_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && name != "."
        && name != ".."
}

/// Built-in tile providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderPreset {
    Osm,
    OsmHot,
    OsmDe,
    OsmFr,
    CycleMap,
    OpenSeaMap,
    ThunderforestCycle,
    ThunderforestTransport,
    ThunderforestLandscape,
    ThunderforestOutdoors,
    MapquestOsm,
    MapquestAerial,
}

impl ProviderPreset {
    pub const ALL: [ProviderPreset; 12] = [
        Self::Osm,
        Self::OsmHot,
        Self::OsmDe,
        Self::OsmFr,
        Self::CycleMap,
        Self::OpenSeaMap,
        Self::ThunderforestCycle,
        Self::ThunderforestTransport,
        Self::ThunderforestLandscape,
        Self::ThunderforestOutdoors,
        Self::MapquestOsm,
        Self::MapquestAerial,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Osm => "osm",
            Self::OsmHot => "osm-hot",
            Self::OsmDe => "osm-de",
            Self::OsmFr => "osm-fr",
            Self::CycleMap => "cyclemap",
            Self::OpenSeaMap => "openseamap",
            Self::ThunderforestCycle => "thunderforest-cycle",
            Self::ThunderforestTransport => "thunderforest-transport",
            Self::ThunderforestLandscape => "thunderforest-landscape",
            Self::ThunderforestOutdoors => "thunderforest-outdoors",
            Self::MapquestOsm => "mapquest-osm",
            Self::MapquestAerial => "mapquest-aerial",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.key() == key)
            .ok_or_else(|| MapError::UnknownProvider(key.to_string()))
    }

    pub fn config(&self) -> MapSourceConfig {
        let key = self.key();
        let thunderforest = |layer: &str| {
            MapSourceConfig::from_tuple(
                key,
                0,
                19,
                &format!("http://{{s}}.tile.thunderforest.com/{layer}/{{z}}/{{x}}/{{y}}.png"),
                "© OpenCycleMap via OpenStreetMap",
            )
        };
        let mapquest = |host: &str, layer: &str| {
            MapSourceConfig::from_tuple(
                key,
                0,
                19,
                &format!("http://{host}{{s}}.mqcdn.com/tiles/1.0.0/{layer}/{{z}}/{{x}}/{{y}}.jpeg"),
                "Tiles Courtesy of Mapquest",
            )
            .with_subdomains("1234")
            .with_image_ext("jpeg")
        };

        match self {
            Self::Osm => MapSourceConfig::default(),
            Self::OsmHot => MapSourceConfig::from_tuple(
                key,
                0,
                19,
                "http://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png",
                "© OpenStreetMap contributors, tiles by Humanitarian OSM Team",
            ),
            Self::OsmDe => MapSourceConfig::from_tuple(
                key,
                0,
                18,
                "http://{s}.tile.openstreetmap.de/tiles/osmde/{z}/{x}/{y}.png",
                "Tiles @ OSM DE",
            ),
            Self::OsmFr => MapSourceConfig::from_tuple(
                key,
                0,
                20,
                "http://{s}.tile.openstreetmap.fr/osmfr/{z}/{x}/{y}.png",
                "Tiles @ OSM France",
            ),
            Self::CycleMap => MapSourceConfig::from_tuple(
                key,
                0,
                17,
                "http://{s}.tile.opencyclemap.org/cycle/{z}/{x}/{y}.png",
                "Tiles @ Andy Allan",
            ),
            Self::OpenSeaMap => MapSourceConfig {
                subdomains: Vec::new(),
                ..MapSourceConfig::from_tuple(
                    key,
                    0,
                    19,
                    "http://tiles.openseamap.org/seamark/{z}/{x}/{y}.png",
                    "Map data @ OpenSeaMap contributors",
                )
            },
            Self::ThunderforestCycle => thunderforest("cycle"),
            Self::ThunderforestTransport => thunderforest("transport"),
            Self::ThunderforestLandscape => thunderforest("landscape"),
            Self::ThunderforestOutdoors => thunderforest("outdoors"),
            Self::MapquestOsm => mapquest("otile", "map"),
            Self::MapquestAerial => mapquest("oatile", "sat"),
        }
    }

    pub fn source(&self) -> Result<MapSource> {
        MapSource::new(self.config())
    }
}

impl FromStr for ProviderPreset {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s)
    }
}

impl fmt::Display for ProviderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Tile source backed by an HTTP provider and a flat disk cache.
pub struct HttpTileSource {
    source: MapSource,
    cache: TileCache,
    downloader: Downloader,
}

impl HttpTileSource {
    pub fn new(source: MapSource, cache: TileCache, downloader: Downloader) -> Self {
        Self {
            source,
            cache,
            downloader,
        }
    }

    /// Source with its cache under the downloader's configured directory.
    pub fn with_downloader(source: MapSource, downloader: Downloader) -> Result<Self> {
        let cache = TileCache::new(&downloader.config().cache_dir)?;
        Ok(Self::new(source, cache, downloader))
    }

    pub fn map_source(&self) -> &MapSource {
        &self.source
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}

impl TileSource for HttpTileSource {
    fn min_zoom(&self) -> u8 {
        self.source.config.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.source.config.max_zoom
    }

    fn tile_size(&self) -> u32 {
        self.source.config.tile_size
    }

    fn attribution(&self) -> &str {
        &self.source.config.attribution
    }

    fn fill_tile(&self, tile: &mut Tile) {
        self.cache.fill(&self.source, tile, &self.downloader);
    }

    fn downloader(&self) -> Option<&Downloader> {
        Some(&self.downloader)
    }
}

impl fmt::Debug for HttpTileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("source", &self.source)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
