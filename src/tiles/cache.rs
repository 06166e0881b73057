use crate::core::geo::TileCoord;
use crate::layers::tile::Tile;
use crate::tiles::loader::{Downloader, TileRequest};
use crate::tiles::source::MapSource;
use crate::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DEFAULT_KNOWN_CAPACITY: usize = 4096;

/// Flat on-disk tile cache.
///
/// Files live directly in `dir` and are named by
/// [`MapSource::cache_file_name`]. A bounded LRU remembers which paths were
/// already seen on disk so hot tiles skip the `stat`.
#[derive(Debug)]
pub struct TileCache {
    dir: PathBuf,
    known: Mutex<LruCache<PathBuf, ()>>,
}

impl TileCache {
    /// Opens the cache, creating `dir` when it is missing.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_capacity(dir, DEFAULT_KNOWN_CAPACITY)
    }

    pub fn with_capacity(dir: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            dir,
            known: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source: &MapSource, coord: TileCoord) -> PathBuf {
        self.dir.join(source.cache_file_name(coord))
    }

    /// Whether a cached file exists at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        if let Ok(mut known) = self.known.lock() {
            if known.get(path).is_some() {
                return true;
            }
        }
        if !path.is_file() {
            return false;
        }
        if let Ok(mut known) = self.known.lock() {
            known.put(path.to_path_buf(), ());
        }
        true
    }

    /// Attaches the cached file to `tile`, or hands the tile to the
    /// downloader when nothing is cached yet.
    pub fn fill(&self, source: &MapSource, tile: &mut Tile, downloader: &Downloader) {
        if tile.is_done() {
            return;
        }
        let coord = tile.coord();
        let path = self.path_for(source, coord);
        if self.contains(&path) {
            log::trace!("cache hit {}", path.display());
            tile.set_source(path);
            return;
        }
        downloader.download_tile(TileRequest {
            ticket: tile.ticket(),
            coord,
            url: source.url_for(coord),
            cache_path: path,
        });
    }
}
