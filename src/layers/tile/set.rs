use super::index::TileIndex;
use super::scheduler::TileRange;
use super::types::{Tile, TileTicket};
use crate::core::bounds::Bounds;
use crate::core::constants::DEFAULT_FADE_RATE;
use crate::core::geo::TileCoord;
use crate::prelude::HashMap;
use crate::tiles::{TileOutcome, TileSource};

/// Foreground and background tiles of one view.
///
/// Foreground tiles all share the index zoom and are keyed by coordinate.
/// Background tiles come from earlier zoom levels and are drawn scaled
/// until the foreground covers their area.
#[derive(Debug)]
pub struct TileSet {
    foreground: HashMap<TileCoord, Tile>,
    background: Vec<Tile>,
    index: TileIndex,
    next_ticket: u64,
    fade_rate: f32,
}

impl TileSet {
    pub fn new(zoom: u8) -> Self {
        Self {
            foreground: HashMap::default(),
            background: Vec::new(),
            index: TileIndex::new(zoom),
            next_ticket: 1,
            fade_rate: DEFAULT_FADE_RATE,
        }
    }

    pub fn with_fade_rate(mut self, fade_rate: f32) -> Self {
        self.fade_rate = fade_rate;
        self
    }

    pub fn zoom(&self) -> u8 {
        self.index.zoom()
    }

    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    pub fn foreground(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.foreground.values()
    }

    pub fn foreground_tile(&self, coord: &TileCoord) -> Option<&Tile> {
        self.foreground.get(coord)
    }

    pub fn foreground_len(&self) -> usize {
        self.foreground.len()
    }

    pub fn background(&self) -> &[Tile] {
        &self.background
    }

    fn issue_ticket(&mut self) -> TileTicket {
        let ticket = TileTicket::from_raw(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Creates a foreground tile at `(x, y)` and asks `source` to fill it.
    /// Does nothing for occupied or off-grid cells.
    pub fn request(&mut self, source: &dyn TileSource, x: u32, y: u32, tile_size: f64) -> bool {
        if self.index.contains(x, y) {
            return false;
        }
        let coord = TileCoord::new(x, y, self.zoom());
        if !coord.is_valid() {
            return false;
        }

        let ticket = self.issue_ticket();
        let mut tile = Tile::new(ticket, coord, tile_size);
        source.fill_tile(&mut tile);
        self.index.insert(x, y);
        self.foreground.insert(coord, tile);
        true
    }

    /// Releases foreground tiles outside `range` and repositions the rest.
    /// Returns how many were released.
    pub fn evict_outside(&mut self, range: &TileRange, tile_size: f64) -> usize {
        let zoom = self.zoom();
        let index = &mut self.index;
        let before = self.foreground.len();
        self.foreground.retain(|coord, tile| {
            if range.contains(coord.x, coord.y) {
                tile.place(zoom, tile_size);
                true
            } else {
                tile.mark_done();
                index.remove(coord.x, coord.y);
                false
            }
        });
        before - self.foreground.len()
    }

    /// Rescales background tiles to the current zoom and drops those whose
    /// rectangle misses `view`, a world-pixel box at the current zoom.
    /// Returns how many were dropped.
    pub fn retain_background(&mut self, view: &Bounds, tile_size: f64) -> usize {
        let zoom = self.zoom();
        let before = self.background.len();
        self.background.retain_mut(|tile| {
            tile.place(zoom, tile_size);
            if tile.bounds().intersects(view) {
                true
            } else {
                tile.mark_done();
                false
            }
        });
        before - self.background.len()
    }

    /// Switches the foreground to `zoom`.
    ///
    /// Loading tiles are released, every other foreground tile joins the
    /// background, and background tiles already at `zoom` are promoted back
    /// into the foreground.
    pub fn move_to_background(&mut self, zoom: u8, tile_size: f64) {
        for (_, mut tile) in self.foreground.drain() {
            if tile.is_loading() {
                tile.mark_done();
            } else {
                self.background.push(tile);
            }
        }
        self.index.reset(zoom);

        let previous = std::mem::take(&mut self.background);
        for mut tile in previous {
            tile.place(zoom, tile_size);
            if tile.zoom() != zoom {
                self.background.push(tile);
                continue;
            }
            let coord = tile.coord();
            if self.index.insert(coord.x, coord.y) {
                self.foreground.insert(coord, tile);
            } else {
                tile.mark_done();
            }
        }
        log::trace!(
            "zoom {}: {} promoted, {} in background",
            zoom,
            self.foreground.len(),
            self.background.len()
        );
    }

    /// Applies a download result. Stale tickets and failures leave the set
    /// unchanged; returns whether a tile took the source.
    pub fn apply(&mut self, outcome: TileOutcome) -> bool {
        let tile = match self.foreground.get_mut(&outcome.coord) {
            Some(tile) if tile.ticket() == outcome.ticket => tile,
            _ => {
                log::trace!("discarding stale result for {:?}", outcome.coord);
                return false;
            }
        };
        match outcome.result {
            Ok(path) => tile.set_source(path),
            Err(_) => false,
        }
    }

    /// Advances fade-ins. Returns true while any tile is still animating.
    pub fn animate(&mut self, dt: f32) -> bool {
        let fade_rate = self.fade_rate;
        let mut animating = false;
        for tile in self.foreground.values_mut().chain(self.background.iter_mut()) {
            animating |= tile.animate(dt, fade_rate);
        }
        animating
    }

    /// Releases every tile.
    pub fn clear(&mut self) {
        for (_, mut tile) in self.foreground.drain() {
            tile.mark_done();
        }
        for tile in self.background.iter_mut() {
            tile.mark_done();
        }
        self.background.clear();
        let zoom = self.zoom();
        self.index.reset(zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::layers::tile::TileState;
    use crate::MapError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FakeSource {
        filled: Mutex<Vec<TileCoord>>,
        immediate: bool,
    }

    impl FakeSource {
        fn new(immediate: bool) -> Self {
            Self {
                filled: Mutex::new(Vec::new()),
                immediate,
            }
        }
    }

    impl TileSource for FakeSource {
        fn min_zoom(&self) -> u8 {
            0
        }

        fn max_zoom(&self) -> u8 {
            19
        }

        fn tile_size(&self) -> u32 {
            256
        }

        fn fill_tile(&self, tile: &mut Tile) {
            self.filled.lock().unwrap().push(tile.coord());
            if self.immediate {
                tile.set_source("ready.png");
            }
        }
    }

    fn outcome(tile: &Tile, result: crate::Result<PathBuf>) -> TileOutcome {
        TileOutcome {
            ticket: tile.ticket(),
            coord: tile.coord(),
            result,
        }
    }

    #[test]
    fn test_request_fills_once() {
        let source = FakeSource::new(false);
        let mut set = TileSet::new(3);
        assert!(set.request(&source, 1, 1, 256.0));
        assert!(!set.request(&source, 1, 1, 256.0));
        assert!(!set.request(&source, 8, 0, 256.0));
        assert_eq!(source.filled.lock().unwrap().len(), 1);
        assert!(set.index().contains(1, 1));
    }

    #[test]
    fn test_apply_checks_ticket() {
        let source = FakeSource::new(false);
        let mut set = TileSet::new(2);
        set.request(&source, 0, 0, 256.0);
        let coord = TileCoord::new(0, 0, 2);
        let tile = set.foreground_tile(&coord).unwrap().clone();

        let stale = TileOutcome {
            ticket: TileTicket::from_raw(999),
            coord,
            result: Ok(PathBuf::from("old.png")),
        };
        assert!(!set.apply(stale));

        let failed = outcome(
            &tile,
            Err(MapError::HttpStatus {
                status: 404,
                url: "http://x".into(),
            }),
        );
        assert!(!set.apply(failed));
        assert!(set.foreground_tile(&coord).unwrap().is_loading());

        assert!(set.apply(outcome(&tile, Ok(PathBuf::from("new.png")))));
        assert_eq!(
            set.foreground_tile(&coord).unwrap().state(),
            TileState::NeedsAnimation
        );
    }

    #[test]
    fn test_evicted_tile_ignores_late_result() {
        let source = FakeSource::new(false);
        let mut set = TileSet::new(2);
        set.request(&source, 3, 3, 256.0);
        let tile = set
            .foreground_tile(&TileCoord::new(3, 3, 2))
            .unwrap()
            .clone();

        let range = TileRange::new(0, 0, 2, 2);
        assert_eq!(set.evict_outside(&range, 256.0), 1);
        assert!(!set.index().contains(3, 3));
        assert!(!set.apply(outcome(&tile, Ok(PathBuf::from("late.png")))));

        // A fresh request gets a fresh ticket, so the old result stays stale.
        set.request(&source, 3, 3, 256.0);
        assert!(!set.apply(outcome(&tile, Ok(PathBuf::from("late.png")))));
    }

    #[test]
    fn test_move_to_background_scales_and_promotes() {
        let mut set = TileSet::new(3);
        set.request(&FakeSource::new(true), 2, 2, 256.0);
        set.request(&FakeSource::new(false), 1, 1, 256.0);

        set.move_to_background(4, 256.0);
        assert_eq!(set.foreground_len(), 0);
        assert!(set.index().is_empty());
        assert_eq!(set.background().len(), 1);
        let moved = &set.background()[0];
        assert_eq!(moved.coord(), TileCoord::new(2, 2, 3));
        assert_eq!(moved.bounds().min, Point::new(1024.0, 1024.0));
        assert_eq!(moved.bounds().width(), 512.0);

        set.move_to_background(3, 256.0);
        assert_eq!(set.background().len(), 0);
        assert_eq!(set.foreground_len(), 1);
        assert!(set.index().contains(2, 2));
        let promoted = set.foreground_tile(&TileCoord::new(2, 2, 3)).unwrap();
        assert_eq!(promoted.bounds().width(), 256.0);
    }

    #[test]
    fn test_retain_background_drops_offscreen() {
        let mut set = TileSet::new(1);
        let source = FakeSource::new(true);
        set.request(&source, 0, 0, 256.0);
        set.request(&source, 1, 1, 256.0);
        set.move_to_background(2, 256.0);
        assert_eq!(set.background().len(), 2);

        // Only the south-west quarter of the zoom 2 world is in view.
        let view = Bounds::from_coords(0.0, 0.0, 400.0, 400.0);
        assert_eq!(set.retain_background(&view, 256.0), 1);
        assert_eq!(set.background()[0].coord(), TileCoord::new(0, 0, 1));
    }

    #[test]
    fn test_animate_and_clear() {
        let mut set = TileSet::new(0).with_fade_rate(10.0);
        set.request(&FakeSource::new(true), 0, 0, 256.0);
        assert!(set.animate(0.0));
        assert!(set.animate(0.05));
        assert!(!set.animate(0.1));

        set.clear();
        assert_eq!(set.foreground_len(), 0);
        assert!(set.index().is_empty());
        assert_eq!(set.zoom(), 0);
    }
}
