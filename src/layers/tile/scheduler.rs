//! Viewport-to-tile-range computation and center-out tile discovery.

use super::set::TileSet;
use crate::core::geo::Point;
use crate::core::projection::{self, clamp};
use crate::core::viewport::Viewport;
use crate::tiles::TileSource;

/// Half-open block of tile columns `x_first..x_last` and rows
/// `y_first..y_last` at one zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRange {
    pub x_first: u32,
    pub y_first: u32,
    pub x_last: u32,
    pub y_last: u32,
}

impl TileRange {
    pub fn new(x_first: u32, y_first: u32, x_last: u32, y_last: u32) -> Self {
        Self {
            x_first,
            y_first,
            x_last,
            y_last,
        }
    }

    /// Tiles needed to cover a `width` x `height` screen box whose top-left
    /// shows world pixel `origin`, with one extra tile per axis for partial
    /// coverage. Clamped to the grid at `zoom`.
    pub fn covering(
        origin: Point,
        width: f64,
        height: f64,
        scale: f64,
        zoom: u8,
        tile_size: f64,
    ) -> Self {
        let axis = |start: f64, extent: f64, max_end: u32| -> (u32, u32) {
            let max_end = max_end as f64;
            let count = (extent / scale / tile_size).ceil() + 1.0;
            let first = clamp((start / tile_size).floor(), 0.0, max_end);
            let last = clamp(first + count, first, max_end);
            (first as u32, last as u32)
        };
        let (x_first, x_last) = axis(origin.x, width, projection::col_count(zoom));
        let (y_first, y_last) = axis(origin.y, height, projection::row_count(zoom));
        Self::new(x_first, y_first, x_last, y_last)
    }

    pub fn x_count(&self) -> u32 {
        self.x_last.saturating_sub(self.x_first)
    }

    pub fn y_count(&self) -> u32 {
        self.y_last.saturating_sub(self.y_first)
    }

    pub fn is_empty(&self) -> bool {
        self.x_count() == 0 || self.y_count() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_first && x < self.x_last && y >= self.y_first && y < self.y_last
    }

    /// Cells of the range, nearest the center first.
    pub fn spiral(&self) -> impl Iterator<Item = (u32, u32)> {
        let range = *self;
        let walk = if range.is_empty() {
            SpiralWalk::exhausted()
        } else {
            SpiralWalk::new(
                (range.x_first + range.x_count() / 2) as i64,
                (range.y_first + range.y_count() / 2) as i64,
                range.x_count().max(range.y_count()) + 2,
            )
        };
        walk.filter_map(move |(x, y)| {
            let (x, y) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
            range.contains(x, y).then_some((x, y))
        })
    }
}

// right, up, left, down
const DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Square spiral around a center cell: arms of length 1, 1, 2, 2, 3, 3, …
/// turning counter-clockwise, until an arm would reach `arm_max`.
#[derive(Debug, Clone)]
pub struct SpiralWalk {
    x: i64,
    y: i64,
    arm_size: u32,
    arm_max: u32,
    step: u32,
    turn: usize,
}

impl SpiralWalk {
    pub fn new(x: i64, y: i64, arm_max: u32) -> Self {
        Self {
            x,
            y,
            arm_size: 1,
            arm_max,
            step: 0,
            turn: 0,
        }
    }

    fn exhausted() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Iterator for SpiralWalk {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.arm_size >= self.arm_max {
                return None;
            }
            if self.step < self.arm_size {
                let position = (self.x, self.y);
                let (dx, dy) = DIRECTIONS[self.turn % 4];
                self.x += dx;
                self.y += dy;
                self.step += 1;
                return Some(position);
            }
            self.step = 0;
            if self.turn % 2 == 1 {
                self.arm_size += 1;
            }
            self.turn += 1;
        }
    }
}

/// Counts from one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulePass {
    pub range: TileRange,
    pub evicted: usize,
    pub dropped_background: usize,
    pub requested: usize,
}

/// Decides which tiles a viewport needs and keeps a [`TileSet`] in step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTileScheduler {
    tile_size: f64,
}

impl ViewportTileScheduler {
    /// `tile_size` is the on-screen tile edge, density included.
    pub fn new(tile_size: f64) -> Self {
        Self { tile_size }
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn visible_range(&self, viewport: &Viewport) -> TileRange {
        TileRange::covering(
            viewport.origin(),
            viewport.width(),
            viewport.height(),
            viewport.scale,
            viewport.zoom,
            self.tile_size,
        )
    }

    /// Brings `tiles` in line with `viewport`.
    ///
    /// Background tiles off screen are dropped, foreground tiles outside the
    /// visible range are released, then missing cells are requested from
    /// `source` center-out.
    pub fn schedule(
        &self,
        tiles: &mut TileSet,
        source: &dyn TileSource,
        viewport: &Viewport,
    ) -> SchedulePass {
        if tiles.zoom() != viewport.zoom {
            tiles.move_to_background(viewport.zoom, self.tile_size);
        }

        let range = self.visible_range(viewport);
        let dropped_background = tiles.retain_background(&viewport.world_bounds(), self.tile_size);
        let evicted = tiles.evict_outside(&range, self.tile_size);

        let mut requested = 0;
        if (source.min_zoom()..=source.max_zoom()).contains(&viewport.zoom) {
            for (x, y) in range.spiral() {
                if tiles.request(source, x, y, self.tile_size) {
                    requested += 1;
                }
            }
        }

        if requested > 0 || evicted > 0 {
            log::debug!(
                "zoom {} range {}..{} x {}..{}: {} requested, {} evicted, {} background dropped",
                viewport.zoom,
                range.x_first,
                range.x_last,
                range.y_first,
                range.y_last,
                requested,
                evicted,
                dropped_background
            );
        }

        SchedulePass {
            range,
            evicted,
            dropped_background,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_example() {
        // 300 px wide at zoom 3 (8 columns) needs ceil(300/256)+1 = 3 columns.
        let range = TileRange::covering(Point::new(0.0, 0.0), 300.0, 300.0, 1.0, 3, 256.0);
        assert_eq!(range, TileRange::new(0, 0, 3, 3));

        // Near the east edge the range is clamped to the grid.
        let range = TileRange::covering(Point::new(1900.0, 0.0), 300.0, 300.0, 1.0, 3, 256.0);
        assert_eq!((range.x_first, range.x_last), (7, 8));

        // Origin left of the world clamps to column 0.
        let range = TileRange::covering(Point::new(-500.0, -500.0), 300.0, 300.0, 1.0, 3, 256.0);
        assert_eq!(range, TileRange::new(0, 0, 3, 3));
    }

    #[test]
    fn test_range_honours_scale() {
        let range = TileRange::covering(Point::new(0.0, 0.0), 512.0, 256.0, 2.0, 4, 256.0);
        assert_eq!(range.x_count(), 2);
        assert_eq!(range.y_count(), 2);
    }

    #[test]
    fn test_range_never_exceeds_grid() {
        let range = TileRange::covering(Point::new(0.0, 0.0), 5000.0, 5000.0, 1.0, 1, 256.0);
        assert_eq!(range, TileRange::new(0, 0, 2, 2));
        let range = TileRange::covering(Point::new(9000.0, 9000.0), 100.0, 100.0, 1.0, 1, 256.0);
        assert!(range.is_empty());
    }

    #[test]
    fn test_spiral_starts_at_center() {
        let range = TileRange::new(3, 3, 6, 6);
        let order: Vec<_> = range.spiral().collect();
        assert_eq!(order.len(), 9);
        assert_eq!(order[0], (4, 4));

        let raw: Vec<_> = SpiralWalk::new(4, 4, 5).take(9).collect();
        assert!(raw
            .iter()
            .all(|&(x, y)| (3..6).contains(&x) && (3..6).contains(&y)));
    }

    #[test]
    fn test_spiral_covers_wide_range_once() {
        let range = TileRange::new(2, 5, 9, 7);
        let mut order: Vec<_> = range.spiral().collect();
        assert_eq!(order.len(), 14);
        order.sort_unstable();
        order.dedup();
        assert_eq!(order.len(), 14);
    }

    #[test]
    fn test_spiral_first_ring_order() {
        let raw: Vec<_> = SpiralWalk::new(0, 0, 3).take(4).collect();
        assert_eq!(raw, vec![(0, 0), (1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn test_empty_range_spiral() {
        assert_eq!(TileRange::default().spiral().count(), 0);
    }
}
