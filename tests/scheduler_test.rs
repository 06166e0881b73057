mod common;

use common::RecordingSource;
use slippy_view::{
    Point, TileCoord, TileRange, TileSet, TileState, Viewport, ViewportTileScheduler,
};

#[cfg(test)]
mod scheduler_tests {
    use super::*;

    const TILE: f64 = 256.0;

    /// A viewport at `zoom` showing world pixels from `(wx, wy)`.
    fn viewport(zoom: u8, wx: f64, wy: f64, width: f64, height: f64) -> Viewport {
        let mut viewport = Viewport::new(zoom, width, height);
        viewport.offset = Point::new(-wx, -wy);
        viewport
    }

    #[test]
    fn test_visible_range_matches_viewport() {
        let scheduler = ViewportTileScheduler::new(TILE);
        let range = scheduler.visible_range(&viewport(3, 0.0, 0.0, 300.0, 300.0));
        assert_eq!(range, TileRange::new(0, 0, 3, 3));
    }

    #[test]
    fn test_first_request_is_center_tile() {
        let source = RecordingSource::new(false);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(4);

        // Columns and rows 3..6 at zoom 4: a 2.x tile wide window.
        let view = viewport(4, 3.0 * TILE, 3.0 * TILE, 2.0 * TILE, 2.0 * TILE);
        let pass = scheduler.schedule(&mut tiles, &source, &view);
        assert_eq!(pass.range, TileRange::new(3, 3, 6, 6));
        assert_eq!(pass.requested, 9);

        let fills = source.fills();
        assert_eq!(fills[0], TileCoord::new(4, 4, 4));
        assert!(fills.iter().all(|c| pass.range.contains(c.x, c.y)));
    }

    #[test]
    fn test_second_pass_requests_nothing() {
        let source = RecordingSource::new(false);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(5);
        let view = viewport(5, 1000.0, 1200.0, 640.0, 480.0);

        let first = scheduler.schedule(&mut tiles, &source, &view);
        assert!(first.requested > 0);
        let fills = source.fill_count();

        let second = scheduler.schedule(&mut tiles, &source, &view);
        assert_eq!(second.requested, 0);
        assert_eq!(second.evicted, 0);
        assert_eq!(source.fill_count(), fills);
    }

    #[test]
    fn test_pan_evicts_before_requesting() {
        let source = RecordingSource::new(false);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(5);

        scheduler.schedule(&mut tiles, &source, &viewport(5, 0.0, 0.0, 500.0, 500.0));
        let pass = scheduler.schedule(
            &mut tiles,
            &source,
            &viewport(5, 10.0 * TILE, 0.0, 500.0, 500.0),
        );
        assert!(pass.evicted > 0);
        assert!(tiles
            .foreground()
            .all(|t| pass.range.contains(t.coord().x, t.coord().y)));
        assert_eq!(tiles.index().len(), tiles.foreground_len());
    }

    #[test]
    fn test_zoom_in_keeps_scaled_background() {
        let source = RecordingSource::new(true);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(2);
        scheduler.schedule(&mut tiles, &source, &viewport(2, 0.0, 0.0, 1024.0, 1024.0));
        assert_eq!(tiles.foreground_len(), 16);

        // Zoom in on the south-west quarter of the world.
        tiles.move_to_background(3, TILE);
        assert_eq!(tiles.background().len(), 16);
        for tile in tiles.background() {
            let c = tile.coord();
            assert_eq!(tile.bounds().width(), 2.0 * TILE);
            assert_eq!(tile.bounds().min, Point::new(c.x as f64 * 512.0, c.y as f64 * 512.0));
        }

        let pass = scheduler.schedule(&mut tiles, &source, &viewport(3, 0.0, 0.0, 1024.0, 1024.0));
        assert_eq!(pass.dropped_background, 12);
        assert!(tiles
            .background()
            .iter()
            .all(|t| t.coord().x < 2 && t.coord().y < 2 && t.zoom() == 2));
        assert!(tiles.foreground().all(|t| t.zoom() == 3));
    }

    #[test]
    fn test_loading_tiles_are_released_on_zoom() {
        let source = RecordingSource::new(false);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(1);
        scheduler.schedule(&mut tiles, &source, &viewport(1, 0.0, 0.0, 512.0, 512.0));
        assert!(tiles.foreground().all(|t| t.state() == TileState::Loading));

        tiles.move_to_background(2, TILE);
        assert!(tiles.background().is_empty());
        assert_eq!(tiles.foreground_len(), 0);
    }

    #[test]
    fn test_background_dropped_after_moving_away() {
        let source = RecordingSource::new(true);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(6);
        scheduler.schedule(&mut tiles, &source, &viewport(6, 0.0, 0.0, 512.0, 512.0));
        tiles.move_to_background(7, TILE);
        assert!(!tiles.background().is_empty());

        let far = viewport(7, 20_000.0, 20_000.0, 512.0, 512.0);
        scheduler.schedule(&mut tiles, &source, &far);
        assert!(tiles.background().is_empty());
    }

    #[test]
    fn test_zoom_round_trip_promotes_tiles() {
        let source = RecordingSource::new(true);
        let scheduler = ViewportTileScheduler::new(TILE);
        let mut tiles = TileSet::new(3);
        let view = viewport(3, 0.0, 0.0, 512.0, 512.0);
        scheduler.schedule(&mut tiles, &source, &view);
        let fills = source.fill_count();

        tiles.move_to_background(4, TILE);
        tiles.move_to_background(3, TILE);
        let pass = scheduler.schedule(&mut tiles, &source, &view);
        assert_eq!(pass.requested, 0);
        assert_eq!(source.fill_count(), fills);
    }
}
