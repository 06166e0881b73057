use crate::{
    core::{
        bounds::Bounds,
        config::ViewConfig,
        constants::DEFAULT_TICK_INTERVAL,
        geo::{LatLng, Point},
        projection,
        viewport::Viewport,
    },
    events::{EventBus, MapEvent},
    layers::tile::{Tile, TileSet, ViewportTileScheduler},
    prelude::{Arc, Duration, Instant},
    tiles::TileSource,
    MapError, Result,
};
use crossbeam_channel::Receiver;

fn check_source(source: &dyn TileSource) -> Result<()> {
    if source.tile_size() == 0 {
        return Err(MapError::InvalidSource("tile size must be positive".into()));
    }
    if source.min_zoom() > source.max_zoom() {
        return Err(MapError::InvalidSource(format!(
            "min zoom {} above max zoom {}",
            source.min_zoom(),
            source.max_zoom()
        )));
    }
    Ok(())
}

fn clamp_zoom(source: &dyn TileSource, zoom: u8) -> u8 {
    zoom.min(source.max_zoom()).max(source.min_zoom())
}

/// What one [`MapView::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// A pending viewport update ran
    pub updated: bool,
    /// Completions applied from the downloader
    pub drained: usize,
    /// Tiles are still fading in
    pub animating: bool,
}

/// A slippy-map view over one tile source.
///
/// Screen coordinates have their origin at the bottom-left of the view and
/// grow up and to the right, the same orientation as world pixels. Geometry
/// changes only mark an update as pending; [`MapView::tick`] runs it,
/// applies finished downloads, and advances fade-ins.
pub struct MapView {
    source: Arc<dyn TileSource>,
    config: ViewConfig,
    viewport: Viewport,
    tiles: TileSet,
    scheduler: ViewportTileScheduler,
    center: LatLng,
    events: EventBus,
    pending: bool,
}

impl MapView {
    /// A `width` x `height` view centered on (0, 0) at the configured zoom.
    ///
    /// Fails when `config` or the source's zoom range and tile size are
    /// unusable.
    pub fn new(
        source: Arc<dyn TileSource>,
        config: ViewConfig,
        width: f64,
        height: f64,
    ) -> Result<Self> {
        config.validate()?;
        check_source(source.as_ref())?;
        let zoom = clamp_zoom(source.as_ref(), config.default_zoom);
        let scheduler = ViewportTileScheduler::new(config.scaled_tile_size(source.tile_size()));
        let mut view = Self {
            tiles: TileSet::new(zoom).with_fade_rate(config.fade_rate),
            viewport: Viewport::new(zoom, width, height),
            source,
            config,
            scheduler,
            center: LatLng::default(),
            events: EventBus::new(),
            pending: false,
        };
        view.center_on(0.0, 0.0);
        Ok(view)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> u8 {
        self.viewport.zoom
    }

    pub fn scale(&self) -> f64 {
        self.viewport.scale
    }

    /// Latitude at the view center as of the last update.
    pub fn lat(&self) -> f64 {
        self.center.lat
    }

    /// Longitude at the view center as of the last update.
    pub fn lon(&self) -> f64 {
        self.center.lng
    }

    pub fn tiles(&self) -> &TileSet {
        &self.tiles
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn attribution(&self) -> &str {
        self.source.attribution()
    }

    pub fn background_color(&self) -> [f32; 4] {
        self.config.background_color
    }

    /// On-screen edge of a foreground tile at scale 1.
    pub fn tile_size(&self) -> f64 {
        self.scheduler.tile_size()
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending
    }

    /// Screen rectangle at which `tile` should be drawn.
    pub fn screen_rect(&self, tile: &Tile) -> Bounds {
        self.viewport.screen_bounds(tile.bounds())
    }

    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        self.events.subscribe()
    }

    fn screen_center(&self) -> Point {
        Point::new(self.viewport.width() / 2.0, self.viewport.height() / 2.0)
    }

    fn world_at(&self, zoom: u8, lat: f64, lon: f64) -> Point {
        let tile_size = self.tile_size();
        Point::new(
            projection::pixel_x(zoom, lon, tile_size),
            projection::pixel_y(zoom, lat, tile_size),
        )
    }

    /// Geographic position under screen point `(x, y)`.
    pub fn get_lat_lon_at(&self, x: f64, y: f64) -> LatLng {
        let world = self.viewport.to_world(Point::new(x, y));
        let tile_size = self.tile_size();
        LatLng::new(
            projection::lat(self.viewport.zoom, world.y, tile_size),
            projection::lon(self.viewport.zoom, world.x, tile_size),
        )
    }

    /// Moves the view so `(lat, lon)` sits at its center. Non-finite
    /// coordinates are ignored.
    pub fn center_on(&mut self, lat: f64, lon: f64) {
        if !(lat.is_finite() && lon.is_finite()) {
            log::warn!("ignoring center_on({lat}, {lon})");
            return;
        }
        let target = LatLng::new(lat, lon).clamped();
        let world = self.world_at(self.viewport.zoom, target.lat, target.lng);
        self.viewport.offset = self
            .screen_center()
            .subtract(&world.multiply(self.viewport.scale));
        self.center = target;
        self.request_update();
    }

    /// Changes zoom keeping the view center in place.
    pub fn set_zoom(&mut self, zoom: u8) {
        let center = self.screen_center();
        self.set_zoom_at(zoom, center.x, center.y);
    }

    /// Changes zoom keeping the geographic point under `(x, y)` in place.
    /// Scale resets to 1.
    pub fn set_zoom_at(&mut self, zoom: u8, x: f64, y: f64) {
        self.set_zoom_at_scale(zoom, x, y, 1.0);
    }

    pub fn set_zoom_at_scale(&mut self, zoom: u8, x: f64, y: f64, scale: f64) {
        let zoom = clamp_zoom(self.source.as_ref(), zoom);
        if zoom == self.viewport.zoom {
            return;
        }
        let scale = projection::clamp(scale, self.config.scale_min, self.config.scale_max);
        let anchor = Point::new(x, y);
        let world = self.viewport.to_world(anchor);
        let factor = 2f64.powi(zoom as i32 - self.viewport.zoom as i32);

        self.viewport.zoom = zoom;
        self.viewport.scale = scale;
        self.viewport.offset = anchor.subtract(&world.multiply(factor * scale));
        self.request_update();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.viewport.offset = self.viewport.offset.add(&Point::new(dx, dy));
        self.request_update();
    }

    /// Multiplies the scale by `2^d` around `(x, y)`.
    pub fn diff_scale_at(&mut self, d: f64, x: f64, y: f64) {
        self.scale_at(self.viewport.scale * 2f64.powf(d), x, y);
    }

    /// Sets the scale around `(x, y)`. Scales beyond 2 or below 1 fold into
    /// the next or previous zoom level where the source allows it.
    pub fn scale_at(&mut self, scale: f64, x: f64, y: f64) {
        if !(scale.is_finite() && x.is_finite() && y.is_finite()) {
            return;
        }
        let scale = projection::clamp(scale, self.config.scale_min, self.config.scale_max);
        let anchor = Point::new(x, y);
        let world = self.viewport.to_world(anchor);
        self.viewport.scale = scale;
        self.viewport.offset = anchor.subtract(&world.multiply(scale));

        let mut zoom = self.viewport.zoom;
        let mut scale = scale;
        while scale > 2.0 && zoom < self.source.max_zoom() {
            zoom += 1;
            scale /= 2.0;
        }
        while scale < 1.0 && zoom > self.source.min_zoom() {
            zoom -= 1;
            scale *= 2.0;
        }

        if zoom != self.viewport.zoom {
            self.set_zoom_at_scale(zoom, x, y, scale);
        } else {
            self.request_update();
        }
    }

    /// Resizes the view keeping its geographic center.
    pub fn resize(&mut self, width: f64, height: f64) {
        let center = self.screen_center();
        let target = self.get_lat_lon_at(center.x, center.y);
        self.viewport.size = Point::new(width, height);
        self.center_on(target.lat, target.lng);
    }

    /// Swaps the tile source, releasing every tile. An unusable source is
    /// rejected and the current one kept.
    pub fn set_map_source(&mut self, source: Arc<dyn TileSource>) -> Result<()> {
        check_source(source.as_ref())?;
        let center = self.screen_center();
        let target = self.get_lat_lon_at(center.x, center.y);

        self.tiles.clear();
        self.scheduler = ViewportTileScheduler::new(self.config.scaled_tile_size(source.tile_size()));
        self.viewport.zoom = clamp_zoom(source.as_ref(), self.viewport.zoom);
        self.source = source;
        log::info!("map source changed, zoom {}", self.viewport.zoom);
        self.center_on(target.lat, target.lng);
        Ok(())
    }

    /// Matches zoom and center with `other`.
    pub fn sync_to(&mut self, other: &MapView) {
        let center = self.screen_center();
        if self.viewport.zoom != other.viewport.zoom {
            self.set_zoom_at(other.viewport.zoom, center.x, center.y);
        }
        let target = other.get_lat_lon_at(center.x, center.y);
        self.center_on(target.lat, target.lng);
    }

    /// Releases every tile. Downloads still running resolve to stale tickets.
    pub fn unload(&mut self) {
        self.tiles.clear();
        self.pending = false;
    }

    fn request_update(&mut self) {
        self.pending = true;
    }

    /// Runs a pending update immediately.
    pub fn update(&mut self) -> bool {
        if !std::mem::take(&mut self.pending) {
            return false;
        }
        self.run_update();
        true
    }

    /// Tiles from another zoom move to the background inside the scheduler
    /// pass, so a recenter at the same zoom keeps its loading tiles.
    fn run_update(&mut self) {
        let zoom = self.viewport.zoom;
        let center = self.screen_center();
        self.center = self.get_lat_lon_at(center.x, center.y);
        self.events.publish(MapEvent::Relocated {
            zoom,
            lat: self.center.lat,
            lon: self.center.lng,
        });

        let source = Arc::clone(&self.source);
        self.scheduler
            .schedule(&mut self.tiles, source.as_ref(), &self.viewport);
    }

    /// One frame of work: the pending update, completed downloads within
    /// the downloader's budget, then fade-ins advanced by `dt`.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        let updated = self.update();

        let source = Arc::clone(&self.source);
        let drained = match source.downloader() {
            Some(downloader) => downloader.drain_capped(|outcome| {
                self.tiles.apply(outcome);
            }),
            None => 0,
        };

        let animating = self.tiles.animate(dt.as_secs_f32());
        TickReport {
            updated,
            drained,
            animating,
        }
    }

    /// Ticks at the downloader's cadence until `done` holds or `timeout`
    /// passes, sleeping between frames. Returns whether `done` held.
    pub fn run_until(&mut self, timeout: Duration, mut done: impl FnMut(&MapView) -> bool) -> bool {
        let interval = self
            .source
            .downloader()
            .map(|downloader| downloader.config().tick_interval())
            .unwrap_or(DEFAULT_TICK_INTERVAL);
        let deadline = Instant::now() + timeout;
        loop {
            self.tick(interval);
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(interval);
        }
    }
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("viewport", &self.viewport)
            .field("center", &self.center)
            .field("foreground", &self.tiles.foreground_len())
            .field("background", &self.tiles.background().len())
            .field("pending", &self.pending)
            .finish()
    }
}
