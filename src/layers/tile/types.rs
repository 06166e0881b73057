//! Core data types for tile layer functionality

use crate::core::bounds::Bounds;
use crate::core::geo::{Point, TileCoord};
use std::path::{Path, PathBuf};

/// Identity of one request for a tile. Completions carrying a ticket that no
/// longer matches a live tile are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTicket(u64);

impl TileTicket {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Waiting for a source
    Loading,
    /// Source attached, fade-in not started
    NeedsAnimation,
    /// Fading in or fully shown
    Animated,
    /// Released; never revived
    Done,
}

/// One cell of the pyramid as the view sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    ticket: TileTicket,
    coord: TileCoord,
    /// World-pixel rectangle at the zoom the tile is currently drawn at
    bounds: Bounds,
    state: TileState,
    source: Option<PathBuf>,
    opacity: f32,
}

impl Tile {
    /// A loading tile placed at its own zoom level.
    pub fn new(ticket: TileTicket, coord: TileCoord, tile_size: f64) -> Self {
        let mut tile = Self {
            ticket,
            coord,
            bounds: Bounds::default(),
            state: TileState::Loading,
            source: None,
            opacity: 0.0,
        };
        tile.place(coord.z, tile_size);
        tile
    }

    pub fn ticket(&self) -> TileTicket {
        self.ticket
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn zoom(&self) -> u8 {
        self.coord.z
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == TileState::Done
    }

    pub fn is_loading(&self) -> bool {
        self.state == TileState::Loading
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Attaches imagery to a loading tile. Returns false when the tile was
    /// not waiting for one.
    pub fn set_source(&mut self, path: impl Into<PathBuf>) -> bool {
        if self.state != TileState::Loading {
            return false;
        }
        self.source = Some(path.into());
        self.state = TileState::NeedsAnimation;
        true
    }

    pub fn mark_done(&mut self) {
        self.state = TileState::Done;
    }

    /// Positions the tile for drawing at `zoom`, scaling by `2^(zoom - z)`.
    pub fn place(&mut self, zoom: u8, tile_size: f64) {
        let factor = 2f64.powi(zoom as i32 - self.coord.z as i32);
        self.bounds = Bounds::from_origin_and_size(
            Point::new(self.coord.x as f64 * tile_size, self.coord.y as f64 * tile_size),
            tile_size,
            tile_size,
        )
        .scaled(factor);
    }

    /// Advances the fade-in by `dt` seconds. Returns true while the tile
    /// still needs frames.
    pub fn animate(&mut self, dt: f32, fade_rate: f32) -> bool {
        match self.state {
            TileState::NeedsAnimation => {
                self.state = TileState::Animated;
                self.opacity = 0.0;
                true
            }
            TileState::Animated if self.opacity < 1.0 => {
                self.opacity = (self.opacity + dt * fade_rate).min(1.0);
                self.opacity < 1.0
            }
            _ => false,
        }
    }
}
