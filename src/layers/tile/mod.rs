//! Tile bookkeeping for a view
//!
//! - [`TileSet`] holds the foreground and background tiles
//! - [`TileIndex`] tracks which foreground cells are occupied
//! - [`ViewportTileScheduler`] maps a viewport to a [`TileRange`] and keeps
//!   the set in step with it

pub mod index;
pub mod scheduler;
pub mod set;
pub mod types;

pub use index::TileIndex;
pub use scheduler::{SchedulePass, SpiralWalk, TileRange, ViewportTileScheduler};
pub use set::TileSet;
pub use types::{Tile, TileState, TileTicket};
