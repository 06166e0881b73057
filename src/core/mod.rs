//! Geometry, projection, configuration, and the map view itself

pub mod bounds;
pub mod config;
pub mod constants;
pub mod geo;
pub mod map;
pub mod projection;
pub mod viewport;
