//! Spherical (Web) Mercator projection between geographic coordinates and
//! world pixels.
//!
//! World pixels span `tile_size * 2^zoom` along each axis. x grows eastward
//! from the antimeridian and y grows northward from the southern edge, the
//! same orientation as the tile rows handed to [`crate::tiles::TileSource`].
//! Every function here is pure and recovers from out-of-range input by
//! clamping instead of failing.

use crate::core::constants::{
    EQUATOR_LENGTH_M, MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE,
};
use std::f64::consts::PI;

/// Clamp helper mirroring `f64::clamp` without its `min <= max` panic.
pub fn clamp(value: f64, minimum: f64, maximum: f64) -> f64 {
    minimum.max(value.min(maximum))
}

/// Latitudes closer to the poles than this are nudged inward before the
/// tangent/secant formula, which diverges at exactly ±90°.
const POLE_EPSILON: f64 = 1e-9;

fn world_size(zoom: u8, tile_size: f64) -> f64 {
    2f64.powi(zoom as i32) * tile_size
}

/// World-pixel x of a longitude.
pub fn pixel_x(zoom: u8, lon: f64, tile_size: f64) -> f64 {
    let lon = clamp(lon, MIN_LONGITUDE, MAX_LONGITUDE);
    (lon + 180.0) / 360.0 * world_size(zoom, tile_size)
}

/// World-pixel y of a latitude.
pub fn pixel_y(zoom: u8, lat: f64, tile_size: f64) -> f64 {
    let lat = clamp(-lat, MIN_LATITUDE + POLE_EPSILON, MAX_LATITUDE - POLE_EPSILON);
    let lat = lat.to_radians();
    // asinh(tan φ) == ln(tan φ + sec φ), without the cancellation near the poles
    (1.0 - lat.tan().asinh() / PI) / 2.0 * world_size(zoom, tile_size)
}

/// Longitude of a world-pixel x.
pub fn lon(zoom: u8, x: f64, tile_size: f64) -> f64 {
    let lon = x / world_size(zoom, tile_size) * 360.0 - 180.0;
    clamp(lon, MIN_LONGITUDE, MAX_LONGITUDE)
}

/// Latitude of a world-pixel y.
pub fn lat(zoom: u8, y: f64, tile_size: f64) -> f64 {
    let n = PI - 2.0 * PI * y / world_size(zoom, tile_size);
    let lat = -(0.5 * (n.exp() - (-n).exp())).atan().to_degrees();
    clamp(lat, MIN_LATITUDE, MAX_LATITUDE)
}

/// Number of tile rows at `zoom`.
pub fn row_count(zoom: u8) -> u32 {
    if zoom == 0 {
        1
    } else {
        2u32 << (zoom - 1)
    }
}

/// Number of tile columns at `zoom`.
pub fn col_count(zoom: u8) -> u32 {
    row_count(zoom)
}

/// Rough zoom level at which a 1024 px wide view spans `radius_km`.
pub fn zoom_for_radius(radius_km: f64) -> u8 {
    let radius = radius_km * 1000.0;
    let width_in_pixels = 1024.0;
    let mut meters_per_pixel = EQUATOR_LENGTH_M / 256.0;
    let mut zoom: u8 = 1;
    while meters_per_pixel * width_in_pixels > radius && zoom < u8::MAX {
        meters_per_pixel /= 2.0;
        zoom += 1;
    }
    zoom - 1
}
