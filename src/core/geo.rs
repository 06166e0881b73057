use crate::core::constants::{
    EARTH_RADIUS_KM, MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE,
};
use crate::core::projection;
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        (MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat)
            && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.lng)
    }

    /// Returns a copy with both components clamped to the valid ranges
    pub fn clamped(&self) -> Self {
        Self::new(
            self.lat.clamp(MIN_LATITUDE, MAX_LATITUDE),
            self.lng.clamp(MIN_LONGITUDE, MAX_LONGITUDE),
        )
    }

    /// Great-circle distance to another coordinate, in kilometres
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        haversine_km(self.lng, self.lat, other.lng, other.lat)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Haversine distance between two (lon, lat) pairs given in degrees.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_KM
}

/// Represents a point in screen or world-pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A cell of the tile pyramid.
///
/// Rows count from the southern edge of the world (TMS order); sources that
/// serve XYZ rows flip them when building request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Checks if the tile lies inside the grid of its zoom level
    pub fn is_valid(&self) -> bool {
        self.x < projection::col_count(self.z) && self.y < projection::row_count(self.z)
    }

    /// Row index in the XYZ convention (row 0 at the northern edge)
    pub fn flipped_y(&self) -> u32 {
        projection::row_count(self.z)
            .saturating_sub(self.y)
            .saturating_sub(1)
    }
}
