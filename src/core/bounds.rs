use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Represents an axis-aligned box in screen or world-pixel coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Creates new bounds from two points
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Creates bounds from an origin and a size
    pub fn from_origin_and_size(origin: Point, width: f64, height: f64) -> Self {
        Self::new(origin, Point::new(origin.x + width, origin.y + height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if the bounds overlap another bounds with a non-empty area.
    /// Boxes that merely share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        other.max.x > self.min.x
            && other.min.x < self.max.x
            && other.max.y > self.min.y
            && other.min.y < self.max.y
    }

    /// Returns the box scaled about the origin of its coordinate space
    pub fn scaled(&self, factor: f64) -> Bounds {
        Bounds::new(self.min.multiply(factor), self.max.multiply(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let a = Bounds::from_coords(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Bounds::from_coords(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Bounds::from_coords(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Bounds::from_coords(-30.0, -30.0, -20.0, -20.0)));
    }

    #[test]
    fn test_scaled() {
        let a = Bounds::from_origin_and_size(Point::new(256.0, 512.0), 256.0, 256.0);
        let b = a.scaled(2.0);
        assert_eq!(b.min, Point::new(512.0, 1024.0));
        assert_eq!(b.width(), 512.0);
        assert!(b.contains(&Point::new(600.0, 1100.0)));
    }
}
