use crate::core::bounds::Bounds;
use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// The visible window onto the tile pyramid.
///
/// `offset` is the screen position of the world origin, so a world pixel `w`
/// at the current zoom lands on screen at `w * scale + offset`. `zoom` is
/// always the pyramid level of the foreground tiles; `scale` interpolates
/// continuously between levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub offset: Point,
    pub scale: f64,
    pub zoom: u8,
    /// The size of the viewport in pixels
    pub size: Point,
}

impl Viewport {
    pub fn new(zoom: u8, width: f64, height: f64) -> Self {
        Self {
            offset: Point::default(),
            scale: 1.0,
            zoom,
            size: Point::new(width, height),
        }
    }

    pub fn width(&self) -> f64 {
        self.size.x
    }

    pub fn height(&self) -> f64 {
        self.size.y
    }

    /// World pixel shown at the screen origin.
    pub fn origin(&self) -> Point {
        self.to_world(Point::default())
    }

    pub fn to_world(&self, screen: Point) -> Point {
        screen.subtract(&self.offset).multiply(1.0 / self.scale)
    }

    pub fn to_screen(&self, world: Point) -> Point {
        world.multiply(self.scale).add(&self.offset)
    }

    /// World-pixel box covered by the viewport at the current zoom.
    pub fn world_bounds(&self) -> Bounds {
        let origin = self.origin();
        Bounds::from_origin_and_size(
            origin,
            self.size.x / self.scale,
            self.size.y / self.scale,
        )
    }

    /// Screen box of a world-pixel box.
    pub fn screen_bounds(&self, world: &Bounds) -> Bounds {
        Bounds::new(self.to_screen(world.min), self.to_screen(world.max))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_screen_round_trip() {
        let mut viewport = Viewport::new(3, 800.0, 600.0);
        viewport.offset = Point::new(-300.0, -120.0);
        viewport.scale = 1.5;

        let world = Point::new(512.0, 256.0);
        let back = viewport.to_world(viewport.to_screen(world));
        assert!((back.x - world.x).abs() < 1e-9);
        assert!((back.y - world.y).abs() < 1e-9);
    }

    #[test]
    fn test_world_bounds() {
        let mut viewport = Viewport::new(3, 800.0, 600.0);
        viewport.offset = Point::new(-200.0, -100.0);
        viewport.scale = 2.0;

        let bounds = viewport.world_bounds();
        assert_eq!(bounds.min, Point::new(100.0, 50.0));
        assert_eq!(bounds.width(), 400.0);
        assert_eq!(bounds.height(), 300.0);
    }
}
