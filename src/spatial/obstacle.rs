//! Static furniture footprints
//!
//! Obstacles are read-only inputs from the scene. The grid only keeps
//! their rasterized footprint.

use serde::{Deserialize, Serialize};

use crate::core::types::{Rect, Vec2};

/// World-space rectangle that blocks walking, except for an optional band
/// along its bottom edge (the space under a desk)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub half_width: f32,
    pub half_height: f32,
    #[serde(default)]
    pub passable_height: f32,
}

impl Obstacle {
    pub fn new(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self {
            center,
            half_width,
            half_height,
            passable_height: 0.0,
        }
    }

    pub fn with_passable_height(mut self, passable_height: f32) -> Self {
        self.passable_height = passable_height.max(0.0);
        self
    }

    /// Build from sprite-style data: position, unscaled size and scale
    pub fn from_sprite(position: Vec2, size: Vec2, scale: Vec2, passable_height: f32) -> Self {
        Self::new(position, size.x * scale.x / 2.0, size.y * scale.y / 2.0)
            .with_passable_height(passable_height)
    }

    /// Full visual bounds
    pub fn bounds(&self) -> Rect {
        Rect::new(
            Vec2::new(self.center.x - self.half_width, self.center.y - self.half_height),
            Vec2::new(self.center.x + self.half_width, self.center.y + self.half_height),
        )
    }

    /// Bounds of the part that actually blocks movement
    pub fn solid_bounds(&self) -> Rect {
        let mut rect = self.bounds();
        rect.max.y -= self.passable_height;
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sprite_applies_scale() {
        let desk = Obstacle::from_sprite(
            Vec2::new(150.0, 370.0),
            Vec2::new(80.0, 60.0),
            Vec2::new(1.5, 1.5),
            30.0,
        );
        assert_eq!(desk.half_width, 60.0);
        assert_eq!(desk.half_height, 45.0);
        assert_eq!(desk.passable_height, 30.0);
    }

    #[test]
    fn test_solid_bounds_excludes_passable_band() {
        let desk = Obstacle::new(Vec2::new(50.0, 50.0), 20.0, 20.0).with_passable_height(10.0);
        let solid = desk.solid_bounds();
        assert_eq!(solid.min.y, 30.0);
        assert_eq!(solid.max.y, 60.0);
        assert_eq!(desk.bounds().max.y, 70.0);
    }

    #[test]
    fn test_negative_passable_height_clamped() {
        let box_ = Obstacle::new(Vec2::ZERO, 5.0, 5.0).with_passable_height(-3.0);
        assert_eq!(box_.passable_height, 0.0);
    }
}
