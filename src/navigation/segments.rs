//! Axis-aligned movement segments
//!
//! Office characters only walk horizontally or vertically. A simplified
//! route can contain diagonal legs, so each one is split into an L through
//! whichever corner is walkable.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::spatial::grid::OccupancyGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub axis: Axis,
}

impl MovementSegment {
    pub fn new(from: Vec2, to: Vec2, axis: Axis) -> Self {
        Self { from, to, axis }
    }

    pub fn length(&self) -> f32 {
        self.from.distance(&self.to)
    }
}

/// Turn waypoints into axis-aligned segments starting at `start`
///
/// A diagonal leg goes horizontal-first if the corner `(to.x, from.y)` is
/// walkable, else vertical-first through `(from.x, to.y)`. If both corners
/// are blocked the segments built so far are returned and the rest of the
/// route is dropped. Legs of zero length produce nothing.
pub fn decompose_path(start: Vec2, waypoints: &[Vec2], grid: &OccupancyGrid) -> Vec<MovementSegment> {
    let mut segments = Vec::with_capacity(waypoints.len() * 2);
    let mut current = start;

    for &target in waypoints {
        let same_x = current.x == target.x;
        let same_y = current.y == target.y;

        match (same_x, same_y) {
            (false, false) => {
                let horizontal_first = Vec2::new(target.x, current.y);
                let vertical_first = Vec2::new(current.x, target.y);

                if !grid.is_world_point_blocked(horizontal_first) {
                    segments.push(MovementSegment::new(current, horizontal_first, Axis::Horizontal));
                    segments.push(MovementSegment::new(horizontal_first, target, Axis::Vertical));
                } else if !grid.is_world_point_blocked(vertical_first) {
                    segments.push(MovementSegment::new(current, vertical_first, Axis::Vertical));
                    segments.push(MovementSegment::new(vertical_first, target, Axis::Horizontal));
                } else {
                    tracing::warn!(
                        "Both corners blocked between {:?} and {:?}, truncating route",
                        current,
                        target
                    );
                    return segments;
                }
            }
            (false, true) => segments.push(MovementSegment::new(current, target, Axis::Horizontal)),
            (true, false) => segments.push(MovementSegment::new(current, target, Axis::Vertical)),
            (true, true) => {}
        }

        current = target;
    }

    segments
}

/// Total walking distance of a segment list
pub fn total_length(segments: &[MovementSegment]) -> f32 {
    segments.iter().map(MovementSegment::length).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::obstacle::Obstacle;

    fn open_grid() -> OccupancyGrid {
        OccupancyGrid::new(100.0, 100.0, 10.0).unwrap()
    }

    #[test]
    fn test_straight_legs_keep_axis() {
        let grid = open_grid();
        let segments = decompose_path(
            Vec2::new(5.0, 5.0),
            &[Vec2::new(5.0, 5.0), Vec2::new(45.0, 5.0), Vec2::new(45.0, 85.0)],
            &grid,
        );

        assert_eq!(
            segments,
            vec![
                MovementSegment::new(Vec2::new(5.0, 5.0), Vec2::new(45.0, 5.0), Axis::Horizontal),
                MovementSegment::new(Vec2::new(45.0, 5.0), Vec2::new(45.0, 85.0), Axis::Vertical),
            ]
        );
        assert_eq!(total_length(&segments), 120.0);
    }

    #[test]
    fn test_diagonal_prefers_horizontal_first() {
        let grid = open_grid();
        let segments = decompose_path(Vec2::new(5.0, 5.0), &[Vec2::new(45.0, 45.0)], &grid);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].axis, Axis::Horizontal);
        assert_eq!(segments[0].to, Vec2::new(45.0, 5.0));
        assert_eq!(segments[1].axis, Axis::Vertical);
        assert_eq!(segments[1].to, Vec2::new(45.0, 45.0));
    }

    #[test]
    fn test_diagonal_falls_back_to_vertical_first() {
        let mut grid = open_grid();
        // Block the cell around (85, 5)
        grid.mark_obstacles(&[Obstacle::new(Vec2::new(85.0, 5.0), 1.0, 1.0)]);

        let segments = decompose_path(Vec2::new(5.0, 5.0), &[Vec2::new(85.0, 85.0)], &grid);

        assert_eq!(segments[0].axis, Axis::Vertical);
        assert_eq!(segments[0].to, Vec2::new(5.0, 85.0));
        assert_eq!(segments[1].axis, Axis::Horizontal);
    }

    #[test]
    fn test_both_corners_blocked_truncates() {
        let mut grid = open_grid();
        grid.mark_obstacles(&[
            Obstacle::new(Vec2::new(85.0, 45.0), 1.0, 1.0),
            Obstacle::new(Vec2::new(45.0, 85.0), 1.0, 1.0),
        ]);

        let segments = decompose_path(
            Vec2::new(5.0, 45.0),
            &[Vec2::new(45.0, 45.0), Vec2::new(85.0, 85.0), Vec2::new(95.0, 95.0)],
            &grid,
        );

        // Only the first straight leg survives
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].to, Vec2::new(45.0, 45.0));
    }

    #[test]
    fn test_every_segment_is_axis_aligned() {
        let grid = open_grid();
        let waypoints = [Vec2::new(15.0, 25.0), Vec2::new(75.0, 95.0), Vec2::new(35.0, 55.0)];
        for seg in decompose_path(Vec2::new(3.0, 4.0), &waypoints, &grid) {
            match seg.axis {
                Axis::Horizontal => assert_eq!(seg.from.y, seg.to.y),
                Axis::Vertical => assert_eq!(seg.from.x, seg.to.x),
            }
        }
    }
}
