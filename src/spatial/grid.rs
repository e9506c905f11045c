//! Occupancy grid for pathfinding
//!
//! The world is discretized into square cells. A cell is either clear or
//! occupied by furniture (plus a one-cell safety buffer so agents never
//! clip into a desk). The grid is written when obstacles are marked and is
//! read-only for every search after that.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::WorldConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{Rect, Vec2};
use crate::spatial::obstacle::Obstacle;

/// Integer cell coordinates. May lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// 4-connected neighbours, in the order the search expands them
    pub fn neighbors4(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x, self.y + 1),
            GridCoord::new(self.x, self.y - 1),
            GridCoord::new(self.x + 1, self.y),
            GridCoord::new(self.x - 1, self.y),
        ]
    }
}

/// Boolean occupancy grid with fixed cell size
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cell_size: f32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Build an all-clear grid covering `world_width` x `world_height`
    pub fn new(world_width: f32, world_height: f32, cell_size: f32) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        if !(world_width.is_finite() && world_height.is_finite()) {
            return Err(SimError::InvalidConfig("world size must be finite".into()));
        }

        let width = (world_width / cell_size).ceil().max(0.0) as usize;
        let height = (world_height / cell_size).ceil().max(0.0) as usize;
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfig(format!(
                "grid for {world_width}x{world_height} world is empty"
            )));
        }

        tracing::debug!(
            "Pathfinding grid initialized: {}x{} (cell size {})",
            width,
            height,
            cell_size
        );

        Ok(Self {
            width,
            height,
            cell_size,
            cells: vec![false; width * height],
        })
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        Self::new(config.width, config.height, config.cell_size)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        self.index(coord.x, coord.y).is_some()
    }

    /// Rasterize obstacle footprints. Returns how many cells became occupied.
    ///
    /// Each footprint is inflated by one cell on every side, except that the
    /// bottom edge first gives up `passable_height`. Already occupied cells
    /// are left alone, so marking the same set twice changes nothing.
    pub fn mark_obstacles(&mut self, obstacles: &[Obstacle]) -> usize {
        let cs = self.cell_size;
        let buffer = cs;
        let mut marked = 0;

        for obstacle in obstacles {
            let left = ((obstacle.center.x - obstacle.half_width - buffer) / cs).floor() as i64;
            let right = ((obstacle.center.x + obstacle.half_width + buffer) / cs).ceil() as i64;
            let top = ((obstacle.center.y - obstacle.half_height - buffer) / cs).floor() as i64;
            let solid_bottom = obstacle.center.y + obstacle.half_height - obstacle.passable_height;
            let bottom = ((solid_bottom + buffer) / cs).ceil() as i64;

            let x_range = left.max(0)..right.min(self.width as i64);
            let y_range = top.max(0)..bottom.min(self.height as i64);

            for y in y_range {
                for x in x_range.clone() {
                    let idx = y as usize * self.width + x as usize;
                    if !self.cells[idx] {
                        self.cells[idx] = true;
                        marked += 1;
                    }
                }
            }
        }

        tracing::debug!("Marked {} obstacle cells from {} obstacles", marked, obstacles.len());
        marked
    }

    /// Clear the grid and mark a new obstacle set
    pub fn reinitialize(&mut self, obstacles: &[Obstacle]) -> usize {
        self.cells.iter_mut().for_each(|c| *c = false);
        self.mark_obstacles(obstacles)
    }

    /// False if out of bounds or occupied
    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|idx| !self.cells[idx])
    }

    #[inline]
    pub fn is_walkable_coord(&self, coord: GridCoord) -> bool {
        self.is_walkable(coord.x, coord.y)
    }

    /// Floor division into cell coordinates (no clamping)
    #[inline]
    pub fn world_to_grid(&self, pos: Vec2) -> GridCoord {
        GridCoord::new(
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Cell center in world coordinates
    #[inline]
    pub fn grid_to_world(&self, coord: GridCoord) -> Vec2 {
        Vec2::new(
            coord.x as f32 * self.cell_size + self.cell_size / 2.0,
            coord.y as f32 * self.cell_size + self.cell_size / 2.0,
        )
    }

    pub fn is_world_point_blocked(&self, pos: Vec2) -> bool {
        !self.is_walkable_coord(self.world_to_grid(pos))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Sample a walkable point inside `region`; falls back to the region
    /// center if `attempts` samples all land on furniture
    pub fn random_walkable_point<R: Rng>(&self, region: Rect, rng: &mut R, attempts: u32) -> Vec2 {
        for _ in 0..attempts {
            let p = Vec2::new(
                rng.gen_range(region.min.x..=region.max.x),
                rng.gen_range(region.min.y..=region.max.y),
            );
            if !self.is_world_point_blocked(p) {
                return p;
            }
        }
        region.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scenario_grid() -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(100.0, 100.0, 10.0).unwrap();
        grid.mark_obstacles(&[Obstacle::new(Vec2::new(50.0, 50.0), 20.0, 20.0)]);
        grid
    }

    #[test]
    fn test_dimensions_round_up() {
        let grid = OccupancyGrid::new(1600.0, 900.0, 8.0).unwrap();
        assert_eq!(grid.width(), 200);
        assert_eq!(grid.height(), 113);
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        assert!(OccupancyGrid::new(100.0, 100.0, 0.0).is_err());
        assert!(OccupancyGrid::new(100.0, 100.0, -1.0).is_err());
        assert!(OccupancyGrid::new(100.0, 100.0, f32::NAN).is_err());
    }

    #[test]
    fn test_zero_size_world_rejected() {
        assert!(matches!(
            OccupancyGrid::new(0.0, 100.0, 10.0),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_scenario_block_with_buffer() {
        let grid = scenario_grid();
        // Footprint 30..70 plus one cell of buffer covers cells 2..=7
        for y in 0..10 {
            for x in 0..10 {
                let expected_blocked = (2..=7).contains(&x) && (2..=7).contains(&y);
                assert_eq!(
                    !grid.is_walkable(x, y),
                    expected_blocked,
                    "cell ({x}, {y})"
                );
            }
        }
        assert_eq!(grid.occupied_count(), 36);
    }

    #[test]
    fn test_out_of_bounds_not_walkable() {
        let grid = scenario_grid();
        assert!(!grid.is_walkable(-1, 0));
        assert!(!grid.is_walkable(0, 10));
        assert!(!grid.is_walkable(10, 0));
        assert!(grid.is_world_point_blocked(Vec2::new(-5.0, 5.0)));
    }

    #[test]
    fn test_mark_twice_is_idempotent() {
        let obstacles = [
            Obstacle::new(Vec2::new(50.0, 50.0), 20.0, 20.0),
            Obstacle::new(Vec2::new(20.0, 80.0), 5.0, 5.0),
        ];
        let mut grid = OccupancyGrid::new(100.0, 100.0, 10.0).unwrap();
        let first = grid.mark_obstacles(&obstacles);
        let snapshot = grid.cells.clone();

        assert_eq!(grid.mark_obstacles(&obstacles), 0);
        assert_eq!(grid.cells, snapshot);
        assert_eq!(grid.occupied_count(), first);
    }

    #[test]
    fn test_passable_band_under_desk() {
        // Office desk: 80x60 sprite at 1.5x scale, 30px you can walk under
        let desk = Obstacle::from_sprite(
            Vec2::new(150.0, 370.0),
            Vec2::new(80.0, 60.0),
            Vec2::new(1.5, 1.5),
            30.0,
        );
        let mut grid = OccupancyGrid::new(1600.0, 900.0, 8.0).unwrap();
        grid.mark_obstacles(&[desk]);

        let bottom_edge = desk.center.y + desk.half_height;
        let under = Vec2::new(desk.center.x, bottom_edge - desk.passable_height / 2.0);
        assert!(!grid.is_world_point_blocked(under));
        assert!(grid.is_world_point_blocked(desk.center));
    }

    #[test]
    fn test_reinitialize_replaces_obstacles() {
        let mut grid = scenario_grid();
        grid.reinitialize(&[Obstacle::new(Vec2::new(10.0, 10.0), 1.0, 1.0)]);
        assert!(grid.is_walkable(5, 5));
        assert!(!grid.is_walkable(1, 1));
    }

    #[test]
    fn test_world_grid_conversion() {
        let grid = OccupancyGrid::new(100.0, 100.0, 10.0).unwrap();
        assert_eq!(grid.world_to_grid(Vec2::new(15.0, 99.9)), GridCoord::new(1, 9));
        assert_eq!(grid.grid_to_world(GridCoord::new(1, 9)), Vec2::new(15.0, 95.0));
        // A point maps to the center of the cell containing it
        let p = Vec2::new(33.3, 71.0);
        assert_eq!(grid.grid_to_world(grid.world_to_grid(p)), Vec2::new(35.0, 75.0));
    }

    #[test]
    fn test_random_walkable_point_avoids_furniture() {
        let grid = scenario_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let region = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(99.0, 99.0));
        for _ in 0..20 {
            let p = grid.random_walkable_point(region, &mut rng, 50);
            assert!(!grid.is_world_point_blocked(p));
        }
    }

    #[test]
    fn test_random_walkable_point_falls_back_to_center() {
        let grid = scenario_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let region = Rect::new(Vec2::new(40.0, 40.0), Vec2::new(60.0, 60.0));
        assert_eq!(grid.random_walkable_point(region, &mut rng, 10), Vec2::new(50.0, 50.0));
    }
}
