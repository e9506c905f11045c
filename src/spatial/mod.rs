//! Spatial model: obstacle footprints rasterized onto an occupancy grid

pub mod grid;
pub mod obstacle;

pub use grid::{GridCoord, OccupancyGrid};
pub use obstacle::Obstacle;
