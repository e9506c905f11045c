//! Route planning on the occupancy grid

pub mod pathfinding;
pub mod segments;

pub use pathfinding::{find_path, has_line_of_sight, simplify_path, PathRequest, PathResult};
pub use segments::{decompose_path, Axis, MovementSegment};
