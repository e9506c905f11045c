//! A* pathfinding over the occupancy grid
//!
//! 4-connected search with a Manhattan heuristic and a penalty for cells
//! next to furniture. With some probability the second-best open node is
//! expanded instead of the best one, so NPC routes bend a little instead of
//! looking machine-drawn. Routes are returned as cell centers with every
//! waypoint that has a clear line of sight past it removed.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ahash::{AHashMap, AHashSet};
use rand::Rng;

use crate::core::types::Vec2;
use crate::spatial::grid::{GridCoord, OccupancyGrid};

pub const DEFAULT_SUBOPTIMAL_CHANCE: f64 = 0.2;
pub const DEFAULT_OBSTACLE_PENALTY: u32 = 5;

/// One path search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRequest {
    pub start: Vec2,
    pub end: Vec2,
    /// Probability in [0, 1] of expanding the runner-up node
    pub suboptimal_chance: f64,
    /// Added per blocked cell among the 8 surrounding a candidate
    pub obstacle_penalty: u32,
}

impl PathRequest {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self {
            start,
            end,
            suboptimal_chance: DEFAULT_SUBOPTIMAL_CHANCE,
            obstacle_penalty: DEFAULT_OBSTACLE_PENALTY,
        }
    }

    pub fn with_suboptimal_chance(mut self, chance: f64) -> Self {
        self.suboptimal_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn with_obstacle_penalty(mut self, penalty: u32) -> Self {
        self.obstacle_penalty = penalty;
        self
    }
}

/// Simplified route in world coordinates. Empty means no route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    waypoints: Vec<Vec2>,
}

impl PathResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    pub fn into_waypoints(self) -> Vec<Vec2> {
        self.waypoints
    }

    pub fn first(&self) -> Option<Vec2> {
        self.waypoints.first().copied()
    }

    pub fn last(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: GridCoord,
    f_cost: u32, // g + heuristic + proximity penalty
    sequence: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.sequence == other.sequence
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier pushes win ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a walkable route from `request.start` to `request.end`
///
/// Returns an empty result if the start cell is blocked, if the end cell is
/// blocked and no walkable cell can be reached from it, or if the open set
/// runs dry.
pub fn find_path<R: Rng>(grid: &OccupancyGrid, request: &PathRequest, rng: &mut R) -> PathResult {
    let start = grid.world_to_grid(request.start);
    let mut goal = grid.world_to_grid(request.end);

    if !grid.is_walkable_coord(start) {
        tracing::warn!("Path start {:?} is inside an obstacle", start);
        return PathResult::failed();
    }
    if !grid.is_walkable_coord(goal) {
        tracing::debug!("Path end {:?} is blocked, looking for nearest walkable cell", goal);
        match find_nearest_walkable(grid, goal) {
            Some(nearest) => goal = nearest,
            None => {
                tracing::warn!("No walkable cell near path end {:?}", goal);
                return PathResult::failed();
            }
        }
    }

    let chance = request.suboptimal_chance.clamp(0.0, 1.0);
    let mut open_set = BinaryHeap::new();
    let mut closed: AHashSet<GridCoord> = AHashSet::new();
    let mut came_from: AHashMap<GridCoord, GridCoord> = AHashMap::new();
    let mut g_scores: AHashMap<GridCoord, u32> = AHashMap::new();
    let mut sequence = 0u64;

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        coord: start,
        f_cost: start.manhattan(&goal),
        sequence,
    });

    while !open_set.is_empty() {
        let chosen = if open_set.len() >= 2 && chance > 0.0 && rng.gen_bool(chance) {
            // Expand the runner-up; the best goes back once and competes again
            let best = open_set.pop();
            let second = open_set.pop();
            if let Some(best) = best {
                open_set.push(best);
            }
            second
        } else {
            open_set.pop()
        };
        let Some(current) = chosen else {
            break;
        };

        if current.coord == goal {
            return PathResult {
                waypoints: reconstruct_path(grid, &came_from, current.coord),
            };
        }

        // Stale duplicate of a cell that was already expanded
        if !closed.insert(current.coord) {
            continue;
        }

        let current_g = g_scores.get(&current.coord).copied().unwrap_or(u32::MAX);

        for neighbor in current.coord.neighbors4() {
            if !grid.is_walkable_coord(neighbor) || closed.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);

                sequence += 1;
                let f_cost = tentative_g
                    + neighbor.manhattan(&goal)
                    + obstacle_penalty(grid, neighbor, request.obstacle_penalty);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost,
                    sequence,
                });
            }
        }
    }

    tracing::warn!("No path from {:?} to {:?}", start, goal);
    PathResult::failed()
}

/// Breadth-first search outward from `from` for the closest walkable cell
pub fn find_nearest_walkable(grid: &OccupancyGrid, from: GridCoord) -> Option<GridCoord> {
    let mut queue = VecDeque::from([from]);
    let mut visited: AHashSet<GridCoord> = AHashSet::from_iter([from]);

    while let Some(current) = queue.pop_front() {
        if grid.is_walkable_coord(current) {
            return Some(current);
        }
        for next in current.neighbors4() {
            if grid.in_bounds(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    None
}

/// `per_cell` for every blocked cell among the 8 around `coord`
fn obstacle_penalty(grid: &OccupancyGrid, coord: GridCoord, per_cell: u32) -> u32 {
    let mut penalty = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            if !grid.is_walkable(coord.x + dx, coord.y + dy) {
                penalty += per_cell;
            }
        }
    }
    penalty
}

/// Reconstruct path from came_from map and simplify it
fn reconstruct_path(
    grid: &OccupancyGrid,
    came_from: &AHashMap<GridCoord, GridCoord>,
    mut current: GridCoord,
) -> Vec<Vec2> {
    let mut cells = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();

    let points: Vec<Vec2> = cells.into_iter().map(|c| grid.grid_to_world(c)).collect();
    simplify_path(grid, &points)
}

/// Drop interior waypoints the previous kept waypoint can see past
///
/// Greedy corridor test, not a funnel algorithm: `path[i-1]` is kept only
/// when the last kept point has no line of sight to `path[i]`.
pub fn simplify_path(grid: &OccupancyGrid, path: &[Vec2]) -> Vec<Vec2> {
    if path.len() < 3 {
        return path.to_vec();
    }

    let mut simplified = vec![path[0]];
    for i in 2..path.len() {
        let last_kept = simplified[simplified.len() - 1];
        if !has_line_of_sight(grid, last_kept, path[i]) {
            simplified.push(path[i - 1]);
        }
    }
    simplified.push(path[path.len() - 1]);
    simplified
}

/// Bresenham raycast between the cells containing `a` and `b`; every cell
/// on the line, both ends included, must be walkable
pub fn has_line_of_sight(grid: &OccupancyGrid, a: Vec2, b: Vec2) -> bool {
    let from = grid.world_to_grid(a);
    let to = grid.world_to_grid(b);

    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);

    loop {
        if !grid.is_walkable(x, y) {
            return false;
        }
        if x == to.x && y == to.y {
            return true;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
