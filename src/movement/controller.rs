//! Per-agent movement state machine
//!
//! `Idle -> Moving -> Idle`, or `Destroyed` from anywhere. A move request
//! plans a route, splits it into axis-aligned segments and then walks them
//! one `tick` at a time at a constant speed. Time left over when a segment
//! ends is spent on the next one, so the total walking time does not depend
//! on the frame rate.

use rand::Rng;

use crate::core::config::{MovementConfig, PathfindingConfig};
use crate::core::types::Vec2;
use crate::movement::movable::{Animation, Movable};
use crate::navigation::pathfinding::{find_path, PathRequest};
use crate::navigation::segments::{decompose_path, MovementSegment};
use crate::spatial::grid::OccupancyGrid;

pub const DEFAULT_SPEED: f32 = 120.0;
pub const DEFAULT_MIN_SEGMENT_LENGTH: f32 = 1.0;

const TIME_EPSILON: f32 = 1e-6;

/// Outcome of a controller call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<C> {
    /// Nothing to do
    Idle,
    /// Still walking
    Moving,
    /// Destination reached (or unreachable); carries the completion token
    /// handed to `move_to`, exactly once
    Arrived(Option<C>),
}

impl<C> Step<C> {
    pub fn is_arrived(&self) -> bool {
        matches!(self, Step::Arrived(_))
    }
}

/// Drives one [`Movable`] along planned routes
///
/// `C` is whatever the owner wants back when the move finishes.
#[derive(Debug, Clone)]
pub struct MovementController<C> {
    speed: f32,
    min_segment_length: f32,
    suboptimal_chance: f64,
    obstacle_penalty: u32,
    segments: Vec<MovementSegment>,
    index: usize,
    segment_origin: Option<Vec2>,
    segment_elapsed: f32,
    is_moving: bool,
    destroyed: bool,
    on_complete: Option<C>,
}

impl<C> MovementController<C> {
    pub fn new(speed: f32) -> Self {
        Self {
            speed: speed.max(f32::EPSILON),
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            suboptimal_chance: crate::navigation::pathfinding::DEFAULT_SUBOPTIMAL_CHANCE,
            obstacle_penalty: crate::navigation::pathfinding::DEFAULT_OBSTACLE_PENALTY,
            segments: Vec::new(),
            index: 0,
            segment_origin: None,
            segment_elapsed: 0.0,
            is_moving: false,
            destroyed: false,
            on_complete: None,
        }
    }

    pub fn from_config(movement: &MovementConfig, pathfinding: &PathfindingConfig) -> Self {
        let mut controller = Self::new(movement.speed);
        controller.min_segment_length = movement.min_segment_length;
        controller.suboptimal_chance = pathfinding.suboptimal_chance;
        controller.obstacle_penalty = pathfinding.obstacle_penalty;
        controller
    }

    pub fn with_suboptimal_chance(mut self, chance: f64) -> Self {
        self.suboptimal_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn segments(&self) -> &[MovementSegment] {
        &self.segments
    }

    /// Plan a route to `target` and start walking it
    ///
    /// Any move in progress is stopped first. If no route exists or it has
    /// nothing to walk, `on_complete` comes straight back in
    /// `Step::Arrived` and the body is left where it is.
    pub fn move_to<B: Movable, R: Rng>(
        &mut self,
        body: &mut B,
        target: Vec2,
        grid: &OccupancyGrid,
        rng: &mut R,
        on_complete: Option<C>,
    ) -> Step<C> {
        if self.destroyed || !body.is_active() {
            return Step::Arrived(on_complete);
        }

        self.force_stop(body);
        self.on_complete = on_complete;

        let request = PathRequest::new(body.position(), target)
            .with_suboptimal_chance(self.suboptimal_chance)
            .with_obstacle_penalty(self.obstacle_penalty);
        let path = find_path(grid, &request, rng);
        if path.is_empty() {
            tracing::warn!("No route from {:?} to {:?}", body.position(), target);
            return self.finish(body);
        }

        self.segments = decompose_path(body.position(), path.waypoints(), grid);
        self.index = 0;
        if self.segments.is_empty() {
            tracing::debug!("Route to {:?} has nothing to walk", target);
            return self.finish(body);
        }

        self.is_moving = true;
        if self.begin_next_segment(body) {
            Step::Moving
        } else {
            self.finish(body)
        }
    }

    /// Advance along the route by `dt` seconds
    pub fn tick<B: Movable>(&mut self, body: &mut B, dt: f32) -> Step<C> {
        if self.destroyed || !self.is_moving {
            return Step::Idle;
        }
        if !body.is_active() {
            self.force_stop(body);
            return Step::Idle;
        }

        let mut remaining = dt.max(0.0);
        loop {
            let Some(origin) = self.segment_origin else {
                return self.finish(body);
            };
            let to = self.segments[self.index].to;
            let duration = origin.distance(&to) / self.speed;
            let time_left = duration - self.segment_elapsed;

            if remaining + TIME_EPSILON < time_left {
                self.segment_elapsed += remaining;
                body.set_position(origin.lerp(&to, self.segment_elapsed / duration));
                return Step::Moving;
            }

            remaining -= time_left.max(0.0);
            body.set_position(to);
            self.index += 1;
            if !self.begin_next_segment(body) {
                return self.finish(body);
            }
        }
    }

    /// Stop where the body stands. A pending completion is dropped, not
    /// returned.
    pub fn force_stop<B: Movable>(&mut self, body: &mut B) {
        if self.destroyed {
            return;
        }
        if self.is_moving {
            self.is_moving = false;
            if body.is_active() {
                body.play_animation(Animation::Idle);
            }
        }
        self.clear_route();
        self.on_complete = None;
    }

    /// Make the controller permanently inert
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.is_moving = false;
        self.clear_route();
        self.on_complete = None;
    }

    /// Seconds of walking left on the current route
    pub fn planned_duration(&self) -> f32 {
        if !self.is_moving {
            return 0.0;
        }
        let mut total = 0.0;
        for (i, segment) in self.segments.iter().enumerate().skip(self.index) {
            if i == self.index {
                if let Some(origin) = self.segment_origin {
                    total += origin.distance(&segment.to) / self.speed - self.segment_elapsed;
                    continue;
                }
            }
            total += segment.length() / self.speed;
        }
        total.max(0.0)
    }

    /// Skip segments too short to animate and start the next real one.
    /// Returns false when the route is used up.
    fn begin_next_segment<B: Movable>(&mut self, body: &mut B) -> bool {
        let position = body.position();
        while self.index < self.segments.len()
            && position.distance(&self.segments[self.index].to) < self.min_segment_length
        {
            self.index += 1;
        }
        if self.index >= self.segments.len() {
            self.segment_origin = None;
            return false;
        }

        let to = self.segments[self.index].to;
        body.play_animation(Animation::Walk);
        if to.x != position.x {
            body.set_flip_x(to.x < position.x);
        }
        self.segment_origin = Some(position);
        self.segment_elapsed = 0.0;
        true
    }

    fn finish<B: Movable>(&mut self, body: &mut B) -> Step<C> {
        self.is_moving = false;
        self.clear_route();
        if body.is_active() {
            body.play_animation(Animation::Idle);
        }
        Step::Arrived(self.on_complete.take())
    }

    fn clear_route(&mut self) {
        self.segments.clear();
        self.index = 0;
        self.segment_origin = None;
        self.segment_elapsed = 0.0;
    }
}
