//! Decorative wanderers for the title screen
//!
//! Each wanderer walks to a random point of its region, idles for a while
//! and walks again, popping an emoji bubble every so often. They use the
//! same movement controller as office agents, just slower.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{PathfindingConfig, WanderConfig};
use crate::core::timer::TimerQueue;
use crate::core::types::{Millis, Rect, Vec2};
use crate::movement::controller::{MovementController, Step};
use crate::movement::movable::{Animation, Movable};
use crate::roster::seating::DEFAULT_SPRITE_KEYS;
use crate::spatial::grid::OccupancyGrid;

pub const EMOJIS: [&str; 4] = ["😊", "😂", "😭", "🥳"];

const SPAWN_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WanderBody {
    pub id: u32,
    pub sprite_key: String,
    position: Vec2,
    flip_x: bool,
    walking: bool,
}

impl WanderBody {
    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn is_walking(&self) -> bool {
        self.walking
    }
}

impl Movable for WanderBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn play_animation(&mut self, animation: Animation) {
        self.walking = animation == Animation::Walk;
    }

    fn set_flip_x(&mut self, flip: bool) {
        self.flip_x = flip;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WanderEvent {
    Bubble {
        wanderer: u32,
        emoji: String,
        duration_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WanderTimer {
    IdleOver(usize),
    Bubble(usize),
}

struct Wanderer {
    body: WanderBody,
    controller: MovementController<()>,
}

pub struct Wanderers {
    config: WanderConfig,
    region: Rect,
    wanderers: Vec<Wanderer>,
    timers: TimerQueue<WanderTimer>,
    rng: ChaCha8Rng,
    last_update: Option<Millis>,
}

impl Wanderers {
    /// Spawn `count` wanderers at walkable points of `region`
    pub fn new(
        count: usize,
        region: Rect,
        grid: &OccupancyGrid,
        config: WanderConfig,
        pathfinding: &PathfindingConfig,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let wanderers = (0..count)
            .map(|i| {
                let speed = rng.gen_range(config.min_speed..=config.max_speed.max(config.min_speed));
                let sprite_key = DEFAULT_SPRITE_KEYS
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(DEFAULT_SPRITE_KEYS[0]);
                let body = WanderBody {
                    id: i as u32,
                    sprite_key: sprite_key.to_string(),
                    position: grid.random_walkable_point(region, &mut rng, SPAWN_ATTEMPTS),
                    flip_x: rng.gen_bool(0.5),
                    walking: false,
                };
                Wanderer {
                    body,
                    controller: MovementController::new(speed)
                        .with_suboptimal_chance(pathfinding.suboptimal_chance),
                }
            })
            .collect();

        tracing::debug!("Spawned {} wanderers", count);
        Self {
            config,
            region,
            wanderers,
            timers: TimerQueue::new(),
            rng,
            last_update: None,
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = &WanderBody> {
        self.wanderers.iter().map(|w| &w.body)
    }

    pub fn len(&self) -> usize {
        self.wanderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wanderers.is_empty()
    }

    pub fn update(&mut self, now: Millis, grid: &OccupancyGrid) -> Vec<WanderEvent> {
        let mut events = Vec::new();

        let Some(last) = self.last_update else {
            // First frame: everybody sets off and gets a bubble timer
            self.last_update = Some(now);
            for index in 0..self.wanderers.len() {
                self.set_off(index, grid);
                self.schedule_bubble(index, now);
            }
            return events;
        };
        self.last_update = Some(now);
        let dt = now.saturating_sub(last) as f32 / 1000.0;

        for index in 0..self.wanderers.len() {
            let wanderer = &mut self.wanderers[index];
            if wanderer.controller.tick(&mut wanderer.body, dt).is_arrived() {
                self.schedule_idle(index, now);
            }
        }

        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                WanderTimer::IdleOver(index) => self.set_off(index, grid),
                WanderTimer::Bubble(index) => {
                    let emoji = EMOJIS.choose(&mut self.rng).copied().unwrap_or(EMOJIS[0]);
                    events.push(WanderEvent::Bubble {
                        wanderer: index as u32,
                        emoji: emoji.to_string(),
                        duration_ms: self.config.bubble_duration_ms,
                    });
                    self.schedule_bubble(index, now);
                }
            }
        }

        events
    }

    fn set_off(&mut self, index: usize, grid: &OccupancyGrid) {
        let target = grid.random_walkable_point(self.region, &mut self.rng, SPAWN_ATTEMPTS);
        let Some(wanderer) = self.wanderers.get_mut(index) else {
            return;
        };
        let step = wanderer
            .controller
            .move_to(&mut wanderer.body, target, grid, &mut self.rng, Some(()));
        if let Step::Arrived(_) = step {
            // Nowhere to go right now; try again after a rest
            let now = self.last_update.unwrap_or(0);
            self.schedule_idle(index, now);
        }
    }

    fn schedule_idle(&mut self, index: usize, now: Millis) {
        let (min, max) = (self.config.min_idle_ms, self.config.max_idle_ms);
        let idle = self.rng.gen_range(min..=max.max(min));
        self.timers.schedule(now + idle, WanderTimer::IdleOver(index));
    }

    fn schedule_bubble(&mut self, index: usize, now: Millis) {
        let (min, max) = (self.config.min_bubble_interval_ms, self.config.max_bubble_interval_ms);
        let delay = self.rng.gen_range(min..=max.max(min));
        self.timers.schedule(now + delay, WanderTimer::Bubble(index));
    }
}
