//! The office: everything that happens on the floor in one frame
//!
//! `Office` owns the grid, the roster and every per-agent controller and
//! body, plus the conversation scheduler and the day clock. The host calls
//! [`Office::update`] once per frame with its wall-clock time. Each update
//! runs in a fixed order:
//!
//! 1. the day clock advances, spawning arrivals and picking departures
//! 2. agents move; those reaching their desk start working
//! 3. the scheduler releases dialogue for teams that are all present
//!
//! so an agent that sits down this frame can already take part in a
//! conversation released in the same frame.

pub mod interaction;
pub mod scene;
pub mod wander;

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::calendar::DayClock;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, GroupId, Millis, Vec2};
use crate::dialogue::scheduler::{ConversationScheduler, DialogueEvent};
use crate::dialogue::script::TeamScript;
use crate::movement::controller::{MovementController, Step};
use crate::movement::movable::{AgentBody, Animation, Movable};
use crate::roster::accessories::{Accessory, AccessoryTable};
use crate::roster::seating::{assign_seats, TeamDefinition, DEFAULT_SPRITE_KEYS};
use crate::roster::{LifecycleState, Roster};
use crate::spatial::grid::OccupancyGrid;

pub use interaction::Interaction;
pub use scene::SceneLayout;
pub use wander::{WanderEvent, Wanderers};

/// Salt so the scheduler's cooldown draws do not mirror the office RNG
const SCHEDULER_SEED_SALT: u64 = 0x5eed_d1a1;

/// What a finished walk was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Errand {
    ReachDesk(AgentId),
    ReachExit(AgentId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    HourChanged {
        hour: u32,
        label: String,
    },
    NightChanged {
        is_night: bool,
    },
    AgentSpawned {
        agent: AgentId,
        position: Vec2,
    },
    AgentArrived {
        agent: AgentId,
        group: GroupId,
    },
    AccessoryPlaced {
        agent: AgentId,
        accessory: Accessory,
    },
    AccessoryRemoved {
        agent: AgentId,
    },
    AgentLeaving {
        agent: AgentId,
    },
    AgentRemoved {
        agent: AgentId,
    },
    RosterReset,
    ConversationStarted {
        group: GroupId,
    },
    SpeechBubble {
        agent: AgentId,
        text: String,
        duration_ms: u64,
    },
    ConversationFinished {
        group: GroupId,
    },
}

pub struct Office {
    config: SimulationConfig,
    grid: OccupancyGrid,
    roster: Roster,
    bodies: BTreeMap<AgentId, AgentBody>,
    controllers: BTreeMap<AgentId, MovementController<Errand>>,
    scheduler: ConversationScheduler,
    clock: DayClock,
    accessories: AccessoryTable,
    rng: ChaCha8Rng,
    last_update: Option<Millis>,
    was_night: bool,
    interaction: Option<Interaction>,
    shut_down: bool,
}

impl Office {
    pub fn new(
        config: SimulationConfig,
        scene: &SceneLayout,
        teams: &[TeamDefinition],
        scripts: Vec<TeamScript>,
    ) -> Result<Self> {
        config.validate()?;

        let width = scene.width.unwrap_or(config.world.width);
        let height = scene.height.unwrap_or(config.world.height);
        let mut grid = OccupancyGrid::new(width, height, config.world.cell_size)?;
        let obstacles = scene.obstacles();
        let marked = grid.mark_obstacles(&obstacles);
        tracing::info!(
            "Office grid {}x{} with {} obstacles ({} cells blocked)",
            grid.width(),
            grid.height(),
            obstacles.len(),
            marked
        );

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let palette: Vec<String> = DEFAULT_SPRITE_KEYS.iter().map(|k| k.to_string()).collect();
        let roster = Roster::new(assign_seats(&scene.desk_bounds(), teams, &palette, &mut rng));

        let scheduler = ConversationScheduler::new(config.dialogue.clone(), config.seed ^ SCHEDULER_SEED_SALT)
            .with_scripts(scripts);
        let clock = DayClock::new(config.schedule.start_hour, config.schedule.ms_per_game_minute);
        let was_night = clock.is_night();

        Ok(Self {
            config,
            grid,
            roster,
            bodies: BTreeMap::new(),
            controllers: BTreeMap::new(),
            scheduler,
            clock,
            accessories: AccessoryTable::new(),
            rng,
            last_update: None,
            was_night,
            interaction: None,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn clock(&self) -> &DayClock {
        &self.clock
    }

    pub fn accessories(&self) -> &AccessoryTable {
        &self.accessories
    }

    pub fn scheduler(&self) -> &ConversationScheduler {
        &self.scheduler
    }

    pub fn body(&self, agent: AgentId) -> Option<&AgentBody> {
        self.bodies.get(&agent)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &AgentBody> {
        self.bodies.values()
    }

    pub fn is_moving(&self, agent: AgentId) -> bool {
        self.controllers.get(&agent).is_some_and(|c| c.is_moving())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Advance the office to host time `now`
    pub fn update(&mut self, now: Millis) -> Vec<SimEvent> {
        if self.shut_down {
            return Vec::new();
        }
        let dt = now.saturating_sub(self.last_update.unwrap_or(now));
        self.last_update = Some(now);
        let mut events = Vec::new();

        self.advance_clock(dt, now, &mut events);
        self.move_agents(dt, now, &mut events);

        for event in self.scheduler.tick(&self.roster, now) {
            events.push(match event {
                DialogueEvent::RoundStarted { group } => SimEvent::ConversationStarted { group },
                DialogueEvent::LineReady {
                    speaker,
                    text,
                    duration_ms,
                    ..
                } => SimEvent::SpeechBubble {
                    agent: speaker,
                    text,
                    duration_ms,
                },
                DialogueEvent::RoundComplete { group } => SimEvent::ConversationFinished { group },
            });
        }

        events
    }

    fn advance_clock(&mut self, dt: Millis, now: Millis, events: &mut Vec<SimEvent>) {
        let per_minute = self.config.schedule.ms_per_game_minute.max(1);
        let mut remaining = dt;
        // Feed at most one minute at a time so every minute gets its checks
        while remaining > 0 {
            let step = remaining.min(per_minute);
            remaining -= step;
            if self.clock.advance(step) > 0 {
                self.on_minute(now, events);
            }
        }
    }

    fn on_minute(&mut self, now: Millis, events: &mut Vec<SimEvent>) {
        if self.clock.minutes() == 0 {
            events.push(SimEvent::HourChanged {
                hour: self.clock.hours(),
                label: self.clock.label(),
            });
        }
        let is_night = self.clock.is_night();
        if is_night != self.was_night {
            self.was_night = is_night;
            events.push(SimEvent::NightChanged { is_night });
        }

        let schedule = &self.config.schedule;
        let (arrive_start, arrive_end) = (schedule.arrival_start_hour, schedule.arrival_end_hour);
        let (depart_start, depart_end) = (schedule.departure_start_hour, schedule.departure_end_hour);

        if self.clock.in_window(arrive_start, arrive_end) {
            self.spawn_arrivals(arrive_start, arrive_end, now, events);
        }
        if self.clock.in_window(depart_start, depart_end) {
            self.pick_departures(depart_end, now, events);
        }
    }

    /// Spawn enough agents to keep up with the arrival curve
    fn spawn_arrivals(&mut self, start_hour: u32, end_hour: u32, now: Millis, events: &mut Vec<SimEvent>) {
        let inactive = self.roster.count_in(LifecycleState::Inactive);
        if inactive == 0 {
            return;
        }
        let window_minutes = end_hour.saturating_sub(start_hour) * 60;
        let into_window = self.clock.minute_of_day().saturating_sub(start_hour * 60);
        let progress = DayClock::arrival_progress(into_window, window_minutes);

        let total = self.roster.len();
        let target = (progress * total as f32).ceil() as usize;
        let arrived = total - inactive;
        let deficit = target.saturating_sub(arrived).min(inactive);
        for _ in 0..deficit {
            self.spawn_one(now, events);
        }
    }

    /// Each Working agent leaves with probability 1 / minutes left in the
    /// window, so by the end of it everybody has gone
    fn pick_departures(&mut self, end_hour: u32, now: Millis, events: &mut Vec<SimEvent>) {
        let working = self.roster.in_state(LifecycleState::Working);
        if working.is_empty() {
            return;
        }
        let remaining = self.clock.minutes_until(end_hour).max(1);
        let probability = 1.0 / remaining as f64;
        for agent in working {
            if self.rng.gen_bool(probability) {
                self.send_home(agent, now, events);
            }
        }
    }

    fn spawn_one(&mut self, now: Millis, events: &mut Vec<SimEvent>) {
        let inactive = self.roster.in_state(LifecycleState::Inactive);
        let Some(&agent) = inactive.choose(&mut self.rng) else {
            return;
        };
        if let Err(err) = self.roster.begin_arrival(agent) {
            tracing::warn!("Cannot spawn {}: {}", agent, err);
            return;
        }
        let Some(record) = self.roster.get(agent) else {
            return;
        };
        let entry = self.config.world.entry_point;
        let desk = record.desk_position;
        let mut body = AgentBody::new(agent, record.sprite_key.clone(), entry);
        let mut controller = MovementController::from_config(&self.config.movement, &self.config.pathfinding);

        tracing::debug!("{} spawned, heading to desk at {:?}", agent, desk);
        events.push(SimEvent::AgentSpawned { agent, position: entry });

        let step = controller.move_to(&mut body, desk, &self.grid, &mut self.rng, Some(Errand::ReachDesk(agent)));
        self.bodies.insert(agent, body);
        self.controllers.insert(agent, controller);
        if let Step::Arrived(Some(errand)) = step {
            self.complete_errand(errand, now, events);
        }
    }

    fn move_agents(&mut self, dt: Millis, now: Millis, events: &mut Vec<SimEvent>) {
        let dt_secs = dt as f32 / 1000.0;
        let mut finished = Vec::new();
        for (agent, controller) in self.controllers.iter_mut() {
            let Some(body) = self.bodies.get_mut(agent) else {
                continue;
            };
            if let Step::Arrived(Some(errand)) = controller.tick(body, dt_secs) {
                finished.push(errand);
            }
        }
        for errand in finished {
            self.complete_errand(errand, now, events);
        }
    }

    fn complete_errand(&mut self, errand: Errand, now: Millis, events: &mut Vec<SimEvent>) {
        match errand {
            Errand::ReachDesk(agent) => self.sit_down(agent, now, events),
            Errand::ReachExit(agent) => self.cleanup(agent, events),
        }
    }

    fn sit_down(&mut self, agent: AgentId, now: Millis, events: &mut Vec<SimEvent>) {
        if let Err(err) = self.roster.commit_arrival(agent) {
            tracing::warn!("{} reached a desk but cannot start working: {}", agent, err);
            return;
        }
        let Some(record) = self.roster.get(agent) else {
            return;
        };
        let (group, facing) = (record.group_id, record.facing);

        if let Some(body) = self.bodies.get_mut(&agent) {
            body.play_animation(Animation::Idle);
            body.set_flip_x(facing.flip_x());
            self.accessories.place(agent, body.position(), facing);
            if let Some(accessory) = self.accessories.get(agent) {
                events.push(SimEvent::AccessoryPlaced {
                    agent,
                    accessory: *accessory,
                });
            }
        }

        tracing::info!("{} arrived at desk ({})", agent, group);
        events.push(SimEvent::AgentArrived { agent, group });
        self.scheduler.try_start(group, &self.roster, now);
    }

    /// Send one Working agent to the exit. Agents in any other state are
    /// left alone.
    pub fn send_home(&mut self, agent: AgentId, now: Millis, events: &mut Vec<SimEvent>) {
        if self.roster.lifecycle(agent).ok() != Some(LifecycleState::Working) {
            return;
        }
        if let Err(err) = self.roster.begin_departure(agent) {
            tracing::warn!("{} cannot leave: {}", agent, err);
            return;
        }
        if self.accessories.remove(agent).is_some() {
            events.push(SimEvent::AccessoryRemoved { agent });
        }
        events.push(SimEvent::AgentLeaving { agent });

        let exit = self.config.world.exit_point;
        let step = match (self.controllers.get_mut(&agent), self.bodies.get_mut(&agent)) {
            (Some(controller), Some(body)) if !controller.is_destroyed() => controller.move_to(
                body,
                exit,
                &self.grid,
                &mut self.rng,
                Some(Errand::ReachExit(agent)),
            ),
            _ => Step::Arrived(Some(Errand::ReachExit(agent))),
        };
        if let Step::Arrived(Some(errand)) = step {
            self.complete_errand(errand, now, events);
        }
    }

    /// Everybody at work goes home now. With nobody in the office at all
    /// the roster is hard-reset instead.
    pub fn dismiss_all(&mut self, now: Millis) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.shut_down {
            return events;
        }
        let working = self.roster.in_state(LifecycleState::Working);
        let arriving = self.roster.count_in(LifecycleState::Arriving);
        if working.is_empty() && arriving == 0 {
            self.hard_reset(&mut events);
            return events;
        }

        tracing::info!("Dismissing {} agents", working.len());
        for agent in working {
            self.send_home(agent, now, &mut events);
        }
        events
    }

    fn cleanup(&mut self, agent: AgentId, events: &mut Vec<SimEvent>) {
        if let Err(err) = self.roster.commit_departure(agent) {
            tracing::warn!("Cleaning up {} out of order: {}", agent, err);
        }
        if self.accessories.remove(agent).is_some() {
            events.push(SimEvent::AccessoryRemoved { agent });
        }
        if let Some(mut controller) = self.controllers.remove(&agent) {
            controller.destroy();
        }
        if self.bodies.remove(&agent).is_some() {
            events.push(SimEvent::AgentRemoved { agent });
        }

        if !self.roster.any_active() {
            tracing::info!("Everybody has left, office reset for a new day");
            for controller in self.controllers.values_mut() {
                controller.destroy();
            }
            self.controllers.clear();
        }
    }

    fn hard_reset(&mut self, events: &mut Vec<SimEvent>) {
        tracing::info!("Hard reset: every agent back to inactive");
        self.roster.reset_all();
        for controller in self.controllers.values_mut() {
            controller.destroy();
        }
        self.controllers.clear();
        self.bodies.clear();
        self.accessories.clear();
        events.push(SimEvent::RosterReset);
    }

    /// Tear everything down. The office ignores all calls afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let now = self.last_update.unwrap_or(0);
        self.end_interaction(now);
        for controller in self.controllers.values_mut() {
            controller.destroy();
        }
        self.controllers.clear();
        self.scheduler.destroy();
        self.shut_down = true;
        tracing::info!("Office shut down");
    }
}
