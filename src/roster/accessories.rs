//! Items placed in front of working agents (laptops)
//!
//! Kept in a side table keyed by agent id instead of hanging off the body,
//! so removing an agent can never leave an item behind by accident.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Facing, Vec2};

const OFFSET_X: f32 = 43.0;
const OFFSET_Y: f32 = -25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessoryHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    pub handle: AccessoryHandle,
    pub position: Vec2,
    /// The item art faces left, so it is flipped for agents facing right
    pub flip_x: bool,
}

impl Accessory {
    /// Draw order follows the item's baseline
    pub fn depth(&self) -> f32 {
        self.position.y
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessoryTable {
    next_handle: u32,
    items: AHashMap<AgentId, Accessory>,
}

impl AccessoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an item in front of an agent, replacing any it already has
    pub fn place(&mut self, agent: AgentId, agent_position: Vec2, facing: Facing) -> AccessoryHandle {
        let dx = match facing {
            Facing::Left => -OFFSET_X,
            Facing::Right => OFFSET_X,
        };
        let handle = AccessoryHandle(self.next_handle);
        self.next_handle += 1;

        let accessory = Accessory {
            handle,
            position: Vec2::new(agent_position.x + dx, agent_position.y + OFFSET_Y),
            flip_x: facing == Facing::Right,
        };
        if self.items.insert(agent, accessory).is_some() {
            tracing::debug!("Replaced accessory of {}", agent);
        }
        handle
    }

    pub fn remove(&mut self, agent: AgentId) -> Option<Accessory> {
        self.items.remove(&agent)
    }

    pub fn get(&self, agent: AgentId) -> Option<&Accessory> {
        self.items.get(&agent)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
