//! Bodies the movement controller can drive
//!
//! The controller never owns the thing it moves. It reads and writes the
//! position, switches between walk and idle animations, and flips the sprite
//! to face the direction of travel. Anything implementing [`Movable`] can be
//! walked around: office NPCs, title-screen wanderers, test doubles.

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    Walk,
    Idle,
}

impl Animation {
    /// Animation key for a sprite sheet, e.g. `worker2_walk`
    pub fn key(self, sprite_key: &str) -> String {
        match self {
            Animation::Walk => format!("{sprite_key}_walk"),
            Animation::Idle => format!("{sprite_key}_idle"),
        }
    }
}

pub trait Movable {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn play_animation(&mut self, animation: Animation);
    fn set_flip_x(&mut self, flip: bool);

    /// Inactive bodies are never moved or animated
    fn is_active(&self) -> bool {
        true
    }
}

/// Visual state of an office NPC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBody {
    pub id: AgentId,
    pub sprite_key: String,
    position: Vec2,
    flip_x: bool,
    animation: Option<Animation>,
    animation_changes: u32,
    active: bool,
}

impl AgentBody {
    pub fn new(id: AgentId, sprite_key: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            sprite_key: sprite_key.into(),
            position,
            flip_x: false,
            animation: None,
            animation_changes: 0,
            active: true,
        }
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn animation(&self) -> Option<Animation> {
        self.animation
    }

    /// Key of the animation currently playing, if any
    pub fn animation_key(&self) -> Option<String> {
        self.animation.map(|a| a.key(&self.sprite_key))
    }

    /// Number of times a different animation was started
    pub fn animation_changes(&self) -> u32 {
        self.animation_changes
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Movable for AgentBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        if self.active {
            self.position = position;
        }
    }

    fn play_animation(&mut self, animation: Animation) {
        // Replaying the running animation would restart it from frame 0
        if self.active && self.animation != Some(animation) {
            self.animation = Some(animation);
            self.animation_changes += 1;
        }
    }

    fn set_flip_x(&mut self, flip: bool) {
        if self.active {
            self.flip_x = flip;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_animation_not_restarted() {
        let mut body = AgentBody::new(AgentId(1), "worker1", Vec2::ZERO);
        body.play_animation(Animation::Walk);
        body.play_animation(Animation::Walk);
        body.play_animation(Animation::Idle);

        assert_eq!(body.animation_changes(), 2);
        assert_eq!(body.animation_key().as_deref(), Some("worker1_idle"));
    }

    #[test]
    fn test_inactive_body_ignores_updates() {
        let mut body = AgentBody::new(AgentId(1), "worker1", Vec2::new(3.0, 4.0));
        body.deactivate();
        body.set_position(Vec2::new(10.0, 10.0));
        body.set_flip_x(true);
        body.play_animation(Animation::Walk);

        assert_eq!(body.position(), Vec2::new(3.0, 4.0));
        assert!(!body.flip_x());
        assert_eq!(body.animation(), None);
    }
}
