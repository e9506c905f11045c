//! Player talking to an NPC
//!
//! Talking stops the world's schedule: the day clock pauses and scripted
//! conversations are suspended until the player walks away. Agents already
//! walking keep walking.

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Millis, Vec2};
use crate::movement::movable::Movable;
use crate::office::Office;

/// An open player/NPC conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub agent: AgentId,
    pub started_at: Millis,
    /// Persona handed to whatever produces the NPC's replies
    pub member_kind: String,
    pub introduction: String,
}

impl Office {
    pub fn interaction(&self) -> Option<&Interaction> {
        self.interaction.as_ref()
    }

    /// First NPC within reach on the side the player is facing
    pub fn find_interaction_target(&self, player: Vec2, facing_left: bool) -> Option<AgentId> {
        let reach = self.config.interaction.distance;
        self.bodies
            .values()
            .filter(|body| body.is_active())
            .find(|body| {
                let pos = body.position();
                if pos.distance(&player) > reach {
                    return false;
                }
                if facing_left {
                    pos.x < player.x
                } else {
                    pos.x > player.x
                }
            })
            .map(|body| body.id)
    }

    /// Start talking to the NPC in front of the player, if any. Does
    /// nothing while another interaction is open.
    pub fn begin_interaction(&mut self, player: Vec2, facing_left: bool, now: Millis) -> Option<&Interaction> {
        if self.shut_down || self.interaction.is_some() {
            return None;
        }
        let agent = self.find_interaction_target(player, facing_left)?;
        let record = self.roster.get(agent)?;

        let interaction = Interaction {
            agent,
            started_at: now,
            member_kind: record.member_kind.clone(),
            introduction: record.introduction.clone(),
        };
        self.clock.pause();
        self.scheduler.suspend(now);
        tracing::info!("Player started talking to {}", agent);

        self.interaction = Some(interaction);
        self.interaction.as_ref()
    }

    /// Close the open interaction and let the schedule run again
    pub fn end_interaction(&mut self, now: Millis) -> Option<Interaction> {
        let interaction = self.interaction.take()?;
        self.clock.resume();
        self.scheduler.resume(now);
        tracing::info!(
            "Player finished talking to {} after {} ms",
            interaction.agent,
            now.saturating_sub(interaction.started_at)
        );
        Some(interaction)
    }
}
