//! Agent roster
//!
//! One record per seated team member. The roster is the only place that
//! changes an agent's lifecycle, and it only allows the transitions of the
//! daily cycle:
//!
//! ```text
//! Inactive -> Arriving -> Working -> Leaving -> Inactive
//! ```
//!
//! `reset_all` is the one exception and sends everybody back to `Inactive`.

pub mod accessories;
pub mod seating;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, Facing, GroupId, MemberId, Vec2};

pub use accessories::{Accessory, AccessoryHandle, AccessoryTable};
pub use seating::{assign_seats, desk_seats, MemberDefinition, Seat, TeamDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Inactive,
    Arriving,
    Working,
    Leaving,
}

impl LifecycleState {
    /// Present in the office in any form
    pub fn is_active(self) -> bool {
        !matches!(self, LifecycleState::Inactive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub member_kind: String,
    pub introduction: String,
    pub sprite_key: String,
    pub desk_position: Vec2,
    pub facing: Facing,
    lifecycle: LifecycleState,
}

impl AgentRecord {
    pub fn new(
        id: AgentId,
        group_id: GroupId,
        member: &MemberDefinition,
        sprite_key: impl Into<String>,
        seat: Seat,
    ) -> Self {
        Self {
            id,
            group_id,
            member_id: member.id.clone(),
            member_kind: member.kind.clone(),
            introduction: member.introduction.clone(),
            sprite_key: sprite_key.into(),
            desk_position: seat.position,
            facing: seat.facing,
            lifecycle: LifecycleState::Inactive,
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }
}

/// All agents of the office, indexed by id
#[derive(Debug, Clone, Default)]
pub struct Roster {
    agents: Vec<AgentRecord>,
}

impl Roster {
    /// Records are renumbered so that ids match their position
    pub fn new(mut agents: Vec<AgentRecord>) -> Self {
        for (i, agent) in agents.iter_mut().enumerate() {
            agent.id = AgentId(i as u32);
            agent.lifecycle = LifecycleState::Inactive;
        }
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentRecord> {
        self.agents.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.iter()
    }

    pub fn lifecycle(&self, id: AgentId) -> Result<LifecycleState> {
        self.get(id)
            .map(AgentRecord::lifecycle)
            .ok_or(SimError::AgentNotFound(id))
    }

    pub fn begin_arrival(&mut self, id: AgentId) -> Result<()> {
        self.transition(id, LifecycleState::Inactive, LifecycleState::Arriving)
    }

    pub fn commit_arrival(&mut self, id: AgentId) -> Result<()> {
        self.transition(id, LifecycleState::Arriving, LifecycleState::Working)
    }

    pub fn begin_departure(&mut self, id: AgentId) -> Result<()> {
        self.transition(id, LifecycleState::Working, LifecycleState::Leaving)
    }

    pub fn commit_departure(&mut self, id: AgentId) -> Result<()> {
        self.transition(id, LifecycleState::Leaving, LifecycleState::Inactive)
    }

    /// Hard reset: everybody goes home at once
    pub fn reset_all(&mut self) {
        for agent in &mut self.agents {
            agent.lifecycle = LifecycleState::Inactive;
        }
    }

    fn transition(&mut self, id: AgentId, from: LifecycleState, to: LifecycleState) -> Result<()> {
        let agent = self
            .agents
            .get_mut(id.0 as usize)
            .ok_or(SimError::AgentNotFound(id))?;
        if agent.lifecycle != from {
            return Err(SimError::IllegalTransition {
                agent: id,
                from: agent.lifecycle,
                to,
            });
        }
        agent.lifecycle = to;
        Ok(())
    }

    pub fn members_of(&self, group: GroupId) -> impl Iterator<Item = &AgentRecord> {
        self.agents.iter().filter(move |a| a.group_id == group)
    }

    pub fn in_state(&self, state: LifecycleState) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|a| a.lifecycle == state)
            .map(|a| a.id)
            .collect()
    }

    pub fn count_in(&self, state: LifecycleState) -> usize {
        self.agents.iter().filter(|a| a.lifecycle == state).count()
    }

    pub fn any_active(&self) -> bool {
        self.agents.iter().any(|a| a.lifecycle.is_active())
    }

    /// True if the group has members and all of them are Working
    pub fn all_working(&self, group: GroupId) -> bool {
        let mut members = self.members_of(group).peekable();
        members.peek().is_some() && members.all(|a| a.lifecycle == LifecycleState::Working)
    }

    /// The Working agent of `group` that plays `member`
    pub fn working_member(&self, group: GroupId, member: &MemberId) -> Option<&AgentRecord> {
        self.members_of(group)
            .find(|a| &a.member_id == member && a.lifecycle == LifecycleState::Working)
    }

    /// Distinct groups, in order of first appearance
    pub fn groups(&self) -> Vec<GroupId> {
        let mut groups = Vec::new();
        for agent in &self.agents {
            if !groups.contains(&agent.group_id) {
                groups.push(agent.group_id);
            }
        }
        groups
    }
}
