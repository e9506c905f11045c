//! Team conversation scheduler
//!
//! Each group is either Idle or Active. A round starts only when every
//! member of the group is Working. While Active, lines are released against
//! a simulated reader: the next line goes out once
//! `(now - anchor) / 1000 * chars_per_second` reaches its cumulative offset
//! and the previous line has finished showing. Long lines are shown in
//! chunks, each one held on screen for a duration that grows with its
//! length. After the last chunk the group goes back to Idle and a cooldown
//! timer tries to start the next round.
//!
//! The scheduler never draws anything. `tick` returns [`DialogueEvent`]s and
//! the host turns `LineReady` into speech bubbles.

use std::collections::BTreeMap;

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::DialogueConfig;
use crate::core::timer::{TimerId, TimerQueue};
use crate::core::types::{AgentId, GroupId, MemberId, Millis};
use crate::dialogue::script::{chunk_duration_ms, chunk_text, Script, TeamScript};
use crate::roster::{LifecycleState, Roster};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogueEvent {
    RoundStarted {
        group: GroupId,
    },
    LineReady {
        group: GroupId,
        speaker: AgentId,
        member: MemberId,
        text: String,
        duration_ms: u64,
        line_index: usize,
        chunk_index: usize,
    },
    RoundComplete {
        group: GroupId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerTimer {
    /// The chunk on screen has run its course
    ChunkElapsed(GroupId),
    /// Cooldown after a round is over
    Cooldown(GroupId),
}

/// A line currently on screen
#[derive(Debug, Clone)]
struct ShowingLine {
    speaker: AgentId,
    member: MemberId,
    chunks: Vec<String>,
    timer: TimerId,
}

#[derive(Debug, Clone)]
struct ConversationState {
    line_index: usize,
    chunk_index: usize,
    anchor: Millis,
    showing: Option<ShowingLine>,
}

pub struct ConversationScheduler {
    config: DialogueConfig,
    scripts: AHashMap<GroupId, Script>,
    active: BTreeMap<GroupId, ConversationState>,
    timers: TimerQueue<SchedulerTimer>,
    cooldowns: AHashMap<GroupId, TimerId>,
    pending: Vec<DialogueEvent>,
    suspended_at: Option<Millis>,
    destroyed: bool,
    rng: ChaCha8Rng,
}

impl ConversationScheduler {
    pub fn new(config: DialogueConfig, seed: u64) -> Self {
        Self {
            config,
            scripts: AHashMap::new(),
            active: BTreeMap::new(),
            timers: TimerQueue::new(),
            cooldowns: AHashMap::new(),
            pending: Vec::new(),
            suspended_at: None,
            destroyed: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_scripts(mut self, scripts: Vec<TeamScript>) -> Self {
        for script in scripts {
            self.set_script(script.team_id, Script::new(script.conversation));
        }
        self
    }

    pub fn set_script(&mut self, group: GroupId, script: Script) {
        if self.destroyed {
            return;
        }
        self.scripts.insert(group, script);
    }

    pub fn is_active(&self, group: GroupId) -> bool {
        self.active.contains_key(&group)
    }

    pub fn active_groups(&self) -> Vec<GroupId> {
        self.active.keys().copied().collect()
    }

    pub fn has_cooldown(&self, group: GroupId) -> bool {
        self.cooldowns.contains_key(&group)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Start a round for `group` if it is idle, has a script and all of its
    /// members are Working. Returns whether a round started.
    pub fn try_start(&mut self, group: GroupId, roster: &Roster, now: Millis) -> bool {
        if self.destroyed || self.active.contains_key(&group) {
            return false;
        }
        let has_lines = self.scripts.get(&group).is_some_and(|s| !s.is_empty());
        if !has_lines || !roster.all_working(group) {
            return false;
        }

        if let Some(cooldown) = self.cooldowns.remove(&group) {
            self.timers.cancel(cooldown);
        }

        // A round that starts while suspended begins counting at resume
        let anchor = self.suspended_at.unwrap_or(now);
        self.active.insert(
            group,
            ConversationState {
                line_index: 0,
                chunk_index: 0,
                anchor,
                showing: None,
            },
        );
        tracing::info!("{} all present, starting conversation", group);
        self.pending.push(DialogueEvent::RoundStarted { group });
        true
    }

    /// Fire due timers, then release every line whose time has come
    pub fn tick(&mut self, roster: &Roster, now: Millis) -> Vec<DialogueEvent> {
        if self.destroyed || self.suspended_at.is_some() {
            return Vec::new();
        }
        let mut events = std::mem::take(&mut self.pending);

        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                SchedulerTimer::ChunkElapsed(group) => {
                    self.advance_chunk(group, roster, now, &mut events);
                }
                SchedulerTimer::Cooldown(group) => {
                    self.cooldowns.remove(&group);
                    if self.try_start(group, roster, now) {
                        events.append(&mut self.pending);
                    }
                }
            }
        }

        let ready: Vec<GroupId> = self
            .active
            .iter()
            .filter(|(_, state)| state.showing.is_none())
            .map(|(group, _)| *group)
            .collect();
        for group in ready {
            self.release_lines(group, roster, now, &mut events);
        }

        events
    }

    /// Freeze playback; nothing fires until `resume`
    pub fn suspend(&mut self, now: Millis) {
        if self.destroyed || self.suspended_at.is_some() {
            return;
        }
        tracing::debug!("Conversations suspended at {}", now);
        self.suspended_at = Some(now);
    }

    /// Continue playback, shifting anchors and timers by the time spent
    /// suspended
    pub fn resume(&mut self, now: Millis) {
        if self.destroyed {
            return;
        }
        let Some(since) = self.suspended_at.take() else {
            return;
        };
        let paused_for = now.saturating_sub(since);
        self.timers.postpone_all(paused_for);
        for state in self.active.values_mut() {
            state.anchor += paused_for;
        }
        tracing::debug!("Conversations resumed after {} ms", paused_for);
    }

    /// Cancel everything. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.timers.clear();
        self.cooldowns.clear();
        self.active.clear();
        self.scripts.clear();
        self.pending.clear();
        self.suspended_at = None;
    }

    fn release_lines(
        &mut self,
        group: GroupId,
        roster: &Roster,
        now: Millis,
        events: &mut Vec<DialogueEvent>,
    ) {
        let Some(script) = self.scripts.get(&group) else {
            return;
        };
        let Some(state) = self.active.get_mut(&group) else {
            return;
        };

        let elapsed_secs = now.saturating_sub(state.anchor) as f32 / 1000.0;
        let readable = elapsed_secs * self.config.chars_per_second;
        let mut script_done = false;

        while state.showing.is_none() {
            let Some(line) = script.lines().get(state.line_index) else {
                script_done = true;
                break;
            };
            if readable < line.cumulative_offset as f32 {
                return;
            }

            let (Some(member), Some(text)) = (&line.entry.speaker_id, &line.entry.text) else {
                tracing::warn!(
                    "Skipping malformed dialogue line {} for {}",
                    state.line_index,
                    group
                );
                state.line_index += 1;
                continue;
            };

            let Some(speaker) = roster.working_member(group, member) else {
                tracing::debug!("Speaker {} of {} not present, skipping line", member, group);
                state.line_index += 1;
                continue;
            };

            let chunks = chunk_text(text, self.config.chunk_size);
            let duration_ms = chunk_duration_ms(&chunks[0], &self.config);
            let timer = self.timers.schedule(now + duration_ms, SchedulerTimer::ChunkElapsed(group));

            events.push(DialogueEvent::LineReady {
                group,
                speaker: speaker.id,
                member: member.clone(),
                text: chunks[0].clone(),
                duration_ms,
                line_index: state.line_index,
                chunk_index: 0,
            });
            state.chunk_index = 0;
            state.showing = Some(ShowingLine {
                speaker: speaker.id,
                member: member.clone(),
                chunks,
                timer,
            });
        }

        if script_done {
            self.finish_round(group, now, events);
        }
    }

    fn advance_chunk(
        &mut self,
        group: GroupId,
        roster: &Roster,
        now: Millis,
        events: &mut Vec<DialogueEvent>,
    ) {
        let Some(state) = self.active.get_mut(&group) else {
            return;
        };
        let Some(showing) = state.showing.as_mut() else {
            return;
        };

        state.chunk_index += 1;
        let speaker_present = roster
            .get(showing.speaker)
            .is_some_and(|a| a.lifecycle() == LifecycleState::Working);

        match showing.chunks.get(state.chunk_index).cloned() {
            Some(chunk) if speaker_present => {
                let duration_ms = chunk_duration_ms(&chunk, &self.config);
                showing.timer = self
                    .timers
                    .schedule(now + duration_ms, SchedulerTimer::ChunkElapsed(group));
                events.push(DialogueEvent::LineReady {
                    group,
                    speaker: showing.speaker,
                    member: showing.member.clone(),
                    text: chunk,
                    duration_ms,
                    line_index: state.line_index,
                    chunk_index: state.chunk_index,
                });
            }
            _ => {
                state.showing = None;
                state.chunk_index = 0;
                state.line_index += 1;
            }
        }
    }

    fn finish_round(&mut self, group: GroupId, now: Millis, events: &mut Vec<DialogueEvent>) {
        if let Some(state) = self.active.remove(&group) {
            if let Some(showing) = state.showing {
                self.timers.cancel(showing.timer);
            }
        }
        let (min, max) = (self.config.cooldown_min_ms, self.config.cooldown_max_ms);
        let cooldown = self.rng.gen_range(min..=max.max(min));
        let timer = self.timers.schedule(now + cooldown, SchedulerTimer::Cooldown(group));
        self.cooldowns.insert(group, timer);

        tracing::info!("{} conversation finished, next round in {} ms", group, cooldown);
        events.push(DialogueEvent::RoundComplete { group });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Facing, Vec2};
    use crate::dialogue::script::DialogueEntry;
    use crate::roster::{AgentRecord, MemberDefinition, Seat};

    fn seat() -> Seat {
        Seat {
            position: Vec2::new(10.0, 10.0),
            facing: Facing::Right,
        }
    }

    /// Team 1: alice and bob. Team 2: carol.
    fn roster() -> Roster {
        let members = [(1, "alice"), (1, "bob"), (2, "carol")];
        Roster::new(
            members
                .iter()
                .map(|(g, m)| {
                    AgentRecord::new(AgentId(0), GroupId(*g), &MemberDefinition::new(*m), "w", seat())
                })
                .collect(),
        )
    }

    fn arrive(roster: &mut Roster, ids: &[u32]) {
        for id in ids {
            roster.begin_arrival(AgentId(*id)).unwrap();
            roster.commit_arrival(AgentId(*id)).unwrap();
        }
    }

    fn scheduler(group: u32, entries: Vec<DialogueEntry>) -> ConversationScheduler {
        let mut scheduler = ConversationScheduler::new(DialogueConfig::default(), 7);
        scheduler.set_script(GroupId(group), Script::new(entries));
        scheduler
    }

    fn lines(events: &[DialogueEvent]) -> Vec<(String, u64)> {
        events
            .iter()
            .filter_map(|e| match e {
                DialogueEvent::LineReady { text, duration_ms, .. } => {
                    Some((text.clone(), *duration_ms))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_long_line_plays_in_three_chunks() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(
            2,
            vec![DialogueEntry::new("carol", "A".repeat(250)).with_token_count(250)],
        );

        assert!(sched.try_start(GroupId(2), &roster, 0));
        let first = sched.tick(&roster, 0);
        assert_eq!(first[0], DialogueEvent::RoundStarted { group: GroupId(2) });
        assert_eq!(lines(&first), vec![("A".repeat(100), 6000)]);

        assert!(sched.tick(&roster, 5999).is_empty());
        assert_eq!(lines(&sched.tick(&roster, 6000)), vec![("A".repeat(100), 6000)]);
        assert_eq!(lines(&sched.tick(&roster, 12_000)), vec![("A".repeat(50), 3000)]);

        let done = sched.tick(&roster, 15_000);
        assert_eq!(done, vec![DialogueEvent::RoundComplete { group: GroupId(2) }]);
        assert!(!sched.is_active(GroupId(2)));
        assert!(sched.has_cooldown(GroupId(2)));
    }

    #[test]
    fn test_lines_paced_by_reading_speed() {
        let mut roster = roster();
        arrive(&mut roster, &[0, 1]);
        let mut sched = scheduler(
            1,
            vec![
                DialogueEntry::new("alice", "hi").with_token_count(30),
                DialogueEntry::new("bob", "hello"),
            ],
        );

        sched.try_start(GroupId(1), &roster, 1000);
        assert_eq!(lines(&sched.tick(&roster, 1000)).len(), 1);

        // First chunk ends at 2500, but 30 tokens at 15/s take two seconds
        assert!(lines(&sched.tick(&roster, 2500)).is_empty());
        assert!(lines(&sched.tick(&roster, 2999)).is_empty());
        assert_eq!(lines(&sched.tick(&roster, 3000)), vec![("hello".to_string(), 1500)]);
    }

    #[test]
    fn test_round_needs_every_member_working() {
        let mut roster = roster();
        let mut sched = scheduler(1, vec![DialogueEntry::new("alice", "hi")]);

        arrive(&mut roster, &[0]);
        assert!(!sched.try_start(GroupId(1), &roster, 0));

        arrive(&mut roster, &[1]);
        assert!(sched.try_start(GroupId(1), &roster, 0));
        // Only one round at a time
        assert!(!sched.try_start(GroupId(1), &roster, 10));
    }

    #[test]
    fn test_group_without_script_never_starts() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(1, vec![DialogueEntry::new("alice", "hi")]);
        assert!(!sched.try_start(GroupId(2), &roster, 0));
    }

    #[test]
    fn test_missing_and_malformed_speakers_skipped() {
        let mut roster = roster();
        arrive(&mut roster, &[0, 1]);
        let mut sched = scheduler(
            1,
            vec![
                DialogueEntry::default(),
                DialogueEntry::new("dave", "not on this team"),
                DialogueEntry::new("bob", "still here"),
            ],
        );

        sched.try_start(GroupId(1), &roster, 0);
        // "not on this team" is 16 characters long
        let events = sched.tick(&roster, 2000);
        assert_eq!(lines(&events), vec![("still here".to_string(), 1500)]);
    }

    #[test]
    fn test_cooldown_starts_next_round() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(2, vec![DialogueEntry::new("carol", "hi")]);

        sched.try_start(GroupId(2), &roster, 0);
        sched.tick(&roster, 0);
        sched.tick(&roster, 1500);
        assert!(!sched.is_active(GroupId(2)));

        assert!(sched.tick(&roster, 1500 + 29_999).is_empty());
        let events = sched.tick(&roster, 1500 + 60_000);
        assert!(events.contains(&DialogueEvent::RoundStarted { group: GroupId(2) }));
        assert_eq!(lines(&events).len(), 1);
    }

    #[test]
    fn test_suspend_shifts_timers() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(2, vec![DialogueEntry::new("carol", "A".repeat(150))]);

        sched.try_start(GroupId(2), &roster, 0);
        sched.tick(&roster, 0);
        sched.suspend(1000);
        assert!(sched.tick(&roster, 9000).is_empty());
        sched.resume(11_000);

        // Chunk due at 6000 moved by the 10 s spent suspended
        assert!(sched.tick(&roster, 15_999).is_empty());
        assert_eq!(lines(&sched.tick(&roster, 16_000)).len(), 1);
    }

    #[test]
    fn test_speaker_leaving_cuts_line_short() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(2, vec![DialogueEntry::new("carol", "A".repeat(150))]);

        sched.try_start(GroupId(2), &roster, 0);
        sched.tick(&roster, 0);
        roster.begin_departure(AgentId(2)).unwrap();

        let events = sched.tick(&roster, 6000);
        assert_eq!(events, vec![DialogueEvent::RoundComplete { group: GroupId(2) }]);
    }

    #[test]
    fn test_destroy_is_final() {
        let mut roster = roster();
        arrive(&mut roster, &[2]);
        let mut sched = scheduler(2, vec![DialogueEntry::new("carol", "hi")]);

        sched.try_start(GroupId(2), &roster, 0);
        sched.destroy();
        sched.destroy();

        assert!(sched.tick(&roster, 100_000).is_empty());
        assert!(!sched.try_start(GroupId(2), &roster, 100_000));
        assert!(sched.active_groups().is_empty());
    }
}
