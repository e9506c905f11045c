//! Team definitions and desk seating

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{AgentId, Facing, GroupId, MemberId, Rect, Vec2};
use crate::roster::AgentRecord;

/// Seats stand this far left/right of the desk edge
const SEAT_OFFSET_X: f32 = 20.0;
/// and this far inside its top/bottom edge
const SEAT_OFFSET_Y: f32 = 30.0;
/// Sprites are anchored at their feet
const FOOT_OFFSET: f32 = 20.0;

pub const DEFAULT_SPRITE_KEYS: [&str; 4] = ["farmer0", "farmer1", "farmer2", "farmer3"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDefinition {
    pub id: MemberId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub introduction: String,
}

impl MemberDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            kind: String::new(),
            introduction: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDefinition {
    pub team_id: GroupId,
    #[serde(rename = "member", default)]
    pub members: Vec<MemberDefinition>,
}

impl TeamDefinition {
    pub fn from_json(content: &str) -> Result<Vec<TeamDefinition>> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Vec<TeamDefinition>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub position: Vec2,
    pub facing: Facing,
}

/// The four seats around a desk: two on each side, upper and lower.
/// Seats on the right face left, towards the desk.
pub fn desk_seats(desk: Rect) -> [Seat; 4] {
    let left = desk.min.x - SEAT_OFFSET_X;
    let right = desk.max.x + SEAT_OFFSET_X;
    let upper = desk.min.y + SEAT_OFFSET_Y + FOOT_OFFSET;
    let lower = desk.max.y - SEAT_OFFSET_Y + FOOT_OFFSET;

    [
        Seat { position: Vec2::new(left, upper), facing: Facing::Right },
        Seat { position: Vec2::new(left, lower), facing: Facing::Right },
        Seat { position: Vec2::new(right, upper), facing: Facing::Left },
        Seat { position: Vec2::new(right, lower), facing: Facing::Left },
    ]
}

/// Give every team its own desk and every member a seat at it
///
/// Desks are handed out in random order; teams beyond the desk count and
/// members beyond four per team are left out. Ids are assigned in seating
/// order starting at zero.
pub fn assign_seats<R: Rng>(
    desks: &[Rect],
    teams: &[TeamDefinition],
    sprite_keys: &[String],
    rng: &mut R,
) -> Vec<AgentRecord> {
    let mut available: Vec<Rect> = desks.to_vec();
    available.shuffle(rng);

    let mut records = Vec::new();
    for team in teams {
        let Some(desk) = available.pop() else {
            tracing::warn!("No desk left for {}, {} teams unseated", team.team_id, teams.len());
            break;
        };

        let mut seats = desk_seats(desk).to_vec();
        seats.shuffle(rng);

        for member in &team.members {
            let Some(seat) = seats.pop() else {
                tracing::warn!("{} has more members than seats", team.team_id);
                break;
            };
            let sprite_key = sprite_keys
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SPRITE_KEYS[0].to_string());
            let id = AgentId(records.len() as u32);
            records.push(AgentRecord::new(id, team.team_id, member, sprite_key, seat));
        }
    }

    tracing::info!(
        "Prepared {} agents across {} teams",
        records.len(),
        teams.len()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn palette() -> Vec<String> {
        DEFAULT_SPRITE_KEYS.iter().map(|s| s.to_string()).collect()
    }

    fn team(id: u32, members: &[&str]) -> TeamDefinition {
        TeamDefinition {
            team_id: GroupId(id),
            members: members.iter().map(|m| MemberDefinition::new(*m)).collect(),
        }
    }

    #[test]
    fn test_desk_seats_layout() {
        // 120x90 desk centered at (150, 370)
        let desk = Rect::new(Vec2::new(90.0, 325.0), Vec2::new(210.0, 415.0));
        let seats = desk_seats(desk);

        assert_eq!(seats[0].position, Vec2::new(70.0, 375.0));
        assert_eq!(seats[1].position, Vec2::new(70.0, 405.0));
        assert_eq!(seats[2].position, Vec2::new(230.0, 375.0));
        assert_eq!(seats[3].position, Vec2::new(230.0, 405.0));
        assert_eq!(seats[0].facing, Facing::Right);
        assert_eq!(seats[3].facing, Facing::Left);
    }

    #[test]
    fn test_one_desk_per_team_and_four_seats_max() {
        let desks = [
            Rect::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0)),
            Rect::new(Vec2::new(300.0, 0.0), Vec2::new(400.0, 100.0)),
        ];
        let teams = [
            team(1, &["a", "b", "c", "d", "e"]),
            team(2, &["f", "g"]),
            team(3, &["h"]),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let records = assign_seats(&desks, &teams, &palette(), &mut rng);

        // Fifth member of team 1 and the whole of team 3 are left out
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.group_id != GroupId(3)));

        // Seats are unique
        for (i, a) in records.iter().enumerate() {
            assert_eq!(a.id, AgentId(i as u32));
            for b in &records[i + 1..] {
                assert_ne!(a.desk_position, b.desk_position);
            }
        }

        // Team members share a desk
        let team2: Vec<_> = records.iter().filter(|r| r.group_id == GroupId(2)).collect();
        assert!((team2[0].desk_position.x - team2[1].desk_position.x).abs() <= 140.0);
    }

    #[test]
    fn test_team_json() {
        let json = r#"[
            {"team_id": 3, "member": [
                {"id": "m1", "type": "engineer", "introduction": "Builds things"},
                {"id": "m2"}
            ]}
        ]"#;
        let teams = TeamDefinition::from_json(json).unwrap();
        assert_eq!(teams[0].team_id, GroupId(3));
        assert_eq!(teams[0].members[0].kind, "engineer");
        assert_eq!(teams[0].members[1].introduction, "");
    }
}
