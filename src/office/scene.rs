//! Office floor plan
//!
//! Desks and boxes come from a JSON scene file in the layout the level
//! editor writes (`objects.desks`, `objects.boxes`, camelCase keys). Each
//! piece of furniture becomes an [`Obstacle`]; desks also seat a team.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{Rect, Vec2};
use crate::spatial::obstacle::Obstacle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Furniture {
    #[serde(default)]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default, alias = "passable_height")]
    pub passable_height: f32,
}

impl Furniture {
    pub fn new(id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            rotation: 0.0,
            passable_height: 0.0,
        }
    }

    pub fn with_passable_height(mut self, passable_height: f32) -> Self {
        self.passable_height = passable_height;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneObjects {
    #[serde(default)]
    pub desks: Vec<Furniture>,
    #[serde(default)]
    pub boxes: Vec<Furniture>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStart {
    pub start_x: f32,
    pub start_y: f32,
}

fn default_desk_size() -> Vec2 {
    Vec2::new(80.0, 60.0)
}

fn default_box_size() -> Vec2 {
    Vec2::new(40.0, 40.0)
}

fn default_scale() -> f32 {
    1.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLayout {
    /// Overrides the configured world size when present
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub objects: SceneObjects,
    #[serde(default)]
    pub player: Option<PlayerStart>,
    /// Unscaled sprite sizes
    #[serde(default = "default_desk_size")]
    pub desk_size: Vec2,
    #[serde(default = "default_box_size")]
    pub box_size: Vec2,
    #[serde(default = "default_scale")]
    pub furniture_scale: f32,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            objects: SceneObjects::default(),
            player: None,
            desk_size: default_desk_size(),
            box_size: default_box_size(),
            furniture_scale: default_scale(),
        }
    }
}

impl SceneLayout {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Two rows of five desks with a row of boxes near the door
    pub fn demo() -> Self {
        let mut desks = Vec::new();
        for (row, y) in [370.0, 530.0].into_iter().enumerate() {
            for (col, x) in [150.0, 350.0, 550.0, 750.0, 950.0].into_iter().enumerate() {
                desks.push(
                    Furniture::new(format!("desk_{}", row * 5 + col), x, y).with_passable_height(30.0),
                );
            }
        }
        let boxes = [400.0, 500.0, 600.0, 700.0]
            .into_iter()
            .enumerate()
            .map(|(i, x)| Furniture::new(format!("box_{i}"), x, 230.0))
            .collect();

        Self {
            objects: SceneObjects { desks, boxes },
            player: Some(PlayerStart {
                start_x: 800.0,
                start_y: 450.0,
            }),
            ..Self::default()
        }
    }

    fn scale(&self) -> Vec2 {
        Vec2::new(self.furniture_scale, self.furniture_scale)
    }

    pub fn obstacles(&self) -> Vec<Obstacle> {
        let desks = self
            .objects
            .desks
            .iter()
            .map(|d| Obstacle::from_sprite(Vec2::new(d.x, d.y), self.desk_size, self.scale(), d.passable_height));
        let boxes = self
            .objects
            .boxes
            .iter()
            .map(|b| Obstacle::from_sprite(Vec2::new(b.x, b.y), self.box_size, self.scale(), b.passable_height));
        desks.chain(boxes).collect()
    }

    /// Visual bounds of each desk, used for seating
    pub fn desk_bounds(&self) -> Vec<Rect> {
        self.objects
            .desks
            .iter()
            .map(|d| {
                Obstacle::from_sprite(Vec2::new(d.x, d.y), self.desk_size, self.scale(), 0.0).bounds()
            })
            .collect()
    }

    /// Would a player standing at `feet` collide with furniture?
    ///
    /// The player's hitbox is the lower half of a `size` sprite anchored at
    /// its feet, half as wide as the sprite.
    pub fn player_collides(&self, feet: Vec2, size: Vec2) -> bool {
        let hitbox = Rect::new(
            Vec2::new(feet.x - size.x / 4.0, feet.y - size.y / 2.0),
            Vec2::new(feet.x + size.x / 4.0, feet.y),
        );
        self.obstacles().iter().any(|o| {
            let solid = o.solid_bounds();
            hitbox.min.x < solid.max.x
                && hitbox.max.x > solid.min.x
                && hitbox.min.y < solid.max.y
                && hitbox.max.y > solid.min.y
        })
    }
}
