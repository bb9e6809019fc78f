//! Asset lookup seam
//!
//! The simulation never touches images. The presentation layer asks the
//! resolver what to draw for an entity and gets either the image stored
//! under the entity's visual key or a solid-colour placeholder.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::sim::entity::{EnemyKind, Entity, EntityKind, ObstacleKind, Owner, PickupKind};
use crate::sim::entity::{PowerDownKind, PowerUpKind};
use crate::sim::player::Player;

/// RGB colour
pub type Rgb = [u8; 3];

/// Image lookup provided by the harness
pub trait AssetLookup {
    type Image: Clone;

    fn image_for(&self, key: &str) -> Option<Self::Image>;
}

impl<I: Clone> AssetLookup for HashMap<String, I> {
    type Image = I;

    fn image_for(&self, key: &str) -> Option<I> {
        self.get(key).cloned()
    }
}

/// Lookup with no images at all; everything renders as a placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetLookup for NoAssets {
    type Image = ();

    fn image_for(&self, _key: &str) -> Option<()> {
        None
    }
}

/// What an entity should look like
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSpec {
    pub key: String,
    /// Placeholder colour when the image is missing
    pub color: Rgb,
    pub size: Vec2,
}

/// Resolved visual
#[derive(Debug, Clone, PartialEq)]
pub enum Visual<I> {
    Image(I),
    Placeholder { color: Rgb, size: Vec2 },
}

const BLUE: Rgb = [0, 0, 255];
const RED: Rgb = [255, 0, 0];
const YELLOW: Rgb = [255, 255, 0];
const GREY: Rgb = [100, 100, 100];

pub fn player_visual(player: &Player) -> VisualSpec {
    VisualSpec {
        key: "ships_spaceships_001_png".into(),
        color: BLUE,
        size: player.size,
    }
}

fn power_up_visual(kind: PowerUpKind) -> (&'static str, Rgb) {
    match kind {
        PowerUpKind::Health => ("parts_spaceparts_066_png", [50, 255, 100]),
        PowerUpKind::SpeedBoost => ("parts_spaceparts_072_png", [100, 200, 255]),
        PowerUpKind::Invincibility => ("parts_spaceparts_057_png", [255, 215, 0]),
        PowerUpKind::RapidFire => ("parts_spaceparts_055_png", [255, 150, 50]),
        PowerUpKind::Shield => ("parts_spaceparts_052_png", [150, 150, 255]),
    }
}

fn power_down_visual(kind: PowerDownKind) -> (&'static str, Rgb) {
    match kind {
        PowerDownKind::Slow => ("parts_spaceparts_088_png", [150, 50, 50]),
        PowerDownKind::WeakBullets => ("parts_spaceparts_086_png", [200, 100, 50]),
        PowerDownKind::ReverseControls => ("parts_spaceparts_091_png", [180, 50, 180]),
    }
}

pub fn entity_visual(entity: &Entity) -> VisualSpec {
    let (key, color) = match entity.kind {
        EntityKind::Obstacle(ObstacleKind::Meteor) => {
            let variant = entity.visual_variant.clamp(1, 4);
            (format!("meteors_spacemeteors_00{}_png", variant), GREY)
        }
        EntityKind::Obstacle(ObstacleKind::Enemy(kind)) => {
            let (key, color) = match kind {
                EnemyKind::Basic => ("ships_spaceships_004_png", RED),
                EnemyKind::Tank => ("ships_spaceships_008_png", RED),
                EnemyKind::Fast => ("ships_spaceships_006_png", RED),
                EnemyKind::Shooter => ("ships_spaceships_007_png", RED),
                EnemyKind::Rocket => ("missiles_spacemissiles_016_png", [200, 50, 50]),
            };
            (key.to_string(), color)
        }
        EntityKind::Bullet(Owner::Player) => ("missiles_spacemissiles_001_png".to_string(), YELLOW),
        EntityKind::Bullet(Owner::Enemy) => ("missiles_spacemissiles_004_png".to_string(), RED),
        EntityKind::Pickup(PickupKind::PowerUp(kind)) => {
            let (key, color) = power_up_visual(kind);
            (key.to_string(), color)
        }
        EntityKind::Pickup(PickupKind::PowerDown(kind)) => {
            let (key, color) = power_down_visual(kind);
            (key.to_string(), color)
        }
    };
    VisualSpec {
        key,
        color,
        size: entity.size,
    }
}

/// Resolves visual specs against a lookup, warning once per missing key
pub struct VisualResolver<L: AssetLookup> {
    lookup: L,
    missing: HashSet<String>,
}

impl<L: AssetLookup> VisualResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            missing: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, spec: &VisualSpec) -> Visual<L::Image> {
        if let Some(image) = self.lookup.image_for(&spec.key) {
            return Visual::Image(image);
        }
        if self.missing.insert(spec.key.clone()) {
            log::warn!("Missing image '{}', using placeholder", spec.key);
        }
        Visual::Placeholder {
            color: spec.color,
            size: spec.size,
        }
    }

    pub fn resolve_entity(&mut self, entity: &Entity) -> Visual<L::Image> {
        self.resolve(&entity_visual(entity))
    }

    pub fn resolve_player(&mut self, player: &Player) -> Visual<L::Image> {
        self.resolve(&player_visual(player))
    }

    /// Keys that have been asked for but not found
    pub fn missing_keys(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(String::as_str)
    }
}
