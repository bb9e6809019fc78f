//! Simulated entities
//!
//! Every object on the playfield other than the player is one `Entity`
//! record. Behaviour is composed from data (kind, motion profile, optional
//! weapon) rather than a type hierarchy.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::spawn::SpawnIntent;
use crate::consts::*;

/// Registry-allocated entity identifier (monotonic, never reused within a run)
pub type EntityId = u32;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Non-empty intersection test. Boxes that only share an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Enemy ship variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Basic,
    Tank,
    Fast,
    Shooter,
    Rocket,
}

/// Anything the player shoots at or must avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Enemy(EnemyKind),
    Meteor,
}

impl ObstacleKind {
    /// Score awarded when destroyed by a player bullet
    pub fn score(&self) -> u64 {
        match self {
            ObstacleKind::Enemy(EnemyKind::Basic) => 100,
            ObstacleKind::Enemy(EnemyKind::Fast) => 150,
            ObstacleKind::Enemy(EnemyKind::Shooter) => 200,
            ObstacleKind::Enemy(EnemyKind::Rocket) => 250,
            ObstacleKind::Enemy(EnemyKind::Tank) => 300,
            ObstacleKind::Meteor => 50,
        }
    }
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy,
}

/// Beneficial pickups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Health,
    SpeedBoost,
    Invincibility,
    RapidFire,
    Shield,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Health,
        PowerUpKind::SpeedBoost,
        PowerUpKind::Invincibility,
        PowerUpKind::RapidFire,
        PowerUpKind::Shield,
    ];
}

/// Harmful pickups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerDownKind {
    Slow,
    WeakBullets,
    ReverseControls,
}

impl PowerDownKind {
    pub const ALL: [PowerDownKind; 3] = [
        PowerDownKind::Slow,
        PowerDownKind::WeakBullets,
        PowerDownKind::ReverseControls,
    ];
}

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    PowerUp(PowerUpKind),
    PowerDown(PowerDownKind),
}

/// Entity type discriminator, selects damage/scoring rules and the secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle(ObstacleKind),
    Bullet(Owner),
    Pickup(PickupKind),
}

/// Movement profile layered on top of linear velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    Linear,
    /// Lateral sweep that bounces off the side edges
    Zigzag { direction: f32, lateral_speed: f32 },
    /// Sinusoidal lateral float
    Drift { phase: f32, rate: f32, amplitude: f32 },
}

/// Enemy gun with a randomized refire delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub last_shot_ms: f64,
    pub delay_ms: f64,
}

/// Refire delay range for shooter enemies (ms)
pub const SHOOTER_REFIRE_MS: std::ops::RangeInclusive<u32> = 1500..=3000;

impl Weapon {
    fn armed(now_ms: f64, rng: &mut Pcg32) -> Self {
        Self {
            last_shot_ms: now_ms,
            delay_ms: f64::from(rng.random_range(SHOOTER_REFIRE_MS)),
        }
    }
}

/// Per-frame context handed to `Entity::advance`
pub struct AdvanceCtx<'a> {
    pub now_ms: f64,
    pub playfield: Vec2,
    pub margin: f32,
    pub rng: &'a mut Pcg32,
    /// Entities requested during the advance (enemy bullets)
    pub intents: &'a mut Vec<SpawnIntent>,
}

/// A simulated object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Centre position (y grows downward)
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub hp: u8,
    pub alive: bool,
    pub motion: Motion,
    pub weapon: Option<Weapon>,
    /// Which of several equivalent images to show (meteors)
    #[serde(default)]
    pub visual_variant: u8,
}

impl Entity {
    fn with_kind(id: EntityId, kind: EntityKind, pos: Vec2, size: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            size,
            vel,
            hp: 1,
            alive: true,
            motion: Motion::Linear,
            weapon: None,
            visual_variant: 0,
        }
    }

    /// Enemy ship entering with its bottom edge on the top of the playfield
    pub fn enemy(id: EntityId, kind: EnemyKind, x: f32, now_ms: f64, rng: &mut Pcg32) -> Self {
        let size = match kind {
            EnemyKind::Rocket => Vec2::new(40.0, 70.0),
            _ => Vec2::new(50.0, 50.0),
        };
        let (speed, hp) = match kind {
            EnemyKind::Basic => (rng.random_range(120.0..300.0), 1),
            EnemyKind::Tank => (120.0, 3),
            EnemyKind::Fast => (420.0, 1),
            EnemyKind::Shooter => (rng.random_range(90.0..180.0), 2),
            EnemyKind::Rocket => (rng.random_range(180.0..300.0), 3),
        };
        let pos = Vec2::new(x, -size.y / 2.0);
        let mut entity = Self::with_kind(
            id,
            EntityKind::Obstacle(ObstacleKind::Enemy(kind)),
            pos,
            size,
            Vec2::new(0.0, speed),
        );
        entity.hp = hp;
        if kind == EnemyKind::Shooter {
            if rng.random_bool(0.5) {
                let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                entity.motion = Motion::Zigzag {
                    direction,
                    lateral_speed: 120.0,
                };
            }
            entity.weapon = Some(Weapon::armed(now_ms, rng));
        }
        entity
    }

    pub fn meteor(id: EntityId, x: f32, rng: &mut Pcg32) -> Self {
        let side = rng.random_range(30..=80) as f32;
        let vel = Vec2::new(rng.random_range(-60.0..60.0), rng.random_range(60.0..240.0));
        let mut entity = Self::with_kind(
            id,
            EntityKind::Obstacle(ObstacleKind::Meteor),
            Vec2::new(x, -SPAWN_ABOVE_TOP),
            Vec2::splat(side),
            vel,
        );
        entity.visual_variant = rng.random_range(1..=4);
        entity
    }

    pub fn bullet(id: EntityId, owner: Owner, pos: Vec2) -> Self {
        let vy = match owner {
            Owner::Player => -BULLET_SPEED,
            Owner::Enemy => BULLET_SPEED,
        };
        Self::with_kind(
            id,
            EntityKind::Bullet(owner),
            pos,
            Vec2::new(BULLET_WIDTH, BULLET_HEIGHT),
            Vec2::new(0.0, vy),
        )
    }

    pub fn pickup(id: EntityId, kind: PickupKind, pos: Vec2) -> Self {
        let (vy, motion) = match kind {
            PickupKind::PowerUp(_) => (
                120.0,
                Motion::Drift {
                    phase: 0.0,
                    rate: 18.0,
                    amplitude: 120.0,
                },
            ),
            PickupKind::PowerDown(_) => (150.0, Motion::Linear),
        };
        let mut entity = Self::with_kind(
            id,
            EntityKind::Pickup(kind),
            pos,
            Vec2::splat(35.0),
            Vec2::new(0.0, vy),
        );
        entity.motion = motion;
        entity
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }

    pub fn obstacle_kind(&self) -> Option<ObstacleKind> {
        match self.kind {
            EntityKind::Obstacle(kind) => Some(kind),
            _ => None,
        }
    }

    /// Advance one frame. Returns whether the entity is still alive.
    pub fn advance(&mut self, dt: f32, ctx: &mut AdvanceCtx) -> bool {
        if !self.alive {
            return false;
        }

        self.pos += self.vel * dt;
        match &mut self.motion {
            Motion::Linear => {}
            Motion::Zigzag {
                direction,
                lateral_speed,
            } => {
                self.pos.x += *direction * *lateral_speed * dt;
                let half = self.size.x / 2.0;
                if self.pos.x - half < 0.0 || self.pos.x + half > ctx.playfield.x {
                    *direction = -*direction;
                }
            }
            Motion::Drift {
                phase,
                rate,
                amplitude,
            } => {
                *phase += *rate * dt;
                self.pos.x += phase.sin() * *amplitude * dt;
            }
        }

        if let Some(weapon) = &mut self.weapon {
            if ctx.now_ms - weapon.last_shot_ms >= weapon.delay_ms {
                let muzzle = Vec2::new(self.pos.x, self.pos.y + self.size.y / 2.0);
                ctx.intents.push(SpawnIntent::Bullet {
                    owner: Owner::Enemy,
                    pos: muzzle,
                });
                weapon.last_shot_ms = ctx.now_ms;
                weapon.delay_ms = f64::from(ctx.rng.random_range(SHOOTER_REFIRE_MS));
            }
        }

        // Retire once fully past the edge the entity is heading toward
        let bounds = self.bounds();
        let past_bottom = self.vel.y > 0.0 && bounds.min.y > ctx.playfield.y + ctx.margin;
        let past_top = self.vel.y < 0.0 && bounds.max.y < -ctx.margin;
        if past_bottom || past_top {
            self.alive = false;
        }
        self.alive
    }
}
