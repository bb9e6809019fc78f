//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod entity;
pub mod player;
pub mod registry;
pub mod spawn;
pub mod state;
pub mod story;
pub mod tick;

pub use collision::{contact_damage, resolve_collisions};
pub use entity::{
    Aabb, EnemyKind, Entity, EntityId, EntityKind, ObstacleKind, Owner, PickupKind, PowerDownKind,
    PowerUpKind,
};
pub use player::{Ammo, Player, TimedFlag};
pub use registry::Registry;
pub use spawn::{SpawnIntent, SpawnScheduler, SpawnTimer};
pub use state::{Command, EventSink, GameEvent, GameMode, GamePhase, GameState, RunEndCause};
pub use story::{
    Challenge, ChallengeKind, Story, StoryCatalog, StoryOutcome, StoryPhase, StoryProgress, Wave,
};
pub use tick::{TickInput, tick};
