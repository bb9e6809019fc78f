//! Nova Strike - A 2D arcade space shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, spawning, story, game state)
//! - `assets`: Asset lookup seam used by the presentation layer
//! - `tuning`: Data-driven game balance
//! - `error`: Crate error type

pub mod assets;
pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions
    pub const SCREEN_WIDTH: f32 = 1280.0;
    pub const SCREEN_HEIGHT: f32 = 720.0;

    /// Horizontal margin kept clear when picking spawn positions
    pub const SPAWN_MARGIN: f32 = 50.0;
    /// Meteors and pickups appear this far above the top edge
    pub const SPAWN_ABOVE_TOP: f32 = 50.0;

    /// Player defaults
    pub const PLAYER_SPEED: f32 = 300.0;
    pub const PLAYER_FIRE_COOLDOWN_MS: f64 = 250.0;
    pub const PLAYER_MAX_HEALTH: u32 = 100;
    pub const PLAYER_WIDTH: f32 = 50.0;
    pub const PLAYER_HEIGHT: f32 = 40.0;
    /// Distance of the ship's centre from the bottom edge at run start
    pub const PLAYER_START_BOTTOM_OFFSET: f32 = 100.0;

    /// Bullet defaults
    pub const BULLET_SPEED: f32 = 420.0;
    pub const BULLET_WIDTH: f32 = 10.0;
    pub const BULLET_HEIGHT: f32 = 20.0;

    /// Endless mode spawn intervals
    pub const ENDLESS_ENEMY_INTERVAL_MS: f64 = 1500.0;
    pub const METEOR_INTERVAL_MS: f64 = 2000.0;
}

/// Convert a per-frame duration in seconds to milliseconds
#[inline]
pub fn secs_to_ms(dt: f32) -> f64 {
    f64::from(dt) * 1000.0
}

/// Unit direction from four held keys; diagonals move at axial speed
#[inline]
pub fn direction_from_keys(up: bool, down: bool, left: bool, right: bool) -> Vec2 {
    let x = f32::from(u8::from(right)) - f32::from(u8::from(left));
    let y = f32::from(u8::from(down)) - f32::from(u8::from(up));
    Vec2::new(x, y).normalize_or_zero()
}
