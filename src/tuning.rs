//! Data-driven game balance
//!
//! Every gameplay number the simulation reads lives here so a run can be
//! re-balanced from JSON without recompiling. Missing fields fall back to the
//! built-in values.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};

/// Gameplay tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Playfield ===
    pub playfield_width: f32,
    pub playfield_height: f32,
    /// Extra distance past the top/bottom edge before an entity retires
    pub offscreen_margin: f32,

    // === Player ===
    /// Base movement speed (pixels/s)
    pub player_speed: f32,
    /// Base delay between accepted shots (ms)
    pub player_fire_cooldown_ms: f64,
    pub player_max_health: u32,
    /// Health restored by the `health` power-up
    pub health_pickup_amount: u32,

    // === Effect durations (ms) ===
    pub invincible_duration_ms: f64,
    pub shield_duration_ms: f64,
    pub reverse_duration_ms: f64,
    pub speed_effect_duration_ms: f64,
    pub fire_effect_duration_ms: f64,

    // === Effect strengths (relative to base) ===
    pub speed_boost_multiplier: f32,
    pub slow_multiplier: f32,
    pub rapid_fire_factor: f64,
    pub weak_bullets_factor: f64,

    // === Damage ===
    pub contact_damage: u32,
    pub rocket_contact_damage: u32,
    pub enemy_bullet_damage: u32,

    // === Spawning (ms) ===
    pub endless_enemy_interval_ms: f64,
    pub meteor_interval_ms: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            playfield_width: SCREEN_WIDTH,
            playfield_height: SCREEN_HEIGHT,
            offscreen_margin: 0.0,

            player_speed: PLAYER_SPEED,
            player_fire_cooldown_ms: PLAYER_FIRE_COOLDOWN_MS,
            player_max_health: PLAYER_MAX_HEALTH,
            health_pickup_amount: 30,

            invincible_duration_ms: 5000.0,
            shield_duration_ms: 8000.0,
            reverse_duration_ms: 5000.0,
            speed_effect_duration_ms: 7000.0,
            fire_effect_duration_ms: 7000.0,

            speed_boost_multiplier: 1.5,
            slow_multiplier: 0.5,
            rapid_fire_factor: 0.5,
            weak_bullets_factor: 2.0,

            contact_damage: 20,
            rocket_contact_damage: 30,
            enemy_bullet_damage: 10,

            endless_enemy_interval_ms: ENDLESS_ENEMY_INTERVAL_MS,
            meteor_interval_ms: METEOR_INTERVAL_MS,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the simulation cannot run with.
    ///
    /// Zero spawn intervals are allowed: they disarm the matching spawner.
    pub fn validate(&self) -> Result<()> {
        if !(self.playfield_width > 2.0 * SPAWN_MARGIN) || !(self.playfield_height > 0.0) {
            return Err(Error::InvalidTuning(format!(
                "playfield {}x{} too small",
                self.playfield_width, self.playfield_height
            )));
        }
        if self.player_max_health == 0 {
            return Err(Error::InvalidTuning("player_max_health must be > 0".into()));
        }
        if !(self.player_speed >= 0.0) || !(self.player_fire_cooldown_ms >= 0.0) {
            return Err(Error::InvalidTuning(
                "player speed and cooldown must be non-negative".into(),
            ));
        }
        let durations = [
            self.invincible_duration_ms,
            self.shield_duration_ms,
            self.reverse_duration_ms,
            self.speed_effect_duration_ms,
            self.fire_effect_duration_ms,
        ];
        if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::InvalidTuning("effect durations must be finite and >= 0".into()));
        }
        Ok(())
    }

    /// Horizontal range spawned entities are centred in
    /// Collapses to the centre line when the playfield is narrower than both margins
    pub fn spawn_x_range(&self) -> (f32, f32) {
        if self.playfield_width > 2.0 * SPAWN_MARGIN {
            (SPAWN_MARGIN, self.playfield_width - SPAWN_MARGIN)
        } else {
            let centre = self.playfield_width.max(0.0) / 2.0;
            (centre, centre)
        }
    }

    /// Damage dealt by a shielded hit (the shield halves it)
    pub fn shielded(amount: u32) -> u32 {
        amount / 2
    }
}
