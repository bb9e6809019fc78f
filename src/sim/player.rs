//! The player's ship
//!
//! Movement, rate-limited firing, and the power-up/power-down effect
//! state machine. The collision resolver is the only caller of
//! `take_damage`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Aabb, PowerDownKind, PowerUpKind};
use crate::Tuning;
use crate::consts::*;

/// Remaining shots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ammo {
    #[default]
    Unlimited,
    Limited(u32),
}

impl Ammo {
    pub fn is_empty(&self) -> bool {
        matches!(self, Ammo::Limited(0))
    }

    /// Spend one shot (floor 0)
    fn consume(&mut self) {
        if let Ammo::Limited(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    /// Remaining count, `None` when unlimited
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Ammo::Unlimited => None,
            Ammo::Limited(n) => Some(*n),
        }
    }
}

/// A status effect that switches off a fixed time after its last activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedFlag {
    pub active: bool,
    pub since_ms: f64,
    pub duration_ms: f64,
}

impl TimedFlag {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            active: false,
            since_ms: 0.0,
            duration_ms,
        }
    }

    /// Switch on, or refresh the duration if already on
    pub fn activate(&mut self, now_ms: f64) {
        self.active = true;
        self.since_ms = now_ms;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Returns true if the flag expired during this call
    pub fn expire(&mut self, now_ms: f64) -> bool {
        if self.active && now_ms - self.since_ms > self.duration_ms {
            self.active = false;
            return true;
        }
        false
    }
}

/// The player's ship and run statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Centre position
    pub pos: Vec2,
    pub size: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub score: u64,
    pub base_speed: f32,
    pub speed: f32,
    pub base_cooldown_ms: f64,
    pub cooldown_ms: f64,
    pub last_shot_ms: Option<f64>,
    pub ammo: Ammo,
    pub bullets_fired: u32,
    pub invincible: TimedFlag,
    pub shield: TimedFlag,
    pub reverse_controls: TimedFlag,
    /// Speed differs from base while active
    pub speed_effect: TimedFlag,
    /// Cooldown differs from base while active
    pub fire_effect: TimedFlag,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(
                tuning.playfield_width / 2.0,
                tuning.playfield_height - PLAYER_START_BOTTOM_OFFSET,
            ),
            size: Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            health: tuning.player_max_health,
            max_health: tuning.player_max_health,
            score: 0,
            base_speed: tuning.player_speed,
            speed: tuning.player_speed,
            base_cooldown_ms: tuning.player_fire_cooldown_ms,
            cooldown_ms: tuning.player_fire_cooldown_ms,
            last_shot_ms: None,
            ammo: Ammo::Unlimited,
            bullets_fired: 0,
            invincible: TimedFlag::new(tuning.invincible_duration_ms),
            shield: TimedFlag::new(tuning.shield_duration_ms),
            reverse_controls: TimedFlag::new(tuning.reverse_duration_ms),
            speed_effect: TimedFlag::new(tuning.speed_effect_duration_ms),
            fire_effect: TimedFlag::new(tuning.fire_effect_duration_ms),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Replace the base fire cooldown (story challenge modifier)
    pub fn set_base_cooldown(&mut self, cooldown_ms: f64) {
        self.base_cooldown_ms = cooldown_ms;
        if !self.fire_effect.active {
            self.cooldown_ms = cooldown_ms;
        }
    }

    /// Move by held directional intent, clamped to the playfield
    pub fn steer(&mut self, direction: Vec2, dt: f32, playfield: Vec2) {
        let direction = if self.reverse_controls.active {
            -direction
        } else {
            direction
        };
        self.pos += direction.normalize_or_zero() * self.speed * dt;

        let half = self.size / 2.0;
        self.pos = self.pos.clamp(half, (playfield - half).max(half));
    }

    /// Attempt a shot. Returns the muzzle position if the shot was accepted.
    pub fn try_fire(&mut self, now_ms: f64) -> Option<Vec2> {
        if self.ammo.is_empty() {
            return None;
        }
        if let Some(last) = self.last_shot_ms {
            if now_ms - last < self.cooldown_ms {
                return None;
            }
        }
        self.last_shot_ms = Some(now_ms);
        self.bullets_fired += 1;
        self.ammo.consume();
        Some(Vec2::new(self.pos.x, self.pos.y - self.size.y / 2.0))
    }

    /// Apply a hit. A live shield halves it and is consumed. Returns damage taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let dealt = if self.shield.active {
            self.shield.deactivate();
            Tuning::shielded(amount)
        } else {
            amount
        };
        self.health = self.health.saturating_sub(dealt);
        dealt
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn apply_power_up(&mut self, kind: PowerUpKind, now_ms: f64, tuning: &Tuning) {
        match kind {
            PowerUpKind::Health => self.heal(tuning.health_pickup_amount),
            PowerUpKind::SpeedBoost => {
                self.speed = self.base_speed * tuning.speed_boost_multiplier;
                self.speed_effect.activate(now_ms);
            }
            PowerUpKind::Invincibility => self.invincible.activate(now_ms),
            PowerUpKind::RapidFire => {
                self.cooldown_ms = self.base_cooldown_ms * tuning.rapid_fire_factor;
                self.fire_effect.activate(now_ms);
            }
            PowerUpKind::Shield => self.shield.activate(now_ms),
        }
    }

    pub fn apply_power_down(&mut self, kind: PowerDownKind, now_ms: f64, tuning: &Tuning) {
        match kind {
            PowerDownKind::Slow => {
                self.speed = self.base_speed * tuning.slow_multiplier;
                self.speed_effect.activate(now_ms);
            }
            PowerDownKind::WeakBullets => {
                self.cooldown_ms = self.base_cooldown_ms * tuning.weak_bullets_factor;
                self.fire_effect.activate(now_ms);
            }
            PowerDownKind::ReverseControls => self.reverse_controls.activate(now_ms),
        }
    }

    /// Expire timed effects, reverting stats to base
    pub fn update_effects(&mut self, now_ms: f64) {
        if self.invincible.expire(now_ms) {
            log::debug!("Invincibility expired");
        }
        if self.shield.expire(now_ms) {
            log::debug!("Shield expired");
        }
        if self.reverse_controls.expire(now_ms) {
            log::debug!("Reverse controls expired");
        }
        if self.speed_effect.expire(now_ms) {
            self.speed = self.base_speed;
        }
        if self.fire_effect.expire(now_ms) {
            self.cooldown_ms = self.base_cooldown_ms;
        }
    }
}
