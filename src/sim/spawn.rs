//! Timer-driven spawning
//!
//! Timers accumulate simulated time and fire when the accumulated time
//! reaches the interval, carrying the remainder forward. The scheduler never
//! creates entities itself: it yields `SpawnIntent`s that the tick loop
//! materializes into the registry.

use glam::Vec2;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{EnemyKind, Owner, PickupKind, PowerDownKind, PowerUpKind};
use super::story::{Story, Wave};
use crate::Tuning;

/// A request to create an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnIntent {
    Enemy(EnemyKind),
    Meteor,
    Pickup(PickupKind),
    Bullet { owner: Owner, pos: Vec2 },
}

/// Fixed-interval timer. A disarmed timer never fires.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnTimer {
    interval_ms: Option<f64>,
    accumulated_ms: f64,
}

impl SpawnTimer {
    /// Arm with the given interval. Zero, negative or non-finite intervals disarm.
    pub fn new(interval_ms: f64) -> Self {
        let mut timer = Self::disarmed();
        timer.rearm(interval_ms);
        timer
    }

    pub fn disarmed() -> Self {
        Self {
            interval_ms: None,
            accumulated_ms: 0.0,
        }
    }

    /// Change the interval and restart the accumulation
    pub fn rearm(&mut self, interval_ms: f64) {
        self.accumulated_ms = 0.0;
        self.interval_ms = (interval_ms.is_finite() && interval_ms > 0.0).then_some(interval_ms);
        if self.interval_ms.is_none() {
            log::debug!("Spawn timer disarmed (interval {})", interval_ms);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval_ms.is_some()
    }

    pub fn interval_ms(&self) -> Option<f64> {
        self.interval_ms
    }

    /// Advance by `dt_ms`. Returns how many times the timer fired.
    pub fn advance(&mut self, dt_ms: f64) -> u32 {
        let Some(interval) = self.interval_ms else {
            return 0;
        };
        self.accumulated_ms += dt_ms;
        let mut fired = 0;
        while self.accumulated_ms >= interval {
            self.accumulated_ms -= interval;
            fired += 1;
        }
        fired
    }
}

/// What the scheduler is allowed to spawn this frame
#[derive(Debug, Clone, Copy)]
pub enum SpawnPolicy<'a> {
    /// Unlimited basic enemies and meteors
    Endless,
    /// Story wave quotas
    Wave {
        wave: &'a Wave,
        enemies_spawned: u32,
        meteors_spawned: u32,
    },
}

/// Enemy, meteor and pickup timers for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnScheduler {
    pub enemy: SpawnTimer,
    pub meteor: SpawnTimer,
    pub power_up: SpawnTimer,
    pub power_down: SpawnTimer,
}

impl SpawnScheduler {
    /// All timers disarmed (menus, end screens)
    pub fn disarmed() -> Self {
        Self::default()
    }

    pub fn endless(tuning: &Tuning) -> Self {
        Self {
            enemy: SpawnTimer::new(tuning.endless_enemy_interval_ms),
            meteor: SpawnTimer::new(tuning.meteor_interval_ms),
            power_up: SpawnTimer::disarmed(),
            power_down: SpawnTimer::disarmed(),
        }
    }

    pub fn story(story: &Story, first_wave: Option<&Wave>, tuning: &Tuning) -> Self {
        Self {
            enemy: first_wave.map_or_else(SpawnTimer::disarmed, |w| {
                SpawnTimer::new(f64::from(w.spawn_interval))
            }),
            meteor: SpawnTimer::new(tuning.meteor_interval_ms),
            power_up: SpawnTimer::new(f64::from(story.power_up_spawn_rate)),
            power_down: SpawnTimer::new(f64::from(story.power_down_spawn_rate)),
        }
    }

    /// Switch the enemy timer to a new wave's interval; other timers keep running
    pub fn rearm_for_wave(&mut self, wave: &Wave) {
        self.enemy.rearm(f64::from(wave.spawn_interval));
    }

    /// Advance every timer and collect the resulting spawn intents
    pub fn update(&mut self, dt_ms: f64, policy: SpawnPolicy, rng: &mut Pcg32) -> Vec<SpawnIntent> {
        let mut intents = Vec::new();
        let enemy_ticks = self.enemy.advance(dt_ms);
        let meteor_ticks = self.meteor.advance(dt_ms);

        match policy {
            SpawnPolicy::Endless => {
                intents.extend((0..enemy_ticks).map(|_| SpawnIntent::Enemy(EnemyKind::Basic)));
                intents.extend((0..meteor_ticks).map(|_| SpawnIntent::Meteor));
            }
            SpawnPolicy::Wave {
                wave,
                enemies_spawned,
                meteors_spawned,
            } => {
                let enemy_room = wave.enemy_count.saturating_sub(enemies_spawned);
                for _ in 0..enemy_ticks.min(enemy_room) {
                    match wave.enemy_types.choose(rng) {
                        Some(kind) => intents.push(SpawnIntent::Enemy(*kind)),
                        None => log::warn!("Wave has no enemy types, skipping spawn"),
                    }
                }
                let meteor_room = wave.meteor_count.saturating_sub(meteors_spawned);
                intents.extend((0..meteor_ticks.min(meteor_room)).map(|_| SpawnIntent::Meteor));
            }
        }

        for _ in 0..self.power_up.advance(dt_ms) {
            if let Some(kind) = PowerUpKind::ALL.choose(rng) {
                intents.push(SpawnIntent::Pickup(PickupKind::PowerUp(*kind)));
            }
        }
        for _ in 0..self.power_down.advance(dt_ms) {
            if let Some(kind) = PowerDownKind::ALL.choose(rng) {
                intents.push(SpawnIntent::Pickup(PickupKind::PowerDown(*kind)));
            }
        }

        intents
    }
}
