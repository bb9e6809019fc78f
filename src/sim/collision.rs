//! Collision detection and resolution
//!
//! One pass per frame over the entity sets, in a fixed order so frames with
//! several simultaneous hits always resolve the same way:
//! 1. obstacles vs player bullets
//! 2. player vs obstacles (skipped while invincible)
//! 3. player vs enemy bullets (skipped while invincible)
//! 4. player vs pickups (always)

use super::entity::{Aabb, EnemyKind, EntityId, EntityKind, ObstacleKind, PickupKind};
use super::player::Player;
use super::registry::Registry;
use super::state::GameEvent;
use crate::Tuning;

/// Damage a collision with this obstacle deals to the player
pub fn contact_damage(kind: ObstacleKind, tuning: &Tuning) -> u32 {
    match kind {
        ObstacleKind::Enemy(EnemyKind::Rocket) => tuning.rocket_contact_damage,
        _ => tuning.contact_damage,
    }
}

fn live_bounds(registry: &Registry, index: fn(&Registry) -> &[EntityId]) -> Vec<(EntityId, Aabb)> {
    index(registry)
        .iter()
        .filter_map(|id| registry.get(*id))
        .filter(|e| e.alive)
        .map(|e| (e.id, e.bounds()))
        .collect()
}

/// Resolve every collision for this frame, appending the resulting events
pub fn resolve_collisions(
    registry: &mut Registry,
    player: &mut Player,
    now_ms: f64,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    obstacles_vs_bullets(registry, events);
    if !player.invincible.active {
        player_vs_obstacles(registry, player, tuning, events);
        player_vs_enemy_bullets(registry, player, tuning, events);
    }
    player_vs_pickups(registry, player, now_ms, tuning, events);
}

fn obstacles_vs_bullets(registry: &mut Registry, events: &mut Vec<GameEvent>) {
    let mut bullets = live_bounds(registry, Registry::player_bullets);
    let obstacles = live_bounds(registry, Registry::obstacles);

    for (obstacle_id, obstacle_box) in obstacles {
        let mut hits: u8 = 0;
        bullets.retain(|(bullet_id, bullet_box)| {
            if obstacle_box.overlaps(bullet_box) {
                registry.kill(*bullet_id);
                hits = hits.saturating_add(1);
                false
            } else {
                true
            }
        });
        if hits == 0 {
            continue;
        }

        let Some(obstacle) = registry.get_mut(obstacle_id) else {
            continue;
        };
        obstacle.hp = obstacle.hp.saturating_sub(hits);
        if obstacle.hp == 0 {
            obstacle.alive = false;
            if let Some(kind) = obstacle.obstacle_kind() {
                log::debug!("Obstacle {} ({:?}) destroyed", obstacle_id, kind);
                events.push(GameEvent::ObstacleDestroyed {
                    kind,
                    pos: obstacle.pos,
                });
            }
        }
    }
}

fn player_vs_obstacles(
    registry: &mut Registry,
    player: &mut Player,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    let player_box = player.bounds();
    for (id, obstacle_box) in live_bounds(registry, Registry::obstacles) {
        if !player_box.overlaps(&obstacle_box) {
            continue;
        }
        let Some(kind) = registry.get(id).and_then(|e| e.obstacle_kind()) else {
            continue;
        };
        registry.kill(id);
        let amount = player.take_damage(contact_damage(kind, tuning));
        events.push(GameEvent::PlayerDamaged {
            amount,
            health: player.health,
        });
    }
}

fn player_vs_enemy_bullets(
    registry: &mut Registry,
    player: &mut Player,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    let player_box = player.bounds();
    for (id, bullet_box) in live_bounds(registry, Registry::enemy_bullets) {
        if !player_box.overlaps(&bullet_box) {
            continue;
        }
        registry.kill(id);
        let amount = player.take_damage(tuning.enemy_bullet_damage);
        events.push(GameEvent::PlayerDamaged {
            amount,
            health: player.health,
        });
    }
}

fn player_vs_pickups(
    registry: &mut Registry,
    player: &mut Player,
    now_ms: f64,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
) {
    let player_box = player.bounds();
    for (id, pickup_box) in live_bounds(registry, Registry::pickups) {
        if !player_box.overlaps(&pickup_box) {
            continue;
        }
        let Some(entity) = registry.get(id) else {
            continue;
        };
        let pos = entity.pos;
        let EntityKind::Pickup(kind) = entity.kind else {
            continue;
        };
        registry.kill(id);
        match kind {
            PickupKind::PowerUp(power) => player.apply_power_up(power, now_ms, tuning),
            PickupKind::PowerDown(debuff) => player.apply_power_down(debuff, now_ms, tuning),
        }
        log::debug!("Collected {:?}", kind);
        events.push(GameEvent::PickupCollected { kind, pos });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, Owner, PowerUpKind};
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup() -> (Registry, Player, Tuning, Pcg32) {
        let tuning = Tuning::default();
        (Registry::new(), Player::new(&tuning), tuning, Pcg32::seed_from_u64(1))
    }

    fn add_enemy(registry: &mut Registry, rng: &mut Pcg32, kind: EnemyKind, pos: Vec2) -> EntityId {
        let id = registry.next_entity_id();
        let mut enemy = Entity::enemy(id, kind, pos.x, 0.0, rng);
        enemy.pos = pos;
        registry.insert(enemy)
    }

    fn add_bullet(registry: &mut Registry, owner: Owner, pos: Vec2) -> EntityId {
        let id = registry.next_entity_id();
        registry.insert(Entity::bullet(id, owner, pos))
    }

    #[test]
    fn test_obstacle_hit_by_two_bullets_destroyed_once() {
        let (mut registry, mut player, tuning, mut rng) = setup();
        let enemy = add_enemy(&mut registry, &mut rng, EnemyKind::Basic, Vec2::new(300.0, 200.0));
        let b1 = add_bullet(&mut registry, Owner::Player, Vec2::new(295.0, 210.0));
        let b2 = add_bullet(&mut registry, Owner::Player, Vec2::new(305.0, 210.0));

        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);

        let destroyed = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ObstacleDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 1);
        assert!(!registry.is_alive(enemy));
        assert!(!registry.is_alive(b1));
        assert!(!registry.is_alive(b2));
    }

    #[test]
    fn test_tank_survives_single_bullet() {
        let (mut registry, mut player, tuning, mut rng) = setup();
        let tank = add_enemy(&mut registry, &mut rng, EnemyKind::Tank, Vec2::new(300.0, 200.0));
        add_bullet(&mut registry, Owner::Player, Vec2::new(300.0, 210.0));

        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);
        assert!(events.is_empty());
        assert!(registry.is_alive(tank));
        assert_eq!(registry.get(tank).unwrap().hp, 2);
    }

    #[test]
    fn test_bullet_consumed_by_first_obstacle_only() {
        let (mut registry, mut player, tuning, mut rng) = setup();
        let first = add_enemy(&mut registry, &mut rng, EnemyKind::Basic, Vec2::new(300.0, 200.0));
        let second = add_enemy(&mut registry, &mut rng, EnemyKind::Basic, Vec2::new(330.0, 200.0));
        // Overlaps both enemies
        add_bullet(&mut registry, Owner::Player, Vec2::new(315.0, 200.0));

        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);
        assert!(!registry.is_alive(first));
        assert!(registry.is_alive(second));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_player_contact_damage_and_shield() {
        let (mut registry, mut player, tuning, mut rng) = setup();
        player.apply_power_up(PowerUpKind::Shield, 0.0, &tuning);
        add_enemy(&mut registry, &mut rng, EnemyKind::Basic, player.pos);
        add_enemy(&mut registry, &mut rng, EnemyKind::Basic, player.pos);

        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);
        let amounts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::PlayerDamaged { amount, .. } => Some(*amount),
                _ => None,
            })
            .collect();
        assert_eq!(amounts, vec![10, 20]);
        assert_eq!(player.health, 70);
        assert!(!player.shield.active);
    }

    #[test]
    fn test_invincible_player_ignores_hits_but_collects() {
        let (mut registry, mut player, tuning, mut rng) = setup();
        player.apply_power_up(PowerUpKind::Invincibility, 0.0, &tuning);
        let enemy = add_enemy(&mut registry, &mut rng, EnemyKind::Basic, player.pos);
        let bullet = add_bullet(&mut registry, Owner::Enemy, player.pos);
        let id = registry.next_entity_id();
        registry.insert(Entity::pickup(
            id,
            PickupKind::PowerUp(PowerUpKind::SpeedBoost),
            player.pos,
        ));

        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);
        assert_eq!(player.health, player.max_health);
        assert!(registry.is_alive(enemy));
        assert!(registry.is_alive(bullet));
        assert!(!registry.is_alive(id));
        assert!(matches!(events.as_slice(), [GameEvent::PickupCollected { .. }]));
        assert_eq!(player.speed, player.base_speed * 1.5);
    }

    #[test]
    fn test_enemy_bullet_damage() {
        let (mut registry, mut player, tuning, _) = setup();
        let bullet = add_bullet(&mut registry, Owner::Enemy, player.pos);
        let mut events = Vec::new();
        resolve_collisions(&mut registry, &mut player, 0.0, &tuning, &mut events);
        assert_eq!(player.health, 90);
        assert!(!registry.is_alive(bullet));
    }

    #[test]
    fn test_rocket_contact_damage() {
        let tuning = Tuning::default();
        assert_eq!(contact_damage(ObstacleKind::Enemy(EnemyKind::Rocket), &tuning), 30);
        assert_eq!(contact_damage(ObstacleKind::Meteor, &tuning), 20);
    }
}
