//! Authoritative entity storage
//!
//! Each entity is owned exactly once, in `entities`. The typed indices hold
//! ids only and are kept in the same (ascending id) order, so iteration
//! through any of them is deterministic.

use std::collections::BTreeMap;

use super::entity::{Entity, EntityId, EntityKind, Owner};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    obstacles: Vec<EntityId>,
    player_bullets: Vec<EntityId>,
    enemy_bullets: Vec<EntityId>,
    pickups: Vec<EntityId>,
    next_id: EntityId,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert an entity built with an id from `next_entity_id`
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        // Ids are monotonic, so pushing keeps every index sorted
        match entity.kind {
            EntityKind::Obstacle(_) => self.obstacles.push(id),
            EntityKind::Bullet(Owner::Player) => self.player_bullets.push(id),
            EntityKind::Bullet(Owner::Enemy) => self.enemy_bullets.push(id),
            EntityKind::Pickup(_) => self.pickups.push(id),
        }
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Mark an entity dead; it is removed on the next `purge_dead`
    pub fn kill(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.alive = false;
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| e.alive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn obstacles(&self) -> &[EntityId] {
        &self.obstacles
    }

    pub fn player_bullets(&self) -> &[EntityId] {
        &self.player_bullets
    }

    pub fn enemy_bullets(&self) -> &[EntityId] {
        &self.enemy_bullets
    }

    pub fn pickups(&self) -> &[EntityId] {
        &self.pickups
    }

    /// Number of live obstacles
    pub fn live_obstacles(&self) -> usize {
        self.obstacles.iter().filter(|id| self.is_alive(**id)).count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop dead entities from storage and every index. Returns how many were removed.
    pub fn purge_dead(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, e| e.alive);
        let entities = &self.entities;
        for index in [
            &mut self.obstacles,
            &mut self.player_bullets,
            &mut self.enemy_bullets,
            &mut self.pickups,
        ] {
            index.retain(|id| entities.contains_key(id));
        }
        before - self.entities.len()
    }

    /// Remove everything. Ids keep counting up so stale ids never alias new entities.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.obstacles.clear();
        self.player_bullets.clear();
        self.enemy_bullets.clear();
        self.pickups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{PickupKind, PowerUpKind};
    use glam::Vec2;

    #[test]
    fn test_insert_routes_to_index() {
        let mut registry = Registry::new();
        let a = registry.next_entity_id();
        registry.insert(Entity::bullet(a, Owner::Player, Vec2::ZERO));
        let b = registry.next_entity_id();
        registry.insert(Entity::bullet(b, Owner::Enemy, Vec2::ZERO));
        let c = registry.next_entity_id();
        registry.insert(Entity::pickup(
            c,
            PickupKind::PowerUp(PowerUpKind::Shield),
            Vec2::ZERO,
        ));

        assert_eq!(registry.player_bullets(), &[a]);
        assert_eq!(registry.enemy_bullets(), &[b]);
        assert_eq!(registry.pickups(), &[c]);
        assert!(registry.obstacles().is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_purge_removes_from_indices() {
        let mut registry = Registry::new();
        let ids: Vec<_> = (0..3)
            .map(|_| {
                let id = registry.next_entity_id();
                registry.insert(Entity::bullet(id, Owner::Player, Vec2::ZERO))
            })
            .collect();
        registry.kill(ids[1]);
        assert_eq!(registry.purge_dead(), 1);
        assert_eq!(registry.player_bullets(), &[ids[0], ids[2]]);
        assert!(registry.get(ids[1]).is_none());
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let mut registry = Registry::new();
        let first = registry.next_entity_id();
        registry.insert(Entity::bullet(first, Owner::Player, Vec2::ZERO));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.next_entity_id() > first);
    }
}
