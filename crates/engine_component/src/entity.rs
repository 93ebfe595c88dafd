//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u32` identifier with no inherent data. The
//! same value is used as the entity's network id on the wire.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers and carry no data of their own. Components
/// are attached to entities to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the identifier as an index into dense arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates entity IDs, recycling released ones.
///
/// Released IDs are handed out again lowest-first so that the sparse arrays
/// indexed by entity stay compact.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u32,
    free: Vec<u32>,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1 (0 is reserved for [`Entity::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            free: Vec::new(),
        }
    }

    /// Allocates an entity ID, reusing a released one if available.
    pub fn allocate(&mut self) -> Entity {
        if let Some(id) = self.free.pop() {
            return Entity(id);
        }
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }

    /// Returns an ID to the pool.
    ///
    /// Releasing an ID that was never allocated, or releasing it twice, is
    /// ignored.
    pub fn release(&mut self, entity: Entity) {
        if !entity.is_valid() || entity.0 >= self.next_id || self.free.contains(&entity.0) {
            return;
        }
        self.free.push(entity.0);
        // Keep the smallest id at the end so `pop` hands it out first.
        self.free.sort_unstable_by(|a, b| b.cmp(a));
    }

    /// Returns `true` if the entity is allocated and not released.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        entity.is_valid() && entity.0 < self.next_id && !self.free.contains(&entity.0)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.next_id - 1 - self.free.len() as u32
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let e = Entity::from_raw(42);
        assert_eq!(e.id(), 42);
        assert_eq!(e.index(), 42);
        assert!(e.is_valid());
    }

    #[test]
    fn test_entity_invalid() {
        assert!(!Entity::INVALID.is_valid());
        assert_eq!(Entity::INVALID.id(), 0);
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        let e3 = alloc.allocate();
        assert_eq!(e1.id(), 1);
        assert_eq!(e2.id(), 2);
        assert_eq!(e3.id(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_allocator_recycles_lowest_first() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<Entity> = (0..4).map(|_| alloc.allocate()).collect();
        alloc.release(ids[2]);
        alloc.release(ids[0]);
        alloc.release(ids[0]);
        assert_eq!(alloc.count(), 2);
        assert_eq!(alloc.allocate(), ids[0]);
        assert_eq!(alloc.allocate(), ids[2]);
        assert_eq!(alloc.allocate().id(), 5);
    }

    #[test]
    fn test_is_alive_tracks_release() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        assert!(alloc.is_alive(e));
        alloc.release(e);
        assert!(!alloc.is_alive(e));
        assert!(!alloc.is_alive(Entity::from_raw(7)));
    }

    #[test]
    fn test_release_unknown_is_ignored() {
        let mut alloc = EntityAllocator::new();
        alloc.release(Entity::from_raw(9));
        alloc.release(Entity::INVALID);
        assert_eq!(alloc.count(), 0);
        assert_eq!(alloc.allocate().id(), 1);
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = Entity::from_raw(999);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: Entity = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}
