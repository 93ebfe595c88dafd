//! Sparse-set component storage.
//!
//! A [`SparseSet`] keeps components densely packed for iteration while
//! answering "does this entity have the component" with a single array
//! lookup. The sparse array is indexed by [`Entity::index`].

use crate::entity::Entity;

/// Dense component storage with O(1) membership, lookup and removal.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    /// `sparse[entity]` is the position of the entity in `dense`.
    sparse: Vec<Option<u32>>,
    /// Entity IDs in dense order. `entities[i]` owns `dense[i]`.
    entities: Vec<Entity>,
    dense: Vec<T>,
}

impl<T> SparseSet<T> {
    /// Create a new, empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Returns the number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if no entity has this component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns `true` if `entity` has this component.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        self.sparse
            .get(entity.index())
            .copied()
            .flatten()
            .map(|slot| slot as usize)
    }

    /// Insert or replace the component for `entity`, returning the previous
    /// value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(slot) = self.slot(entity) {
            return Some(std::mem::replace(&mut self.dense[slot], value));
        }
        if self.sparse.len() <= entity.index() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(self.dense.len() as u32);
        self.entities.push(entity);
        self.dense.push(value);
        None
    }

    /// Remove the component for `entity`.
    ///
    /// The last element is swapped into the vacated slot, so dense order is
    /// not preserved.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index()] = None;
        let last = self.dense.len() - 1;
        if slot != last {
            let moved = self.entities[last];
            self.sparse[moved.index()] = Some(slot as u32);
        }
        self.entities.swap_remove(slot);
        Some(self.dense.swap_remove(slot))
    }

    /// Get a reference to the component of `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    /// Get a mutable reference to the component of `entity`.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.dense[slot])
    }

    /// Get the component of `entity`, inserting the value produced by `init`
    /// if it is missing.
    pub fn get_or_insert_with(&mut self, entity: Entity, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.slot(entity) {
            Some(slot) => slot,
            None => {
                self.insert(entity, init());
                self.dense.len() - 1
            }
        };
        &mut self.dense[slot]
    }

    /// Entities that have this component, in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterate `(entity, component)` pairs mutably in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Remove every component.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.dense.clear();
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(id: u32) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_insert_and_get() {
        let mut set = SparseSet::new();
        assert!(set.insert(e(5), 1.5f32).is_none());
        assert!(set.contains(e(5)));
        assert!(!set.contains(e(4)));
        assert!(!set.contains(e(500)));
        assert_eq!(set.get(e(5)), Some(&1.5));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let mut set = SparseSet::new();
        set.insert(e(1), "a");
        assert_eq!(set.insert(e(1), "b"), Some("a"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(e(1)), Some(&"b"));
    }

    #[test]
    fn test_remove_swaps_last_into_slot() {
        let mut set = SparseSet::new();
        set.insert(e(1), 10);
        set.insert(e(2), 20);
        set.insert(e(3), 30);

        assert_eq!(set.remove(e(1)), Some(10));
        assert!(!set.contains(e(1)));
        assert_eq!(set.get(e(3)), Some(&30));
        assert_eq!(set.get(e(2)), Some(&20));
        assert_eq!(set.entities(), &[e(3), e(2)]);
        assert_eq!(set.remove(e(1)), None);
    }

    #[test]
    fn test_remove_last() {
        let mut set = SparseSet::new();
        set.insert(e(1), 10);
        set.insert(e(2), 20);
        assert_eq!(set.remove(e(2)), Some(20));
        assert_eq!(set.get(e(1)), Some(&10));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut set = SparseSet::new();
        *set.get_or_insert_with(e(4), || 1) += 1;
        *set.get_or_insert_with(e(4), || 100) += 1;
        assert_eq!(set.get(e(4)), Some(&3));
    }

    #[test]
    fn test_iter_mut_and_clear() {
        let mut set = SparseSet::new();
        set.insert(e(1), 1);
        set.insert(e(2), 2);
        for (_, v) in set.iter_mut() {
            *v *= 10;
        }
        let collected: Vec<_> = set.iter().map(|(ent, v)| (ent.id(), *v)).collect();
        assert_eq!(collected, vec![(1, 10), (2, 20)]);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(e(1)));
    }
}
