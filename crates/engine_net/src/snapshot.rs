//! Last-serialized snapshot table.
//!
//! Each serializer owns one [`SnapshotTable`] holding, per entity, the
//! component values as they were last put on the wire. Rows start at the
//! component's `Default`, which is the baseline a freshly spawned replica
//! holds too.
//!
//! Changes made while a triple is being encoded are journaled so that a
//! triple that did not fit in the frame can be undone with
//! [`SnapshotTable::rollback`]; a later frame then re-derives the same delta.

use engine_component::{Entity, SparseSet};

/// Per-entity copies of the last-serialized component values.
#[derive(Debug, Clone)]
pub struct SnapshotTable<C> {
    rows: SparseSet<C>,
    journal: Vec<(Entity, Option<C>)>,
}

impl<C: Clone + Default> SnapshotTable<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: SparseSet::new(),
            journal: Vec::new(),
        }
    }

    /// The snapshot row of `entity` for modification, created at the
    /// baseline if absent. The previous row is journaled.
    pub fn checkout(&mut self, entity: Entity) -> &mut C {
        self.journal.push((entity, self.rows.get(entity).cloned()));
        self.rows.get_or_insert_with(entity, C::default)
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.rows.get(entity)
    }

    /// Keep every change made since the last commit or rollback.
    pub fn commit(&mut self) {
        self.journal.clear();
    }

    /// Undo every change made since the last commit or rollback.
    pub fn rollback(&mut self) {
        while let Some((entity, previous)) = self.journal.pop() {
            match previous {
                Some(row) => {
                    self.rows.insert(entity, row);
                }
                None => {
                    self.rows.remove(entity);
                }
            }
        }
    }

    /// Drop the row of `entity`. Returns `true` if one existed.
    pub fn forget(&mut self, entity: Entity) -> bool {
        self.journal.retain(|(journaled, _)| *journaled != entity);
        self.rows.remove(entity).is_some()
    }

    /// Number of entities with a snapshot row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<C: Clone + Default> Default for SnapshotTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
