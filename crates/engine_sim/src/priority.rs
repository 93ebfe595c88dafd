//! Priority-gated admission for expensive per-entity work.
//!
//! Every tracked entity owns an accumulator in `[0, threshold]`. Callers
//! feed it each tick through [`PriorityQueue::add_priority`] or
//! [`PriorityQueue::set_priority`]; [`PriorityQueue::update`] then admits
//! every entity whose accumulator reached the threshold and resets it to
//! zero. Closer entities accumulate faster and are therefore serviced more
//! often, but any entity with a positive rate is eventually admitted.

use std::collections::{BTreeMap, BTreeSet};

use engine_component::Entity;
use tracing::trace;

/// Relative slack when comparing an accumulator against the threshold, so
/// `n` additions of `threshold / n` admit on the `n`th tick despite f32
/// rounding.
const ADMISSION_TOLERANCE: f32 = 1e-5;

/// Per-entity priority accumulators and the set admitted on the last
/// [`PriorityQueue::update`].
#[derive(Debug, Clone)]
pub struct PriorityQueue {
    threshold: f32,
    accumulators: BTreeMap<Entity, f32>,
    admitted: BTreeSet<Entity>,
}

impl PriorityQueue {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            accumulators: BTreeMap::new(),
            admitted: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Add `amount` to the entity's accumulator, tracking it if needed.
    /// Negative amounts are ignored; the result saturates at the threshold.
    pub fn add_priority(&mut self, entity: Entity, amount: f32) {
        let threshold = self.threshold;
        let slot = self.accumulators.entry(entity).or_insert(0.0);
        if amount > 0.0 {
            *slot = (*slot + amount).min(threshold);
        }
    }

    /// Overwrite the entity's accumulator, tracking it if needed.
    pub fn set_priority(&mut self, entity: Entity, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value };
        self.accumulators
            .insert(entity, value.clamp(0.0, self.threshold));
    }

    /// Recompute the admitted set from the accumulators. Admitted entities
    /// restart from zero.
    pub fn update(&mut self) {
        self.admitted.clear();
        let cutoff = self.threshold * (1.0 - ADMISSION_TOLERANCE);
        for (&entity, accumulator) in &mut self.accumulators {
            if *accumulator >= cutoff {
                self.admitted.insert(entity);
                *accumulator = 0.0;
            }
        }
        trace!(
            tracked = self.accumulators.len(),
            admitted = self.admitted.len(),
            "priority update"
        );
    }

    /// Entities admitted by the last [`PriorityQueue::update`].
    #[must_use]
    pub fn admitted_entities(&self) -> &BTreeSet<Entity> {
        &self.admitted
    }

    #[must_use]
    pub fn is_admitted(&self, entity: Entity) -> bool {
        self.admitted.contains(&entity)
    }

    /// Current accumulator of a tracked entity.
    #[must_use]
    pub fn priority(&self, entity: Entity) -> Option<f32> {
        self.accumulators.get(&entity).copied()
    }

    /// Stop tracking an entity. Returns `true` if it was tracked.
    pub fn remove(&mut self, entity: Entity) -> bool {
        self.admitted.remove(&entity);
        self.accumulators.remove(&entity).is_some()
    }

    /// Stop tracking every entity for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.accumulators.retain(|&entity, _| keep(entity));
        let accumulators = &self.accumulators;
        self.admitted.retain(|entity| accumulators.contains_key(entity));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }
}
