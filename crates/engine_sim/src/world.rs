//! The world: every piece of per-entity state, owned in one place.
//!
//! Components live in [`SparseSet`]s indexed by entity id, so a capability
//! check is a membership test. The world also owns the physics backend, the
//! dirty-transform set and, on a replica, the map from wire ids to local
//! entities.

use std::collections::{BTreeSet, HashMap};

use engine_component::{Component, ComponentKind, Entity, EntityAllocator, SparseSet};
use engine_math::{Quat, Transform3D, Vec3};
use engine_net::EntityResolver;
use engine_physics::systems::sync_from_backend;
use engine_physics::{BodyHandle, BodySet, BodyType, RigidBody};
use tracing::debug;

use crate::avatar::{AvatarRig, IkTargets};

/// Component kinds that are replicated, in frame write order.
pub const NETWORKED_KINDS: [ComponentKind; 3] =
    [Transform3D::KIND, RigidBody::KIND, IkTargets::KIND];

/// Entities, their components and the physics backend of one process.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityAllocator,
    pub transforms: SparseSet<Transform3D>,
    pub bodies: SparseSet<RigidBody>,
    pub ik_targets: SparseSet<IkTargets>,
    pub rigs: SparseSet<AvatarRig>,
    pub physics: BodySet,
    visible: BTreeSet<Entity>,
    dirty_transforms: BTreeSet<Entity>,
    remote_to_local: HashMap<Entity, Entity>,
    local_to_remote: HashMap<Entity, Entity>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new local entity.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.entities.allocate();
        debug!(%entity, "spawned entity");
        entity
    }

    /// Allocate a local entity mirroring the authority's `remote` entity, or
    /// return the existing one.
    pub fn spawn_replica(&mut self, remote: Entity) -> Entity {
        if let Some(&local) = self.remote_to_local.get(&remote) {
            return local;
        }
        let local = self.entities.allocate();
        self.remote_to_local.insert(remote, local);
        self.local_to_remote.insert(local, remote);
        debug!(%remote, %local, "spawned replica");
        local
    }

    /// Destroy an entity with all its components and bookkeeping.
    /// Returns `false` if it was not alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        for kind in NETWORKED_KINDS {
            self.remove_component(entity, kind);
        }
        self.remove_component(entity, AvatarRig::KIND);
        self.visible.remove(&entity);
        if let Some(remote) = self.local_to_remote.remove(&entity) {
            self.remote_to_local.remove(&remote);
        }
        self.entities.release(entity);
        debug!(%entity, "despawned entity");
        true
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    #[must_use]
    pub fn entity_count(&self) -> u32 {
        self.entities.count()
    }

    /// Local entity mirroring a wire id.
    #[must_use]
    pub fn local_entity(&self, remote: Entity) -> Option<Entity> {
        self.remote_to_local.get(&remote).copied()
    }

    /// Wire id a replicated local entity mirrors.
    #[must_use]
    pub fn remote_entity(&self, local: Entity) -> Option<Entity> {
        self.local_to_remote.get(&local).copied()
    }

    pub fn insert_transform(&mut self, entity: Entity, transform: Transform3D) {
        self.transforms.insert(entity, transform);
        self.dirty_transforms.insert(entity);
    }

    /// Create a backend body and attach its component. Replaces (and
    /// removes from the backend) any body the entity already had.
    pub fn insert_rigid_body(
        &mut self,
        entity: Entity,
        body_type: BodyType,
        position: Vec3,
        rotation: Quat,
    ) -> BodyHandle {
        let handle = self.physics.create_body(body_type, position, rotation);
        if let Some(old) = self
            .bodies
            .insert(entity, RigidBody::new(handle, body_type, position, rotation))
        {
            self.physics.remove_body(old.body);
        }
        handle
    }

    pub fn insert_ik_targets(&mut self, entity: Entity, targets: IkTargets) {
        self.ik_targets.insert(entity, targets);
    }

    pub fn insert_rig(&mut self, entity: Entity, rig: AvatarRig) {
        self.rigs.insert(entity, rig);
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) {
        if visible {
            self.visible.insert(entity);
        } else {
            self.visible.remove(&entity);
        }
    }

    #[must_use]
    pub fn is_visible(&self, entity: Entity) -> bool {
        self.visible.contains(&entity)
    }

    #[must_use]
    pub fn has_component(&self, entity: Entity, kind: ComponentKind) -> bool {
        match kind {
            Transform3D::KIND => self.transforms.contains(entity),
            RigidBody::KIND => self.bodies.contains(entity),
            IkTargets::KIND => self.ik_targets.contains(entity),
            AvatarRig::KIND => self.rigs.contains(entity),
            _ => false,
        }
    }

    /// Detach one component along with the state keyed on it: the backend
    /// body of a rigid body, the dirty flag of a transform. Returns `true`
    /// if the component was present.
    pub fn remove_component(&mut self, entity: Entity, kind: ComponentKind) -> bool {
        match kind {
            Transform3D::KIND => {
                self.dirty_transforms.remove(&entity);
                self.transforms.remove(entity).is_some()
            }
            RigidBody::KIND => match self.bodies.remove(entity) {
                Some(body) => {
                    self.physics.remove_body(body.body);
                    true
                }
                None => false,
            },
            IkTargets::KIND => self.ik_targets.remove(entity).is_some(),
            AvatarRig::KIND => self.rigs.remove(entity).is_some(),
            _ => false,
        }
    }

    /// Every entity carrying at least one replicated component, ascending.
    #[must_use]
    pub fn networked_entities(&self) -> BTreeSet<Entity> {
        self.transforms
            .entities()
            .iter()
            .chain(self.bodies.entities())
            .chain(self.ik_targets.entities())
            .copied()
            .collect()
    }

    /// Visible entities with both a rig and IK targets.
    #[must_use]
    pub fn avatar_candidates(&self) -> BTreeSet<Entity> {
        self.visible
            .iter()
            .copied()
            .filter(|&e| self.rigs.contains(e) && self.ik_targets.contains(e))
            .collect()
    }

    pub fn mark_transform_dirty(&mut self, entity: Entity) {
        self.dirty_transforms.insert(entity);
    }

    /// Entities whose transform changed since the last call.
    pub fn take_dirty_transforms(&mut self) -> BTreeSet<Entity> {
        std::mem::take(&mut self.dirty_transforms)
    }

    /// Advance the physics backend by `dt` and copy the result into the
    /// rigid-body components.
    pub fn step_physics(&mut self, dt: f32) {
        self.physics.step(dt);
        sync_from_backend(&mut self.bodies, &self.physics);
    }
}

impl EntityResolver for World {
    fn resolve(&self, remote: Entity) -> Option<Entity> {
        self.local_entity(remote)
    }
}

#[cfg(test)]
mod tests {
    use engine_physics::PhysicsBackend;

    use super::*;

    #[test]
    fn test_networked_entities_are_sorted_and_unique() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        let c = world.spawn();
        world.insert_ik_targets(c, IkTargets::default());
        world.insert_transform(a, Transform3D::IDENTITY);
        world.insert_rigid_body(a, BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY);
        world.insert_rig(b, AvatarRig::default());

        let networked: Vec<Entity> = world.networked_entities().into_iter().collect();
        assert_eq!(networked, vec![a, c]);
    }

    #[test]
    fn test_replica_mapping() {
        let mut world = World::new();
        let local = world.spawn_replica(Entity::from_raw(40));
        assert_eq!(world.spawn_replica(Entity::from_raw(40)), local);
        assert_eq!(world.resolve(Entity::from_raw(40)), Some(local));
        assert_eq!(world.remote_entity(local), Some(Entity::from_raw(40)));
        assert_eq!(world.resolve(local), None);
    }

    #[test]
    fn test_despawn_purges_everything() {
        let mut world = World::new();
        let e = world.spawn_replica(Entity::from_raw(3));
        world.insert_transform(e, Transform3D::IDENTITY);
        let body = world.insert_rigid_body(e, BodyType::Kinematic, Vec3::ONE, Quat::IDENTITY);
        world.insert_ik_targets(e, IkTargets::default());
        world.insert_rig(e, AvatarRig::default());
        world.set_visible(e, true);

        assert!(world.despawn(e));
        assert!(!world.despawn(e));
        assert!(!world.is_alive(e));
        assert!(world.networked_entities().is_empty());
        assert!(world.avatar_candidates().is_empty());
        assert!(world.take_dirty_transforms().is_empty());
        assert!(world.physics.body_state(body).is_none());
        assert_eq!(world.resolve(Entity::from_raw(3)), None);
    }

    #[test]
    fn test_remove_transform_clears_dirty_flag() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert_transform(e, Transform3D::IDENTITY);
        assert!(world.remove_component(e, Transform3D::KIND));
        assert!(!world.remove_component(e, Transform3D::KIND));
        assert!(world.take_dirty_transforms().is_empty());
    }

    #[test]
    fn test_take_dirty_transforms_drains() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert_transform(e, Transform3D::IDENTITY);
        assert_eq!(world.take_dirty_transforms().len(), 1);
        assert!(world.take_dirty_transforms().is_empty());
    }

    #[test]
    fn test_replacing_body_frees_old_handle() {
        let mut world = World::new();
        let e = world.spawn();
        let first = world.insert_rigid_body(e, BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY);
        let second = world.insert_rigid_body(e, BodyType::Kinematic, Vec3::ZERO, Quat::IDENTITY);
        assert_ne!(first, second);
        assert!(world.physics.body_state(first).is_none());
        assert_eq!(world.physics.len(), 1);
    }

    #[test]
    fn test_body_churn_reuses_backend_slots() {
        let mut world = World::new();
        for _ in 0..1_000 {
            let e = world.spawn();
            world.insert_rigid_body(e, BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY);
            world.insert_rigid_body(e, BodyType::Kinematic, Vec3::ONE, Quat::IDENTITY);
            assert!(world.despawn(e));
        }
        assert!(world.physics.is_empty());
        assert!(world.physics.slot_count() <= 3);
    }

    #[test]
    fn test_step_physics_syncs_components() {
        let mut world = World::new();
        let e = world.spawn();
        let body = world.insert_rigid_body(e, BodyType::Dynamic, Vec3::ZERO, Quat::IDENTITY);
        world.physics.set_linvel(body, Vec3::new(2.0, 0.0, 0.0));
        world.step_physics(0.5);
        assert!(
            world
                .bodies
                .get(e)
                .unwrap()
                .position
                .abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6)
        );
    }
}
