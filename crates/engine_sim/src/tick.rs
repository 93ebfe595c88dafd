//! The replication tick driver.
//!
//! An authority calls [`TickDriver::tick`] once per simulation step:
//!
//! 1. Feed the priority queue from the view (culled avatars freeze).
//! 2. Solve IK for the admitted avatars only.
//! 3. Encode the changed component state of every networked entity.
//!
//! A replica feeds received messages to [`TickDriver::receive`], which
//! mirrors spawns and despawns and applies frames.

use engine_component::{Component, ComponentKind, Entity};
use engine_math::{Quat, Transform3D, Vec3};
use engine_net::{EntityDespawned, EntitySpawned, FrameCodec, FrameReport, ReplicationMessage};
use engine_physics::systems::interpolate_kinematic_bodies;
use engine_physics::{BodyType, RigidBody};
use tracing::{debug, info, warn};

use crate::avatar::{AvatarRig, IkTargets};
use crate::camera::ViewQuery;
use crate::config::EngineConfig;
use crate::ik::solve_avatar;
use crate::priority::PriorityQueue;
use crate::replication::world_codec;
use crate::world::{NETWORKED_KINDS, World};

/// One process's replication loop: the world, the frame codec that
/// replicates it and the avatar scheduler.
#[derive(Debug)]
pub struct TickDriver {
    pub world: World,
    pub codec: FrameCodec<World>,
    pub queue: PriorityQueue,
    config: EngineConfig,
    tick_id: u32,
}

impl TickDriver {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            world: World::new(),
            codec: world_codec(config.max_frame_bytes),
            queue: PriorityQueue::new(config.priority.threshold),
            config,
            tick_id: 0,
        }
    }

    /// Id the next encoded frame will carry.
    #[must_use]
    pub fn tick_id(&self) -> u32 {
        self.tick_id
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one authoring step and return the encoded frame. Component
    /// updates that do not fit are left for later ticks. Returns `None` only
    /// if the configured frame size cannot hold a frame header.
    pub fn tick(&mut self, dt: f32, view: &dyn ViewQuery) -> Option<Vec<u8>> {
        let tick_id = self.tick_id;
        self.tick_id = self.tick_id.wrapping_add(1);

        let solved = self.update_avatars(dt, view);
        let entities = self.world.networked_entities();
        match self.codec.encode(tick_id, &self.world, entities.iter().copied()) {
            Ok(frame) => {
                debug!(tick_id, solved, entities = entities.len(), bytes = frame.len(), "tick");
                Some(frame)
            }
            Err(err) => {
                warn!(tick_id, error = %err, "dropping frame");
                None
            }
        }
    }

    /// Accumulate priorities from `view`, admit, and solve IK for the
    /// admitted avatars. Returns the number of avatars solved.
    pub fn update_avatars(&mut self, dt: f32, view: &dyn ViewQuery) -> usize {
        let candidates = self.world.avatar_candidates();
        self.queue.retain(|entity| candidates.contains(&entity));

        for &entity in &candidates {
            if view.is_culled(&self.world, entity) {
                self.queue.add_priority(entity, 0.0);
            } else {
                let rate = self
                    .config
                    .priority
                    .rate(view.squared_distance(&self.world, entity), dt);
                self.queue.add_priority(entity, rate);
            }
        }
        self.queue.update();

        let mut solved = 0;
        for &entity in self.queue.admitted_entities() {
            let (Some(targets), Some(rig)) = (
                self.world.ik_targets.get(entity),
                self.world.rigs.get_mut(entity),
            ) else {
                continue;
            };
            solve_avatar(rig, targets);
            solved += 1;
        }
        solved
    }

    /// Apply a received frame. Failures are reported, never fatal.
    pub fn apply_frame(&mut self, bytes: &[u8]) -> FrameReport {
        match self.codec.decode(bytes, &mut self.world) {
            Ok(report) => report,
            Err(err) => {
                warn!(bytes = bytes.len(), error = %err, "discarding frame");
                FrameReport {
                    truncated: Some(err),
                    ..FrameReport::default()
                }
            }
        }
    }

    /// Move kinematic bodies a fraction `alpha` toward their staged targets,
    /// then step the physics backend by one tick.
    pub fn physics_step(&mut self, alpha: f32) {
        let moved = interpolate_kinematic_bodies(&self.world.bodies, &mut self.world.physics, alpha);
        self.world.step_physics(self.config.tick_seconds());
        if moved > 0 {
            debug!(moved, alpha, "interpolated kinematic bodies");
        }
    }

    /// Mirror the authority's `remote` entity locally.
    pub fn spawn_replica(&mut self, remote: Entity) -> Entity {
        self.world.spawn_replica(remote)
    }

    /// Destroy an entity and purge its snapshots and priority record.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.codec.forget(entity);
        self.queue.remove(entity);
        self.world.despawn(entity)
    }

    /// Remove one component and purge the bookkeeping keyed on it.
    pub fn remove_component(&mut self, entity: Entity, kind: ComponentKind) -> bool {
        self.codec.forget_component(entity, kind);
        if kind == IkTargets::KIND || kind == AvatarRig::KIND {
            self.queue.remove(entity);
        }
        self.world.remove_component(entity, kind)
    }

    /// Lifecycle message announcing a local entity to replicas.
    #[must_use]
    pub fn spawn_message(&self, entity: Entity) -> Option<EntitySpawned> {
        if !self.world.is_alive(entity) {
            return None;
        }
        Some(EntitySpawned {
            entity,
            components: NETWORKED_KINDS
                .into_iter()
                .filter(|&kind| self.world.has_component(entity, kind))
                .collect(),
            dynamic_body: self.world.bodies.get(entity).is_some_and(RigidBody::is_dynamic),
        })
    }

    /// Handle one message from the authority. Returns the report if it was
    /// a frame.
    pub fn receive(&mut self, message: ReplicationMessage) -> Option<FrameReport> {
        match message {
            ReplicationMessage::Spawned(spawned) => {
                self.apply_spawn(&spawned);
                None
            }
            ReplicationMessage::Despawned(EntityDespawned { entity }) => {
                match self.world.local_entity(entity) {
                    Some(local) => {
                        self.despawn(local);
                        info!(remote = %entity, %local, "replica despawned");
                    }
                    None => warn!(remote = %entity, "despawn for unknown entity"),
                }
                None
            }
            ReplicationMessage::Frame { tick_id, bytes } => {
                let report = self.apply_frame(&bytes);
                if report.tick_id != tick_id && report.truncated.is_none() {
                    warn!(header = tick_id, frame = report.tick_id, "tick id mismatch");
                }
                Some(report)
            }
        }
    }

    /// Create the local mirror of a spawned entity with default components.
    /// Avatars also get a rig and become visible so IK runs on them.
    /// A repeated spawn for an already mirrored entity is ignored.
    pub fn apply_spawn(&mut self, spawned: &EntitySpawned) -> Entity {
        if let Some(local) = self.world.local_entity(spawned.entity) {
            debug!(remote = %spawned.entity, %local, "already mirrored");
            return local;
        }
        let local = self.world.spawn_replica(spawned.entity);
        for &kind in &spawned.components {
            match kind {
                Transform3D::KIND => self.world.insert_transform(local, Transform3D::IDENTITY),
                RigidBody::KIND => {
                    let body_type = if spawned.dynamic_body {
                        BodyType::Dynamic
                    } else {
                        BodyType::Kinematic
                    };
                    self.world
                        .insert_rigid_body(local, body_type, Vec3::ZERO, Quat::IDENTITY);
                }
                IkTargets::KIND => {
                    self.world.insert_ik_targets(local, IkTargets::default());
                    self.world.insert_rig(local, AvatarRig::default());
                    self.world.set_visible(local, true);
                }
                other => warn!(remote = %spawned.entity, kind = %other, "ignoring unknown component kind"),
            }
        }
        info!(remote = %spawned.entity, %local, components = spawned.components.len(), "replica spawned");
        local
    }
}
