//! Serializers for the replicated components.
//!
//! Each serializer owns the last-serialized snapshot of its component and
//! lists the component's fields in wire order; bit `i` of the change mask
//! refers to the `i`th field below.

use engine_component::{Component, ComponentKind, Entity};
use engine_math::{Quat, Transform3D, Vec3};
use engine_net::cursor::ViewCursor;
use engine_net::serializer::{read_mask, write_masked};
use engine_net::{ComponentSerializer, Field, FrameCodec, NetError, SnapshotTable};
use engine_physics::{PhysicsBackend, RigidBody};

use crate::avatar::IkTargets;
use crate::world::World;

fn missing<C: Component>(entity: Entity) -> NetError {
    NetError::MissingComponent {
        entity,
        kind: C::KIND,
    }
}

// ── Transform ───────────────────────────────────────────────────────────────

const TRANSFORM_POSITION: Field<Transform3D, Vec3> =
    Field::new("position", |t| t.position, |t, v| t.position = v);
const TRANSFORM_ROTATION: Field<Transform3D, Quat> =
    Field::new("rotation", |t| t.rotation, |t, v| t.rotation = v);
const TRANSFORM_SCALE: Field<Transform3D, Vec3> =
    Field::new("scale", |t| t.scale, |t, v| t.scale = v);

const TRANSFORM_WIDTHS: [usize; 3] = [
    TRANSFORM_POSITION.width(),
    TRANSFORM_ROTATION.width(),
    TRANSFORM_SCALE.width(),
];

/// Replicates [`Transform3D`]. Applied transforms are marked dirty.
#[derive(Debug, Default)]
pub struct TransformSerializer {
    snapshots: SnapshotTable<Transform3D>,
}

impl ComponentSerializer<World> for TransformSerializer {
    fn kind(&self) -> ComponentKind {
        Transform3D::KIND
    }

    fn name(&self) -> &'static str {
        Transform3D::type_name()
    }

    fn field_widths(&self) -> &'static [usize] {
        &TRANSFORM_WIDTHS
    }

    fn write(&mut self, cursor: &mut ViewCursor, world: &World, entity: Entity) -> Result<bool, NetError> {
        let Some(live) = world.transforms.get(entity) else {
            return Ok(false);
        };
        let last = self.snapshots.checkout(entity);
        write_masked(cursor, TRANSFORM_WIDTHS.len(), |cursor, mask| {
            mask.record(TRANSFORM_POSITION.write(cursor, live, last)?);
            mask.record(TRANSFORM_ROTATION.write(cursor, live, last)?);
            mask.record(TRANSFORM_SCALE.write(cursor, live, last)?);
            Ok(())
        })
    }

    fn read(&self, cursor: &mut ViewCursor, world: &mut World, entity: Entity) -> Result<(), NetError> {
        let mask = read_mask(cursor, &TRANSFORM_WIDTHS)?;
        let live = world
            .transforms
            .get_mut(entity)
            .ok_or_else(|| missing::<Transform3D>(entity))?;
        if mask.is_set(0) {
            TRANSFORM_POSITION.read(cursor, live)?;
        }
        if mask.is_set(1) {
            TRANSFORM_ROTATION.read(cursor, live)?;
        }
        if mask.is_set(2) {
            TRANSFORM_SCALE.read(cursor, live)?;
        }
        world.mark_transform_dirty(entity);
        Ok(())
    }

    fn commit(&mut self) {
        self.snapshots.commit();
    }

    fn rollback(&mut self) {
        self.snapshots.rollback();
    }

    fn forget(&mut self, entity: Entity) {
        self.snapshots.forget(entity);
    }
}

// ── Rigid body ──────────────────────────────────────────────────────────────

const BODY_POSITION: Field<RigidBody, Vec3> =
    Field::new("position", |b| b.position, |b, v| b.position = v);
const BODY_ROTATION: Field<RigidBody, Quat> =
    Field::new("rotation", |b| b.rotation, |b, v| b.rotation = v);
const BODY_LINEAR_VELOCITY: Field<RigidBody, Vec3> = Field::new(
    "linear_velocity",
    |b| b.linear_velocity,
    |b, v| b.linear_velocity = v,
);
const BODY_ANGULAR_VELOCITY: Field<RigidBody, Vec3> = Field::new(
    "angular_velocity",
    |b| b.angular_velocity,
    |b, v| b.angular_velocity = v,
);

const BODY_WIDTHS: [usize; 4] = [
    BODY_POSITION.width(),
    BODY_ROTATION.width(),
    BODY_LINEAR_VELOCITY.width(),
    BODY_ANGULAR_VELOCITY.width(),
];

/// Replicates the public pose and velocity of a [`RigidBody`].
///
/// On read, a dynamic body has each received value pushed into the physics
/// backend. A kinematic or fixed body is never set directly: its received
/// pose becomes the kinematic target it is interpolated toward.
#[derive(Debug, Default)]
pub struct RigidBodySerializer {
    snapshots: SnapshotTable<RigidBody>,
}

impl ComponentSerializer<World> for RigidBodySerializer {
    fn kind(&self) -> ComponentKind {
        RigidBody::KIND
    }

    fn name(&self) -> &'static str {
        RigidBody::type_name()
    }

    fn field_widths(&self) -> &'static [usize] {
        &BODY_WIDTHS
    }

    fn write(&mut self, cursor: &mut ViewCursor, world: &World, entity: Entity) -> Result<bool, NetError> {
        let Some(live) = world.bodies.get(entity) else {
            return Ok(false);
        };
        let last = self.snapshots.checkout(entity);
        write_masked(cursor, BODY_WIDTHS.len(), |cursor, mask| {
            mask.record(BODY_POSITION.write(cursor, live, last)?);
            mask.record(BODY_ROTATION.write(cursor, live, last)?);
            mask.record(BODY_LINEAR_VELOCITY.write(cursor, live, last)?);
            mask.record(BODY_ANGULAR_VELOCITY.write(cursor, live, last)?);
            Ok(())
        })
    }

    fn read(&self, cursor: &mut ViewCursor, world: &mut World, entity: Entity) -> Result<(), NetError> {
        let mask = read_mask(cursor, &BODY_WIDTHS)?;
        let body = world
            .bodies
            .get_mut(entity)
            .ok_or_else(|| missing::<RigidBody>(entity))?;
        let physics = &mut world.physics;
        let dynamic = body.is_dynamic();

        if mask.is_set(0) {
            let position = BODY_POSITION.read(cursor, body)?;
            if dynamic {
                physics.set_translation(body.body, position);
            }
        }
        if mask.is_set(1) {
            let rotation = BODY_ROTATION.read(cursor, body)?;
            if dynamic {
                physics.set_rotation(body.body, rotation);
            }
        }
        if mask.is_set(2) {
            let velocity = BODY_LINEAR_VELOCITY.read(cursor, body)?;
            if dynamic {
                physics.set_linvel(body.body, velocity);
            }
        }
        if mask.is_set(3) {
            let velocity = BODY_ANGULAR_VELOCITY.read(cursor, body)?;
            if dynamic {
                physics.set_angvel(body.body, velocity);
            }
        }
        if !dynamic {
            body.stage_kinematic_target();
        }
        Ok(())
    }

    fn commit(&mut self) {
        self.snapshots.commit();
    }

    fn rollback(&mut self) {
        self.snapshots.rollback();
    }

    fn forget(&mut self, entity: Entity) {
        self.snapshots.forget(entity);
    }
}

// ── IK targets ──────────────────────────────────────────────────────────────

const IK_HEAD: Field<IkTargets, Vec3> =
    Field::new("head_position", |t| t.head_position, |t, v| t.head_position = v);
const IK_LEFT_POSITION: Field<IkTargets, Vec3> = Field::new(
    "left_hand_position",
    |t| t.left_hand_position,
    |t, v| t.left_hand_position = v,
);
const IK_LEFT_ROTATION: Field<IkTargets, Quat> = Field::new(
    "left_hand_rotation",
    |t| t.left_hand_rotation,
    |t, v| t.left_hand_rotation = v,
);
const IK_RIGHT_POSITION: Field<IkTargets, Vec3> = Field::new(
    "right_hand_position",
    |t| t.right_hand_position,
    |t, v| t.right_hand_position = v,
);
const IK_RIGHT_ROTATION: Field<IkTargets, Quat> = Field::new(
    "right_hand_rotation",
    |t| t.right_hand_rotation,
    |t, v| t.right_hand_rotation = v,
);
const IK_HAND_WEIGHT: Field<IkTargets, f32> =
    Field::new("hand_weight", |t| t.hand_weight, |t, v| t.hand_weight = v);

const IK_WIDTHS: [usize; 6] = [
    IK_HEAD.width(),
    IK_LEFT_POSITION.width(),
    IK_LEFT_ROTATION.width(),
    IK_RIGHT_POSITION.width(),
    IK_RIGHT_ROTATION.width(),
    IK_HAND_WEIGHT.width(),
];

/// Replicates [`IkTargets`].
#[derive(Debug, Default)]
pub struct IkTargetsSerializer {
    snapshots: SnapshotTable<IkTargets>,
}

impl ComponentSerializer<World> for IkTargetsSerializer {
    fn kind(&self) -> ComponentKind {
        IkTargets::KIND
    }

    fn name(&self) -> &'static str {
        IkTargets::type_name()
    }

    fn field_widths(&self) -> &'static [usize] {
        &IK_WIDTHS
    }

    fn write(&mut self, cursor: &mut ViewCursor, world: &World, entity: Entity) -> Result<bool, NetError> {
        let Some(live) = world.ik_targets.get(entity) else {
            return Ok(false);
        };
        let last = self.snapshots.checkout(entity);
        write_masked(cursor, IK_WIDTHS.len(), |cursor, mask| {
            mask.record(IK_HEAD.write(cursor, live, last)?);
            mask.record(IK_LEFT_POSITION.write(cursor, live, last)?);
            mask.record(IK_LEFT_ROTATION.write(cursor, live, last)?);
            mask.record(IK_RIGHT_POSITION.write(cursor, live, last)?);
            mask.record(IK_RIGHT_ROTATION.write(cursor, live, last)?);
            mask.record(IK_HAND_WEIGHT.write(cursor, live, last)?);
            Ok(())
        })
    }

    fn read(&self, cursor: &mut ViewCursor, world: &mut World, entity: Entity) -> Result<(), NetError> {
        let mask = read_mask(cursor, &IK_WIDTHS)?;
        let live = world
            .ik_targets
            .get_mut(entity)
            .ok_or_else(|| missing::<IkTargets>(entity))?;
        if mask.is_set(0) {
            IK_HEAD.read(cursor, live)?;
        }
        if mask.is_set(1) {
            IK_LEFT_POSITION.read(cursor, live)?;
        }
        if mask.is_set(2) {
            IK_LEFT_ROTATION.read(cursor, live)?;
        }
        if mask.is_set(3) {
            IK_RIGHT_POSITION.read(cursor, live)?;
        }
        if mask.is_set(4) {
            IK_RIGHT_ROTATION.read(cursor, live)?;
        }
        if mask.is_set(5) {
            IK_HAND_WEIGHT.read(cursor, live)?;
        }
        Ok(())
    }

    fn commit(&mut self) {
        self.snapshots.commit();
    }

    fn rollback(&mut self) {
        self.snapshots.rollback();
    }

    fn forget(&mut self, entity: Entity) {
        self.snapshots.forget(entity);
    }
}

/// A frame codec with every replicated component registered, in
/// [`crate::world::NETWORKED_KINDS`] order.
#[must_use]
pub fn world_codec(capacity: usize) -> FrameCodec<World> {
    FrameCodec::new(capacity)
        .with(Box::new(TransformSerializer::default()))
        .with(Box::new(RigidBodySerializer::default()))
        .with(Box::new(IkTargetsSerializer::default()))
}
