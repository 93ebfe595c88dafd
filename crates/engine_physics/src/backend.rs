//! The physics-engine boundary.
//!
//! Replication never simulates: it pushes received state into the engine
//! through [`PhysicsBackend`] and reads the engine's results back out.
//! [`BodySet`] is a minimal in-memory engine that integrates velocities and
//! honours kinematic poses, with no collision or constraint solving.

use engine_math::{Quat, Vec3};
use tracing::{trace, warn};

use crate::rigid_body::{BodyHandle, BodyType};

/// Public state of a body inside the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub body_type: BodyType,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// Setters and getters for the authoritative body state of a physics engine.
///
/// Calls with an unknown handle are ignored.
pub trait PhysicsBackend {
    fn set_translation(&mut self, body: BodyHandle, position: Vec3);
    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat);
    fn set_linvel(&mut self, body: BodyHandle, velocity: Vec3);
    fn set_angvel(&mut self, body: BodyHandle, velocity: Vec3);

    /// Pose a kinematic body should reach on the next step.
    fn set_next_kinematic_pose(&mut self, body: BodyHandle, position: Vec3, rotation: Quat);

    /// Current state of a body, if it exists.
    fn body_state(&self, body: BodyHandle) -> Option<BodyState>;
}

#[derive(Debug, Clone)]
struct Body {
    state: BodyState,
    next_kinematic_pose: Option<(Vec3, Quat)>,
}

#[derive(Debug, Clone, Default)]
struct BodySlot {
    generation: u32,
    body: Option<Body>,
}

/// In-memory physics backend.
///
/// Slots of removed bodies are reused; each reuse bumps the slot's
/// generation.
#[derive(Debug, Default)]
pub struct BodySet {
    slots: Vec<BodySlot>,
    free: Vec<u32>,
    live: usize,
}

impl BodySet {
    /// Create an empty body set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a body at rest and return its handle.
    ///
    /// Returns the default (empty) handle if every slot index is taken.
    pub fn create_body(&mut self, body_type: BodyType, position: Vec3, rotation: Quat) -> BodyHandle {
        let body = Body {
            state: BodyState {
                body_type,
                position,
                rotation,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            },
            next_kinematic_pose: None,
        };
        // Slot 0 is never handed out so the default handle means "none".
        if self.slots.is_empty() {
            self.slots.push(BodySlot::default());
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let Ok(index) = u32::try_from(self.slots.len()) else {
                    warn!(live = self.live, "body set is full");
                    return BodyHandle::default();
                };
                self.slots.push(BodySlot::default());
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1).max(1);
        slot.body = Some(body);
        self.live += 1;
        BodyHandle::new(index, slot.generation)
    }

    /// Remove a body. Returns `true` if it existed.
    pub fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(slot) = self.live_slot_mut(body) else {
            return false;
        };
        slot.body = None;
        self.free.push(body.index);
        self.live -= 1;
        true
    }

    /// Number of slots allocated, live or free.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if there are no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every body by `dt` seconds.
    ///
    /// Dynamic bodies integrate their velocities; kinematic bodies jump to
    /// their pending pose; fixed bodies do not move.
    pub fn step(&mut self, dt: f32) {
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            let state = &mut body.state;
            match state.body_type {
                BodyType::Dynamic => {
                    state.position += state.linear_velocity * dt;
                    let spin = state.angular_velocity * dt;
                    if spin != Vec3::ZERO {
                        state.rotation = (Quat::from_scaled_axis(spin) * state.rotation).normalize();
                    }
                }
                BodyType::Kinematic => {
                    if let Some((position, rotation)) = body.next_kinematic_pose.take() {
                        state.position = position;
                        state.rotation = rotation;
                    }
                }
                BodyType::Fixed => {}
            }
        }
    }

    fn live_slot_mut(&mut self, body: BodyHandle) -> Option<&mut BodySlot> {
        self.slots
            .get_mut(body.index as usize)
            .filter(|slot| slot.generation == body.generation && slot.body.is_some())
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut Body> {
        let found = self.live_slot_mut(body).and_then(|slot| slot.body.as_mut());
        if found.is_none() {
            trace!(%body, "ignoring update for unknown body");
        }
        found
    }
}

impl PhysicsBackend for BodySet {
    fn set_translation(&mut self, body: BodyHandle, position: Vec3) {
        if let Some(found) = self.body_mut(body) {
            found.state.position = position;
        }
    }

    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(found) = self.body_mut(body) {
            found.state.rotation = rotation;
        }
    }

    fn set_linvel(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(found) = self.body_mut(body) {
            found.state.linear_velocity = velocity;
        }
    }

    fn set_angvel(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(found) = self.body_mut(body) {
            found.state.angular_velocity = velocity;
        }
    }

    fn set_next_kinematic_pose(&mut self, body: BodyHandle, position: Vec3, rotation: Quat) {
        if let Some(found) = self.body_mut(body) {
            found.next_kinematic_pose = Some((position, rotation));
        }
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.slots
            .get(body.index as usize)
            .filter(|slot| slot.generation == body.generation)
            .and_then(|slot| slot.body.as_ref())
            .map(|found| found.state)
    }
}
