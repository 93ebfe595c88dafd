//! # engine_physics
//!
//! The rigid-body side of the replicated world. The physics engine itself is
//! an external collaborator: this crate only defines the public pose and
//! velocity state the network layer reads and writes, and the
//! [`PhysicsBackend`] boundary through which that state reaches the engine.
//!
//! - [`RigidBody`]: replicated rigid-body component.
//! - [`PhysicsBackend`]: setters for authoritative body state.
//! - [`BodySet`]: in-memory backend used by the binary and in tests.
//! - [`systems`]: per-step pose synchronisation and kinematic interpolation.

pub mod backend;
pub mod rigid_body;
pub mod systems;

pub use backend::{BodySet, BodyState, PhysicsBackend};
pub use rigid_body::{BodyHandle, BodyType, RigidBody};
