//! # engine_sim
//!
//! The replicated world and the per-tick work done on it.
//!
//! - [`world`]: entity and component storage, the explicit context object.
//! - [`replication`]: serializers for the replicated components.
//! - [`priority`]: accumulator-based admission for expensive work.
//! - [`avatar`] and [`ik`]: avatar components and IK solvers.
//! - [`camera`]: visibility and distance queries.
//! - [`tick`]: the tick driver tying it together.
//! - [`config`]: engine configuration.

pub mod avatar;
pub mod camera;
pub mod config;
pub mod ik;
pub mod priority;
pub mod replication;
pub mod tick;
pub mod world;

pub use avatar::{ArmChain, AvatarRig, Bone, IkTargets};
pub use camera::{CameraView, ViewQuery};
pub use config::{EngineConfig, PriorityConfig};
pub use priority::PriorityQueue;
pub use replication::world_codec;
pub use tick::TickDriver;
pub use world::World;
