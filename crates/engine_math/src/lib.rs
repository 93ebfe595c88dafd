//! # engine_math
//!
//! Math types for the replicated world. Re-exports [`glam`] for linear
//! algebra and defines the [`Transform3D`] component.

pub mod transform;

// Re-export glam types for convenience.
pub use glam::{Mat4, Quat, Vec3, Vec4};

pub use transform::Transform3D;
