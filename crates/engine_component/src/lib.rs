//! # engine_component
//!
//! The "C" in ECS: defines what a component is and how it is stored.
//!
//! This crate provides:
//!
//! - [`Component`] trait: the contract all replicated data must satisfy.
//! - [`ComponentKind`]: the one-byte wire identifier of a component type.
//! - [`Entity`]: lightweight `u32` entity identifiers.
//! - [`EntityAllocator`]: ID allocator with recycling.
//! - [`SparseSet`]: dense storage with O(1) membership tests.

pub mod component;
pub mod entity;
pub mod storage;

pub use component::{Component, ComponentKind};
pub use entity::{Entity, EntityAllocator};
pub use storage::SparseSet;
