//! Core [`Component`] trait and the wire identifier of a component kind.
//!
//! A component kind travels as a single byte in every serialized frame, so
//! the kind value is part of the wire contract: encoder and decoder must
//! agree on it exactly the way they agree on field order.

use serde::{Deserialize, Serialize};

/// Wire identifier of a component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKind(pub u8);

impl ComponentKind {
    /// Returns the raw wire byte.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentKind({})", self.0)
    }
}

/// The core component trait.
///
/// Components are plain data records attached to entities by composition.
/// `Default` provides the baseline value both ends of a replicated link
/// start from before any delta has been applied.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, ComponentKind};
///
/// #[derive(Debug, Clone, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     const KIND: ComponentKind = ComponentKind(42);
///
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {
    /// The wire identifier of this component kind.
    const KIND: ComponentKind;

    /// A human-readable name for this component type.
    fn type_name() -> &'static str;
}
