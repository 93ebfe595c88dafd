//! NATS subjects.
//!
//! All engine subjects are prefixed with `engine.` to namespace within a
//! shared NATS cluster.

/// Root prefix for all engine NATS subjects.
pub const PREFIX: &str = "engine";

/// Spawn, despawn and state frames. Authority → replicas.
pub const REPLICATION: &str = "engine.replication";

/// Build a replication subject for a named session.
///
/// `engine.replication.<session>`
#[must_use]
pub fn replication_for(session: &str) -> String {
    format!("{REPLICATION}.{session}")
}
