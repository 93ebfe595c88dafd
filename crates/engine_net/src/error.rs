//! Network-layer error types.

use engine_component::{ComponentKind, Entity};

/// Errors that can occur while encoding, decoding or transporting frames.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// A cursor write or read ran past the end of its buffer.
    #[error("out of space: needed {needed} bytes, {remaining} remaining")]
    OutOfSpace { needed: usize, remaining: usize },

    /// The frame bytes do not follow the wire format.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame referenced an entity this side does not know.
    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    /// A frame referenced a component kind with no registered serializer.
    #[error("unknown component kind {0}")]
    UnknownComponentKind(u8),

    /// The entity exists but lacks the component the payload targets.
    #[error("{entity} has no {kind}")]
    MissingComponent { entity: Entity, kind: ComponentKind },

    /// Failed to encode a control message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a control message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// NATS subscription error.
    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    /// NATS publish error.
    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),

    /// NATS connection error.
    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    /// A required NATS header was missing or unreadable.
    #[error("missing NATS header: {0}")]
    MissingHeader(String),
}
