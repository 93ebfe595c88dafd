//! Replication messages carried over NATS.
//!
//! Lifecycle messages are MessagePack payloads. State frames travel as raw
//! wire bytes (see [`crate::frame`]). Both share one subject and are told
//! apart by the [`headers::MSG_TYPE`] header.

use async_nats::HeaderMap;
use engine_component::{ComponentKind, Entity};
use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// The authority created a networked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpawned {
    /// The entity id used on the wire.
    pub entity: Entity,
    /// Networked components the entity carries.
    pub components: Vec<ComponentKind>,
    /// Whether the entity's rigid body, if any, is simulated rather than
    /// kinematically driven.
    pub dynamic_body: bool,
}

/// The authority destroyed a networked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDespawned {
    pub entity: Entity,
}

/// NATS header keys.
pub mod headers {
    /// One of the `*_MSG_TYPE` values below.
    pub const MSG_TYPE: &str = "msg-type";
    /// The tick a frame was encoded on.
    pub const TICK_ID: &str = "tick-id";
}

/// Header value for [`EntitySpawned`].
pub const ENTITY_SPAWNED_MSG_TYPE: &str = "entity_spawned";

/// Header value for [`EntityDespawned`].
pub const ENTITY_DESPAWNED_MSG_TYPE: &str = "entity_despawned";

/// Header value for a raw state frame.
pub const FRAME_MSG_TYPE: &str = "frame";

/// Anything a replica can receive on the replication subject.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationMessage {
    Spawned(EntitySpawned),
    Despawned(EntityDespawned),
    Frame { tick_id: u32, bytes: Vec<u8> },
}

fn header<'a>(headers: Option<&'a HeaderMap>, key: &str) -> Result<&'a str, NetError> {
    headers
        .and_then(|h| h.get(key))
        .map(|v| v.as_str())
        .ok_or_else(|| NetError::MissingHeader(key.to_string()))
}

impl ReplicationMessage {
    /// Header value identifying this message.
    #[must_use]
    pub fn msg_type(&self) -> &'static str {
        match self {
            Self::Spawned(_) => ENTITY_SPAWNED_MSG_TYPE,
            Self::Despawned(_) => ENTITY_DESPAWNED_MSG_TYPE,
            Self::Frame { .. } => FRAME_MSG_TYPE,
        }
    }

    /// Interpret a received NATS message.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MissingHeader`] if the type or tick headers are
    /// absent or unknown, and [`NetError::Decode`] for a bad lifecycle
    /// payload.
    pub fn parse(headers: Option<&HeaderMap>, payload: &[u8]) -> Result<Self, NetError> {
        match header(headers, headers::MSG_TYPE)? {
            ENTITY_SPAWNED_MSG_TYPE => Ok(Self::Spawned(crate::codec::decode(payload)?)),
            ENTITY_DESPAWNED_MSG_TYPE => Ok(Self::Despawned(crate::codec::decode(payload)?)),
            FRAME_MSG_TYPE => {
                let raw = header(headers, headers::TICK_ID)?;
                let tick_id = raw
                    .parse()
                    .map_err(|_| NetError::MissingHeader(format!("{}={raw}", headers::TICK_ID)))?;
                Ok(Self::Frame {
                    tick_id,
                    bytes: payload.to_vec(),
                })
            }
            other => Err(NetError::MissingHeader(format!(
                "{}={other}",
                headers::MSG_TYPE
            ))),
        }
    }

    /// Headers to publish this message with.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(headers::MSG_TYPE, self.msg_type());
        if let Self::Frame { tick_id, .. } = self {
            map.insert(headers::TICK_ID, tick_id.to_string().as_str());
        }
        map
    }

    /// Payload bytes to publish this message with.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if a lifecycle message fails to encode.
    pub fn payload(&self) -> Result<Vec<u8>, NetError> {
        match self {
            Self::Spawned(msg) => crate::codec::encode(msg),
            Self::Despawned(msg) => crate::codec::encode(msg),
            Self::Frame { bytes, .. } => Ok(bytes.clone()),
        }
    }
}
