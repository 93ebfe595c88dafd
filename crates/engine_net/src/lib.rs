//! # engine_net
//!
//! Delta replication wire protocol and its NATS transport.
//!
//! - [`cursor`]: fixed-capacity byte cursor with reserve/patch and rewind.
//! - [`mask`]: per-component change bitmask.
//! - [`field`]: typed field codecs with bitwise change detection.
//! - [`snapshot`]: last-serialized state per entity, with commit/rollback.
//! - [`serializer`]: the per-component serializer trait.
//! - [`frame`]: frame layout, encode and tolerant decode.
//! - [`messages`], [`codec`], [`subjects`], [`connection`]: NATS transport.

pub mod codec;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod field;
pub mod frame;
pub mod mask;
pub mod messages;
pub mod serializer;
pub mod snapshot;
pub mod subjects;

pub use connection::NatsConnection;
pub use cursor::ViewCursor;
pub use error::NetError;
pub use field::{Field, FieldValue};
pub use frame::{EntityResolver, FrameCodec, FrameReport, TripleFailure};
pub use mask::ChangeMask;
pub use messages::{EntityDespawned, EntitySpawned, ReplicationMessage};
pub use serializer::ComponentSerializer;
pub use snapshot::SnapshotTable;
