//! Frame encoding and decoding.
//!
//! A frame carries the non-empty component deltas of one tick that fit in
//! its capacity; the rest wait for the next frame:
//!
//! ```text
//! frame   := tick_id:u32  count:u16  triple{count}
//! triple  := entity:u32  kind:u8  len:u16  payload[len]
//! payload := change mask, then the changed field values in bit order
//! ```
//!
//! The payload length lets the decoder step over a triple it cannot apply,
//! so one bad triple never costs the rest of the frame.

use std::collections::BTreeSet;

use engine_component::{ComponentKind, Entity};
use tracing::{debug, warn};

use crate::cursor::ViewCursor;
use crate::error::NetError;
use crate::serializer::ComponentSerializer;

/// Size of the frame header (tick id and triple count).
pub const FRAME_HEADER_LEN: usize = 6;

/// Size of a triple header (entity, kind and payload length).
pub const TRIPLE_HEADER_LEN: usize = 7;

/// Maps entity ids found on the wire to local entities.
pub trait EntityResolver {
    fn resolve(&self, remote: Entity) -> Option<Entity>;
}

/// A triple that could not be applied.
#[derive(Debug)]
pub struct TripleFailure {
    /// Entity id as it appeared on the wire.
    pub entity: Entity,
    pub kind: u8,
    pub error: NetError,
}

/// Outcome of decoding one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub tick_id: u32,
    /// Triples applied to the world.
    pub applied: usize,
    /// Triples skipped, with the reason.
    pub failures: Vec<TripleFailure>,
    /// Set when decoding stopped early because the remaining bytes could not
    /// be split into triples.
    pub truncated: Option<NetError>,
}

impl FrameReport {
    /// Returns `true` if every triple was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.truncated.is_none()
    }
}

fn truncated(err: NetError, what: &str) -> NetError {
    match err {
        NetError::OutOfSpace { needed, remaining } => NetError::MalformedFrame(format!(
            "truncated {what}: needed {needed} bytes, {remaining} remaining"
        )),
        other => other,
    }
}

/// Registry of component serializers plus the frame layout around them.
pub struct FrameCodec<W: ?Sized> {
    serializers: Vec<Box<dyn ComponentSerializer<W>>>,
    capacity: usize,
}

impl<W: EntityResolver + ?Sized> FrameCodec<W> {
    /// A codec producing frames of at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            serializers: Vec::new(),
            capacity,
        }
    }

    /// Register a serializer. Components are written in registration order;
    /// a serializer for an already registered kind replaces the old one.
    pub fn register(&mut self, serializer: Box<dyn ComponentSerializer<W>>) {
        let kind = serializer.kind();
        if let Some(existing) = self.serializers.iter_mut().find(|s| s.kind() == kind) {
            warn!(kind = kind.id(), name = serializer.name(), "replacing serializer");
            *existing = serializer;
        } else {
            debug!(kind = kind.id(), name = serializer.name(), "registered serializer");
            self.serializers.push(serializer);
        }
    }

    /// Builder form of [`FrameCodec::register`].
    #[must_use]
    pub fn with(mut self, serializer: Box<dyn ComponentSerializer<W>>) -> Self {
        self.register(serializer);
        self
    }

    /// Registered component kinds, in write order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.serializers.iter().map(|s| s.kind()).collect()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Encode the changed component state of `entities`.
    ///
    /// Entities are visited in ascending id order and each at most once.
    /// Every triple that fits is committed to its serializer's snapshot as
    /// it is written. A triple that does not fit is erased and its snapshot
    /// rolled back, so its delta is sent by a later frame; the frame itself
    /// still carries everything that did fit.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the capacity cannot hold even the
    /// frame header.
    pub fn encode<I>(&mut self, tick_id: u32, world: &W, entities: I) -> Result<Vec<u8>, NetError>
    where
        I: IntoIterator<Item = Entity>,
    {
        let entities: BTreeSet<Entity> = entities.into_iter().collect();
        let mut cursor = ViewCursor::with_capacity(self.capacity);
        cursor.write_u32(tick_id)?;
        let count_slot = cursor.reserve(2)?;

        let mut count: u16 = 0;
        let mut deferred = 0usize;

        'entities: for &entity in &entities {
            for serializer in &mut self.serializers {
                if count == u16::MAX {
                    deferred += 1;
                    break 'entities;
                }
                let mark = cursor.mark();
                match Self::write_triple(&mut cursor, serializer.as_mut(), world, entity) {
                    Ok(true) => {
                        serializer.commit();
                        count += 1;
                    }
                    Ok(false) => {
                        cursor.rewind(mark);
                        serializer.commit();
                    }
                    Err(err) => {
                        cursor.rewind(mark);
                        serializer.rollback();
                        match err {
                            NetError::OutOfSpace { needed, remaining } => {
                                if count == 0 {
                                    warn!(
                                        tick_id,
                                        %entity,
                                        component = serializer.name(),
                                        needed,
                                        remaining,
                                        "component update does not fit in an empty frame"
                                    );
                                }
                                deferred += 1;
                            }
                            err => {
                                warn!(
                                    tick_id,
                                    %entity,
                                    component = serializer.name(),
                                    error = %err,
                                    "skipping component update"
                                );
                            }
                        }
                    }
                }
            }
        }

        cursor.patch(&count_slot, &count.to_le_bytes())?;
        debug!(
            tick_id,
            entities = entities.len(),
            components = count,
            deferred,
            bytes = cursor.offset(),
            "encoded frame"
        );
        Ok(cursor.finish())
    }

    fn write_triple<S: ComponentSerializer<W> + ?Sized>(
        cursor: &mut ViewCursor,
        serializer: &mut S,
        world: &W,
        entity: Entity,
    ) -> Result<bool, NetError> {
        cursor.write_u32(entity.id())?;
        cursor.write_u8(serializer.kind().id())?;
        let len_slot = cursor.reserve(2)?;
        let start = cursor.offset();

        if !serializer.write(cursor, world, entity)? {
            return Ok(false);
        }
        let len = u16::try_from(cursor.offset() - start).map_err(|_| {
            NetError::MalformedFrame(format!(
                "{} payload of {entity} exceeds {} bytes",
                serializer.name(),
                u16::MAX
            ))
        })?;
        cursor.patch(&len_slot, &len.to_le_bytes())?;
        Ok(true)
    }

    /// Decode `bytes` and apply every triple to `world`.
    ///
    /// Triples that fail (unknown entity or kind, malformed payload) are
    /// recorded in the report and skipped; the rest of the frame is still
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MalformedFrame`] only if the frame header itself
    /// is truncated.
    pub fn decode(&self, bytes: &[u8], world: &mut W) -> Result<FrameReport, NetError> {
        let mut cursor = ViewCursor::from_bytes(bytes);
        let tick_id = cursor.read_u32().map_err(|e| truncated(e, "frame header"))?;
        let count = cursor.read_u16().map_err(|e| truncated(e, "frame header"))?;
        let mut report = FrameReport {
            tick_id,
            ..FrameReport::default()
        };

        for index in 0..count {
            let (entity, kind, mut payload) = match Self::split_triple(&mut cursor) {
                Ok(triple) => triple,
                Err(err) => {
                    warn!(tick_id, index, count, error = %err, "frame truncated");
                    report.truncated = Some(err);
                    break;
                }
            };
            match self.apply_triple(&mut payload, world, entity, kind) {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    warn!(tick_id, %entity, kind, %error, "skipping component update");
                    report.failures.push(TripleFailure { entity, kind, error });
                }
            }
        }

        if report.truncated.is_none() && cursor.remaining() > 0 {
            warn!(tick_id, trailing = cursor.remaining(), "ignoring trailing frame bytes");
        }
        debug!(
            tick_id,
            applied = report.applied,
            failed = report.failures.len(),
            "decoded frame"
        );
        Ok(report)
    }

    fn split_triple(cursor: &mut ViewCursor) -> Result<(Entity, u8, ViewCursor), NetError> {
        let entity = Entity::from_raw(cursor.read_u32().map_err(|e| truncated(e, "triple header"))?);
        let kind = cursor.read_u8().map_err(|e| truncated(e, "triple header"))?;
        let len = cursor.read_u16().map_err(|e| truncated(e, "triple header"))?;
        let payload = cursor
            .sub_cursor(usize::from(len))
            .map_err(|e| truncated(e, "component payload"))?;
        Ok((entity, kind, payload))
    }

    fn apply_triple(
        &self,
        payload: &mut ViewCursor,
        world: &mut W,
        remote: Entity,
        kind: u8,
    ) -> Result<(), NetError> {
        let serializer = self
            .serializers
            .iter()
            .find(|s| s.kind().id() == kind)
            .ok_or(NetError::UnknownComponentKind(kind))?;
        let local = world.resolve(remote).ok_or(NetError::UnknownEntity(remote))?;
        serializer.read(payload, world, local)
    }

    /// Drop snapshot bookkeeping for `entity` in every serializer.
    pub fn forget(&mut self, entity: Entity) {
        for serializer in &mut self.serializers {
            serializer.forget(entity);
        }
    }

    /// Drop snapshot bookkeeping for one component of `entity`.
    pub fn forget_component(&mut self, entity: Entity, kind: ComponentKind) {
        if let Some(serializer) = self.serializers.iter_mut().find(|s| s.kind() == kind) {
            serializer.forget(entity);
        }
    }
}

impl<W: ?Sized> std::fmt::Debug for FrameCodec<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field(
                "serializers",
                &self.serializers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use engine_component::SparseSet;

    use super::*;
    use crate::field::Field;
    use crate::serializer::{read_mask, write_masked};
    use crate::snapshot::SnapshotTable;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Gauge {
        level: f32,
        peak: f32,
    }

    const LEVEL: Field<Gauge, f32> = Field::new("level", |g| g.level, |g, v| g.level = v);
    const PEAK: Field<Gauge, f32> = Field::new("peak", |g| g.peak, |g, v| g.peak = v);

    #[derive(Default)]
    struct Dial {
        gauges: SparseSet<Gauge>,
        remote: HashMap<Entity, Entity>,
    }

    impl EntityResolver for Dial {
        fn resolve(&self, remote: Entity) -> Option<Entity> {
            self.remote.get(&remote).copied()
        }
    }

    #[derive(Default)]
    struct GaugeSerializer {
        snapshots: SnapshotTable<Gauge>,
    }

    impl ComponentSerializer<Dial> for GaugeSerializer {
        fn kind(&self) -> ComponentKind {
            ComponentKind(9)
        }

        fn name(&self) -> &'static str {
            "Gauge"
        }

        fn field_widths(&self) -> &'static [usize] {
            &[4, 4]
        }

        fn write(&mut self, cursor: &mut ViewCursor, world: &Dial, entity: Entity) -> Result<bool, NetError> {
            let Some(live) = world.gauges.get(entity) else {
                return Ok(false);
            };
            let last = self.snapshots.checkout(entity);
            write_masked(cursor, 2, |cursor, mask| {
                mask.record(LEVEL.write(cursor, live, last)?);
                mask.record(PEAK.write(cursor, live, last)?);
                Ok(())
            })
        }

        fn read(&self, cursor: &mut ViewCursor, world: &mut Dial, entity: Entity) -> Result<(), NetError> {
            let mask = read_mask(cursor, self.field_widths())?;
            let live = world.gauges.get_mut(entity).ok_or(NetError::MissingComponent {
                entity,
                kind: self.kind(),
            })?;
            if mask.is_set(0) {
                LEVEL.read(cursor, live)?;
            }
            if mask.is_set(1) {
                PEAK.read(cursor, live)?;
            }
            Ok(())
        }

        fn commit(&mut self) {
            self.snapshots.commit();
        }

        fn rollback(&mut self) {
            self.snapshots.rollback();
        }

        fn forget(&mut self, entity: Entity) {
            self.snapshots.forget(entity);
        }
    }

    fn codec(capacity: usize) -> FrameCodec<Dial> {
        FrameCodec::new(capacity).with(Box::new(GaugeSerializer::default()))
    }

    fn dial(ids: &[u32]) -> Dial {
        let mut dial = Dial::default();
        for &id in ids {
            let e = Entity::from_raw(id);
            dial.gauges.insert(e, Gauge::default());
            dial.remote.insert(e, e);
        }
        dial
    }

    #[test]
    fn test_empty_frame_is_header_only() {
        let mut codec = codec(64);
        let sender = dial(&[1]);
        let bytes = codec.encode(7, &sender, [Entity::from_raw(1)]).unwrap();
        assert_eq!(bytes, vec![7, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_changed_fields_round_trip() {
        let mut codec = codec(64);
        let mut sender = dial(&[1, 2]);
        sender.gauges.get_mut(Entity::from_raw(2)).unwrap().peak = 3.0;

        let bytes = codec
            .encode(1, &sender, [Entity::from_raw(2), Entity::from_raw(1)])
            .unwrap();
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + TRIPLE_HEADER_LEN + 1 + 4);

        let mut receiver = dial(&[1, 2]);
        let report = codec.decode(&bytes, &mut receiver).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.applied, 1);
        assert_eq!(
            receiver.gauges.get(Entity::from_raw(2)),
            Some(&Gauge { level: 0.0, peak: 3.0 })
        );
    }

    #[test]
    fn test_triple_that_does_not_fit_is_deferred() {
        let mut codec = codec(FRAME_HEADER_LEN + TRIPLE_HEADER_LEN + 2);
        let mut sender = dial(&[1]);
        sender.gauges.get_mut(Entity::from_raw(1)).unwrap().level = 1.0;

        let bytes = codec.encode(1, &sender, [Entity::from_raw(1)]).unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0]);

        codec.set_capacity(256);
        let bytes = codec.encode(2, &sender, [Entity::from_raw(1)]).unwrap();
        let mut receiver = dial(&[1]);
        codec.decode(&bytes, &mut receiver).unwrap();
        assert_eq!(receiver.gauges.get(Entity::from_raw(1)).unwrap().level, 1.0);
    }

    #[test]
    fn test_burst_larger_than_capacity_drains_over_frames() {
        // Room for two single-field triples per frame.
        let triple = TRIPLE_HEADER_LEN + 1 + 4;
        let mut codec = codec(FRAME_HEADER_LEN + 2 * triple);
        let ids = [1, 2, 3, 4, 5];
        let mut sender = dial(&ids);
        for (e, g) in sender.gauges.iter_mut() {
            g.level = e.id() as f32;
        }
        let entities = ids.map(Entity::from_raw);
        let mut receiver = dial(&ids);

        let mut counts = Vec::new();
        for tick in 0..4 {
            let bytes = codec.encode(tick, &sender, entities).unwrap();
            let report = codec.decode(&bytes, &mut receiver).unwrap();
            assert!(report.is_clean());
            counts.push(report.applied);
        }
        assert_eq!(counts, vec![2, 2, 1, 0]);
        for e in entities {
            assert_eq!(receiver.gauges.get(e).unwrap().level, e.id() as f32);
        }

        // A later change still goes out once the backlog is gone.
        sender.gauges.get_mut(Entity::from_raw(3)).unwrap().peak = 9.0;
        let bytes = codec.encode(4, &sender, entities).unwrap();
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + triple);
    }

    #[test]
    fn test_smaller_triple_fills_space_left_by_larger_one() {
        let mut codec = codec(FRAME_HEADER_LEN + TRIPLE_HEADER_LEN + 1 + 4);
        let mut sender = dial(&[1, 2]);
        *sender.gauges.get_mut(Entity::from_raw(1)).unwrap() = Gauge { level: 1.0, peak: 1.0 };
        sender.gauges.get_mut(Entity::from_raw(2)).unwrap().level = 2.0;

        let entities = [Entity::from_raw(1), Entity::from_raw(2)];
        let mut receiver = dial(&[1, 2]);
        let first = codec.encode(1, &sender, entities).unwrap();
        assert_eq!(codec.decode(&first, &mut receiver).unwrap().applied, 1);
        assert_eq!(receiver.gauges.get(Entity::from_raw(2)).unwrap().level, 2.0);
        assert_eq!(receiver.gauges.get(Entity::from_raw(1)).unwrap().level, 0.0);

        codec.set_capacity(256);
        let second = codec.encode(2, &sender, entities).unwrap();
        assert_eq!(codec.decode(&second, &mut receiver).unwrap().applied, 1);
        assert_eq!(
            receiver.gauges.get(Entity::from_raw(1)),
            Some(&Gauge { level: 1.0, peak: 1.0 })
        );
    }

    #[test]
    fn test_capacity_below_header_is_an_error() {
        let mut codec = codec(FRAME_HEADER_LEN - 1);
        let sender = dial(&[1]);
        assert!(matches!(
            codec.encode(1, &sender, [Entity::from_raw(1)]),
            Err(NetError::OutOfSpace { .. })
        ));
    }

    #[test]
    fn test_unknown_entity_and_kind_are_skipped() {
        let mut codec = codec(128);
        let mut sender = dial(&[1, 2]);
        for (_, g) in sender.gauges.iter_mut() {
            g.level = 5.0;
        }
        let mut bytes = codec
            .encode(3, &sender, [Entity::from_raw(1), Entity::from_raw(2)])
            .unwrap();
        // Relabel the first triple with an unregistered kind.
        bytes[FRAME_HEADER_LEN + 4] = 200;

        let mut receiver = dial(&[2]);
        receiver.remote.insert(Entity::from_raw(1), Entity::from_raw(1));
        let report = codec.decode(&bytes, &mut receiver).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            NetError::UnknownComponentKind(200)
        ));

        let mut stranger = dial(&[]);
        let report = codec.decode(&bytes, &mut stranger).unwrap();
        assert_eq!(report.applied, 0);
        assert!(matches!(
            report.failures[1].error,
            NetError::UnknownEntity(e) if e == Entity::from_raw(2)
        ));
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        let codec = codec(64);
        let mut receiver = dial(&[]);
        assert!(matches!(
            codec.decode(&[1, 0, 0], &mut receiver),
            Err(NetError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_truncated_triple_stops_decoding() {
        let mut codec = codec(64);
        let mut sender = dial(&[1]);
        sender.gauges.get_mut(Entity::from_raw(1)).unwrap().level = 1.0;
        let mut bytes = codec.encode(1, &sender, [Entity::from_raw(1)]).unwrap();
        bytes.truncate(bytes.len() - 1);

        let mut receiver = dial(&[1]);
        let report = codec.decode(&bytes, &mut receiver).unwrap();
        assert_eq!(report.applied, 0);
        assert!(matches!(report.truncated, Some(NetError::MalformedFrame(_))));
        assert_eq!(receiver.gauges.get(Entity::from_raw(1)).unwrap().level, 0.0);
    }

    #[test]
    fn test_forget_resends_against_baseline() {
        let mut codec = codec(64);
        let mut sender = dial(&[1]);
        sender.gauges.get_mut(Entity::from_raw(1)).unwrap().level = 1.0;
        codec.encode(1, &sender, [Entity::from_raw(1)]).unwrap();
        let quiet = codec.encode(2, &sender, [Entity::from_raw(1)]).unwrap();
        assert_eq!(quiet.len(), FRAME_HEADER_LEN);

        codec.forget(Entity::from_raw(1));
        let again = codec.encode(3, &sender, [Entity::from_raw(1)]).unwrap();
        assert!(again.len() > FRAME_HEADER_LEN);
    }
}
