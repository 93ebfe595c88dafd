//! Component serializer contract.
//!
//! A [`ComponentSerializer`] encodes one component kind of one entity as a
//! change mask followed by the changed fields, and applies such a payload
//! back onto a world. `W` is the world type that owns component storage.
//!
//! [`write_masked`] and [`read_mask`] carry the parts every serializer
//! shares: reserving and patching the mask, erasing a component whose mask
//! ended up empty, and validating a received payload before anything is
//! applied.

use engine_component::{ComponentKind, Entity};

use crate::cursor::ViewCursor;
use crate::error::NetError;
use crate::mask::ChangeMask;

/// Delta encoder/decoder for one component kind.
pub trait ComponentSerializer<W: ?Sized> {
    /// Wire identifier of the component kind.
    fn kind(&self) -> ComponentKind;

    /// Human-readable component name, for logs.
    fn name(&self) -> &'static str;

    /// Value width of each field, in enumeration order.
    fn field_widths(&self) -> &'static [usize];

    /// Encode the fields of `entity` that changed since they were last
    /// written.
    ///
    /// Returns `Ok(false)` with no bytes written when the entity lacks the
    /// component or nothing changed.
    fn write(&mut self, cursor: &mut ViewCursor, world: &W, entity: Entity) -> Result<bool, NetError>;

    /// Apply a payload to `entity`. `cursor` is bounded to exactly the
    /// payload (mask and fields).
    fn read(&self, cursor: &mut ViewCursor, world: &mut W, entity: Entity) -> Result<(), NetError>;

    /// Keep the snapshot changes of the triple just written.
    fn commit(&mut self);

    /// Discard the snapshot changes of a triple that was erased.
    fn rollback(&mut self);

    /// Drop all bookkeeping for `entity`.
    fn forget(&mut self, entity: Entity);
}

/// Reserve a mask, let `fields` write the changed fields, then patch the
/// mask in, or erase everything if no field changed.
///
/// # Errors
///
/// Propagates the first error of `fields`, or [`NetError::OutOfSpace`] if
/// the mask does not fit. The cursor is rewound on error.
pub fn write_masked<F>(cursor: &mut ViewCursor, field_count: usize, fields: F) -> Result<bool, NetError>
where
    F: FnOnce(&mut ViewCursor, &mut ChangeMask) -> Result<(), NetError>,
{
    let mark = cursor.mark();
    let slot = cursor.reserve(ChangeMask::width_for(field_count))?;
    let mut mask = ChangeMask::new(field_count);

    if let Err(err) = fields(cursor, &mut mask) {
        cursor.rewind(mark);
        return Err(err);
    }
    if mask.is_empty() {
        cursor.rewind(mark);
        return Ok(false);
    }
    cursor.patch(&slot, &mask.to_bytes())?;
    Ok(true)
}

/// Read a mask and check that the rest of the payload holds exactly the
/// fields it announces.
///
/// # Errors
///
/// Returns [`NetError::MalformedFrame`] for undefined mask bits or a
/// payload length mismatch.
pub fn read_mask(cursor: &mut ViewCursor, field_widths: &[usize]) -> Result<ChangeMask, NetError> {
    let mask = ChangeMask::read(cursor, field_widths.len()).map_err(|err| match err {
        NetError::OutOfSpace { .. } => NetError::MalformedFrame("truncated change mask".into()),
        other => other,
    })?;
    let expected = mask.payload_len(field_widths);
    if cursor.remaining() != expected {
        return Err(NetError::MalformedFrame(format!(
            "mask {:#x} announces {expected} bytes of fields, payload holds {}",
            mask.bits(),
            cursor.remaining()
        )));
    }
    Ok(mask)
}
