//! Per-component change bitmask.
//!
//! Bit *i* is set when field *i* (in the component's fixed enumeration
//! order) changed and its value follows in the payload. The mask is one byte
//! for up to 8 fields, two for up to 16 and four for up to 32.

use crate::cursor::ViewCursor;
use crate::error::NetError;

/// Largest field count a component may declare.
pub const MAX_FIELDS: usize = 32;

/// Change bitmask builder and reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeMask {
    bits: u32,
    field_count: usize,
    next: usize,
}

impl ChangeMask {
    /// An empty mask for a component with `field_count` fields.
    #[must_use]
    pub fn new(field_count: usize) -> Self {
        debug_assert!(field_count <= MAX_FIELDS, "too many fields for a change mask");
        Self {
            bits: 0,
            field_count,
            next: 0,
        }
    }

    /// Wire width in bytes of a mask for `field_count` fields.
    #[must_use]
    pub const fn width_for(field_count: usize) -> usize {
        match field_count {
            0..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }

    /// Wire width in bytes of this mask.
    #[must_use]
    pub fn width(&self) -> usize {
        Self::width_for(self.field_count)
    }

    /// Record the outcome of the next field in enumeration order.
    pub fn record(&mut self, changed: bool) {
        debug_assert!(self.next < self.field_count, "more fields recorded than declared");
        if changed {
            self.bits |= 1 << self.next;
        }
        self.next += 1;
    }

    /// Returns `true` if field `index` is present.
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        index < MAX_FIELDS && self.bits & (1 << index) != 0
    }

    /// Returns `true` if no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Raw bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of fields present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Little-endian wire bytes, `width()` long.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.to_le_bytes()[..self.width()].to_vec()
    }

    /// Payload size implied by this mask, given each field's value width.
    #[must_use]
    pub fn payload_len(&self, field_widths: &[usize]) -> usize {
        field_widths
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_set(*index))
            .map(|(_, width)| width)
            .sum()
    }

    /// Read a mask for a component with `field_count` fields.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MalformedFrame`] if a bit refers to a field beyond
    /// `field_count`, or [`NetError::OutOfSpace`] if the mask is truncated.
    pub fn read(cursor: &mut ViewCursor, field_count: usize) -> Result<Self, NetError> {
        let width = Self::width_for(field_count);
        let mut raw = [0u8; 4];
        raw[..width].copy_from_slice(cursor.read(width)?);
        let bits = u32::from_le_bytes(raw);
        let defined = if field_count >= MAX_FIELDS {
            u32::MAX
        } else {
            (1u32 << field_count) - 1
        };
        if bits & !defined != 0 {
            return Err(NetError::MalformedFrame(format!(
                "change mask {bits:#x} sets bits beyond {field_count} fields"
            )));
        }
        Ok(Self {
            bits,
            field_count,
            next: field_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sets_bits_in_order() {
        let mut mask = ChangeMask::new(4);
        mask.record(true);
        mask.record(false);
        mask.record(false);
        mask.record(true);
        assert_eq!(mask.bits(), 0b1001);
        assert!(mask.is_set(0));
        assert!(!mask.is_set(1));
        assert!(mask.is_set(3));
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.to_bytes(), vec![0b1001]);
    }

    #[test]
    fn test_width_grows_with_field_count() {
        assert_eq!(ChangeMask::width_for(1), 1);
        assert_eq!(ChangeMask::width_for(8), 1);
        assert_eq!(ChangeMask::width_for(9), 2);
        assert_eq!(ChangeMask::width_for(16), 2);
        assert_eq!(ChangeMask::width_for(17), 4);

        let mut wide = ChangeMask::new(10);
        for i in 0..10 {
            wide.record(i == 9);
        }
        assert_eq!(wide.to_bytes(), vec![0x00, 0x02]);
    }

    #[test]
    fn test_payload_len() {
        let mut mask = ChangeMask::new(3);
        mask.record(true);
        mask.record(false);
        mask.record(true);
        assert_eq!(mask.payload_len(&[12, 16, 4]), 16);
    }

    #[test]
    fn test_read_accepts_defined_bits() {
        let mut cursor = ViewCursor::from_bytes(vec![0b1111]);
        let mask = ChangeMask::read(&mut cursor, 4).unwrap();
        assert_eq!(mask.count(), 4);
    }

    #[test]
    fn test_read_rejects_bits_beyond_field_count() {
        let mut cursor = ViewCursor::from_bytes(vec![0b1_0000]);
        let err = ChangeMask::read(&mut cursor, 4).unwrap_err();
        assert!(matches!(err, NetError::MalformedFrame(_)));
    }

    #[test]
    fn test_read_wide_mask() {
        let mut cursor = ViewCursor::from_bytes(vec![0x01, 0x01]);
        let mask = ChangeMask::read(&mut cursor, 9).unwrap();
        assert!(mask.is_set(0));
        assert!(mask.is_set(8));
        assert!(!mask.is_set(9));
    }
}
