//! Bounds-checked binary cursor.
//!
//! [`ViewCursor`] wraps a byte buffer and a single offset used for both
//! writing and reading. Capacity is fixed when the cursor is created and
//! never grows: a write that does not fit fails with
//! [`NetError::OutOfSpace`] and leaves the cursor untouched. All integers
//! and floats are little-endian.

use crate::error::NetError;

/// A saved cursor offset to [`ViewCursor::rewind`] to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Bytes skipped by [`ViewCursor::reserve`], to be filled in later with
/// [`ViewCursor::patch`].
#[derive(Debug)]
#[must_use = "a reservation is only useful if it is patched"]
pub struct Reservation {
    offset: usize,
    len: usize,
}

impl Reservation {
    /// Number of reserved bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-byte reservation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A fixed-capacity write/read cursor over a byte buffer.
#[derive(Debug, Clone)]
pub struct ViewCursor {
    buf: Vec<u8>,
    offset: usize,
}

impl ViewCursor {
    /// A zeroed cursor for writing at most `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            offset: 0,
        }
    }

    /// A cursor for reading `bytes` from the start.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            offset: 0,
        }
    }

    /// Current offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total size of the underlying buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes between the offset and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn claim(&mut self, n: usize) -> Result<usize, NetError> {
        if n > self.remaining() {
            return Err(NetError::OutOfSpace {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let start = self.offset;
        self.offset += n;
        Ok(start)
    }

    /// Write `bytes` at the offset and advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the bytes do not fit.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        let start = self.claim(bytes.len())?;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Return the next `n` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than `n` bytes remain.
    pub fn read(&mut self, n: usize) -> Result<&[u8], NetError> {
        let start = self.claim(n)?;
        Ok(&self.buf[start..start + n])
    }

    /// Skip `n` bytes so they can be patched once their value is known.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the bytes do not fit.
    pub fn reserve(&mut self, n: usize) -> Result<Reservation, NetError> {
        let offset = self.claim(n)?;
        Ok(Reservation { offset, len: n })
    }

    /// Overwrite previously reserved bytes. The offset does not move.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MalformedFrame`] if `bytes` does not match the
    /// reserved length, or [`NetError::OutOfSpace`] if the reservation was
    /// rewound away.
    pub fn patch(&mut self, reservation: &Reservation, bytes: &[u8]) -> Result<(), NetError> {
        if bytes.len() != reservation.len {
            return Err(NetError::MalformedFrame(format!(
                "patch of {} bytes into a {}-byte reservation",
                bytes.len(),
                reservation.len
            )));
        }
        let end = reservation.offset + reservation.len;
        if end > self.offset {
            return Err(NetError::OutOfSpace {
                needed: end,
                remaining: self.offset,
            });
        }
        self.buf[reservation.offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Save the current offset.
    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark(self.offset)
    }

    /// Move the offset back to `mark`, discarding everything written since.
    pub fn rewind(&mut self, mark: Mark) {
        debug_assert!(mark.0 <= self.offset, "rewind past the current offset");
        self.offset = mark.0.min(self.offset);
    }

    /// Split off the next `n` bytes as an independent reading cursor and
    /// advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than `n` bytes remain.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ViewCursor, NetError> {
        let bytes = self.read(n)?.to_vec();
        Ok(ViewCursor::from_bytes(bytes))
    }

    /// Consume the cursor, returning the bytes before the offset.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.truncate(self.offset);
        self.buf
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], NetError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    /// Write one byte.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the byte does not fit.
    pub fn write_u8(&mut self, value: u8) -> Result<(), NetError> {
        self.write(&[value])
    }

    /// Write a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value does not fit.
    pub fn write_u16(&mut self, value: u16) -> Result<(), NetError> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value does not fit.
    pub fn write_u32(&mut self, value: u32) -> Result<(), NetError> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian `f32`, bit for bit.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value does not fit.
    pub fn write_f32(&mut self, value: f32) -> Result<(), NetError> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian `f64`, bit for bit.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value does not fit.
    pub fn write_f64(&mut self, value: f64) -> Result<(), NetError> {
        self.write(&value.to_le_bytes())
    }

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if no bytes remain.
    pub fn read_u8(&mut self) -> Result<u8, NetError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16, NetError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, NetError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than 4 bytes remain.
    pub fn read_f32(&mut self) -> Result<f32, NetError> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a little-endian `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if fewer than 8 bytes remain.
    pub fn read_f64(&mut self) -> Result<f64, NetError> {
        self.read_array().map(f64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut cursor = ViewCursor::with_capacity(16);
        cursor.write_u32(0xdead_beef).unwrap();
        cursor.write_f32(1.5).unwrap();
        cursor.write_u8(7).unwrap();
        let bytes = cursor.finish();
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[..4], &[0xef, 0xbe, 0xad, 0xde]);

        let mut reader = ViewCursor::from_bytes(bytes);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_write_out_of_space_leaves_offset() {
        let mut cursor = ViewCursor::with_capacity(6);
        cursor.write_u32(1).unwrap();
        let err = cursor.write_u32(2).unwrap_err();
        assert!(matches!(
            err,
            NetError::OutOfSpace {
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(cursor.offset(), 4);
    }

    #[test]
    fn test_read_out_of_space() {
        let mut cursor = ViewCursor::from_bytes(vec![1, 2, 3]);
        assert!(matches!(cursor.read_u32(), Err(NetError::OutOfSpace { .. })));
        assert_eq!(cursor.read(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_reserve_and_patch() {
        let mut cursor = ViewCursor::with_capacity(8);
        let slot = cursor.reserve(2).unwrap();
        cursor.write_u8(0xaa).unwrap();
        cursor.patch(&slot, &[1, 2]).unwrap();
        assert_eq!(cursor.offset(), 3);
        assert_eq!(cursor.finish(), vec![1, 2, 0xaa]);
    }

    #[test]
    fn test_patch_length_mismatch() {
        let mut cursor = ViewCursor::with_capacity(8);
        let slot = cursor.reserve(1).unwrap();
        assert!(matches!(
            cursor.patch(&slot, &[1, 2]),
            Err(NetError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_patch_after_rewind_fails() {
        let mut cursor = ViewCursor::with_capacity(8);
        let mark = cursor.mark();
        let slot = cursor.reserve(4).unwrap();
        cursor.rewind(mark);
        assert!(cursor.patch(&slot, &[0; 4]).is_err());
    }

    #[test]
    fn test_rewind_discards_bytes() {
        let mut cursor = ViewCursor::with_capacity(8);
        cursor.write_u8(1).unwrap();
        let mark = cursor.mark();
        cursor.write_u16(0xffff).unwrap();
        cursor.rewind(mark);
        cursor.write_u8(2).unwrap();
        assert_eq!(cursor.finish(), vec![1, 2]);
    }

    #[test]
    fn test_sub_cursor_is_bounded() {
        let mut cursor = ViewCursor::from_bytes(vec![1, 2, 3, 4, 5]);
        let mut sub = cursor.sub_cursor(2).unwrap();
        assert_eq!(sub.read_u8().unwrap(), 1);
        assert_eq!(sub.read_u8().unwrap(), 2);
        assert!(sub.read_u8().is_err());
        assert_eq!(cursor.read_u8().unwrap(), 3);
        assert!(cursor.sub_cursor(3).is_err());
    }
}
