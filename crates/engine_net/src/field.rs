//! Typed field codecs.
//!
//! A [`FieldValue`] knows its fixed wire width and how to put itself on a
//! [`ViewCursor`]. Vectors and quaternions are written as their scalars in
//! `x, y, z[, w]` order, with no quantization.
//!
//! A [`Field`] binds a value type to one field of a component. Writing a
//! field compares the live value against the last-serialized snapshot and
//! only emits bytes when the two differ bit-for-bit.

use glam::{Quat, Vec3, Vec4};

use crate::cursor::ViewCursor;
use crate::error::NetError;

/// A fixed-width value that can be placed on the wire.
pub trait FieldValue: Copy {
    /// Encoded size in bytes.
    const WIDTH: usize;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError>;

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError>;

    /// Exact comparison used for change detection. No epsilon: two values
    /// are equal only if every scalar has the same bit pattern.
    fn same_bits(&self, other: &Self) -> bool;
}

impl FieldValue for f32 {
    const WIDTH: usize = 4;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError> {
        cursor.write_f32(self)
    }

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError> {
        cursor.read_f32()
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl FieldValue for f64 {
    const WIDTH: usize = 8;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError> {
        cursor.write_f64(self)
    }

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError> {
        cursor.read_f64()
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

fn write_scalars(cursor: &mut ViewCursor, scalars: &[f32]) -> Result<(), NetError> {
    // Reserve the whole value first so a partial vector is never written.
    let reservation = cursor.reserve(scalars.len() * f32::WIDTH)?;
    let bytes: Vec<u8> = scalars.iter().flat_map(|s| s.to_le_bytes()).collect();
    cursor.patch(&reservation, &bytes)
}

fn scalars_match(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.same_bits(y))
}

impl FieldValue for Vec3 {
    const WIDTH: usize = 12;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError> {
        write_scalars(cursor, &self.to_array())
    }

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError> {
        let x = cursor.read_f32()?;
        let y = cursor.read_f32()?;
        let z = cursor.read_f32()?;
        Ok(Vec3::new(x, y, z))
    }

    fn same_bits(&self, other: &Self) -> bool {
        scalars_match(&self.to_array(), &other.to_array())
    }
}

impl FieldValue for Vec4 {
    const WIDTH: usize = 16;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError> {
        write_scalars(cursor, &self.to_array())
    }

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError> {
        let x = cursor.read_f32()?;
        let y = cursor.read_f32()?;
        let z = cursor.read_f32()?;
        let w = cursor.read_f32()?;
        Ok(Vec4::new(x, y, z, w))
    }

    fn same_bits(&self, other: &Self) -> bool {
        scalars_match(&self.to_array(), &other.to_array())
    }
}

impl FieldValue for Quat {
    const WIDTH: usize = 16;

    fn encode(self, cursor: &mut ViewCursor) -> Result<(), NetError> {
        write_scalars(cursor, &self.to_array())
    }

    fn decode(cursor: &mut ViewCursor) -> Result<Self, NetError> {
        Vec4::decode(cursor).map(Quat::from_vec4)
    }

    fn same_bits(&self, other: &Self) -> bool {
        scalars_match(&self.to_array(), &other.to_array())
    }
}

/// One replicated field of component `C`, holding a `V`.
pub struct Field<C, V> {
    pub name: &'static str,
    get: fn(&C) -> V,
    set: fn(&mut C, V),
}

impl<C, V: FieldValue> Field<C, V> {
    /// Bind a field through its accessor pair.
    #[must_use]
    pub const fn new(name: &'static str, get: fn(&C) -> V, set: fn(&mut C, V)) -> Self {
        Self { name, get, set }
    }

    /// Encoded size of this field's value.
    #[must_use]
    pub const fn width(&self) -> usize {
        V::WIDTH
    }

    /// Write the live value if it differs from the snapshot.
    ///
    /// On change the value is encoded, the snapshot updated and `true`
    /// returned; otherwise nothing is written and `false` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value does not fit. The
    /// snapshot is left untouched in that case.
    pub fn write(&self, cursor: &mut ViewCursor, live: &C, snapshot: &mut C) -> Result<bool, NetError> {
        let value = (self.get)(live);
        if value.same_bits(&(self.get)(snapshot)) {
            return Ok(false);
        }
        value.encode(cursor)?;
        (self.set)(snapshot, value);
        Ok(true)
    }

    /// Consume the value from the cursor and store it in `live`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::OutOfSpace`] if the value is truncated.
    pub fn read(&self, cursor: &mut ViewCursor, live: &mut C) -> Result<V, NetError> {
        let value = V::decode(cursor)?;
        (self.set)(live, value);
        Ok(value)
    }
}

impl<C, V> std::fmt::Debug for Field<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}
