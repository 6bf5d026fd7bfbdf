//! The per-leaf value cell: a tagged scalar union plus a grow-only string buffer

use crate::error::VsdError;
use crate::kind::DataKind;

/// Minimum buffer capacity a [`StringCell`] ever allocates, to damp fragmentation
/// on a run of tiny assignments.
const MIN_STRING_CAPACITY: usize = 8;

/// A string leaf's value: owns a buffer that grows but never shrinks (I4).
///
/// Capacity is always a power of two at least [`MIN_STRING_CAPACITY`] once any
/// non-empty string has been assigned. Re-assigning a string no longer than the
/// current capacity reuses the existing buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringCell {
    bytes: Vec<u8>,
    len: usize,
}

impl StringCell {
    /// An empty cell with no allocation yet.
    pub fn new() -> Self {
        Self { bytes: Vec::new(), len: 0 }
    }

    /// The current contents.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len])
            .expect("StringCell only ever receives bytes copied from a &str")
    }

    /// Length in bytes of the current contents.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the cell holds the empty string.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current buffer capacity. Always `>= len` (I4).
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Overwrite the contents, growing the buffer if `s` is longer than the
    /// current capacity. Never shrinks the buffer.
    pub fn set(&mut self, s: &str) {
        let needed = s.len();
        if needed > self.bytes.len() {
            let target = needed.max(MIN_STRING_CAPACITY).next_power_of_two();
            self.bytes.resize(target, 0);
        }
        self.bytes[..needed].copy_from_slice(s.as_bytes());
        self.len = needed;
    }
}

/// A leaf's current value: a tagged union sized for the widest scalar, with
/// strings carried out-of-line in a [`StringCell`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 8-bit signed integer
    I8(i8),
    /// 8-bit unsigned integer
    U8(u8),
    /// 16-bit signed integer
    I16(i16),
    /// 16-bit unsigned integer
    U16(u16),
    /// 32-bit signed integer
    I32(i32),
    /// 32-bit unsigned integer
    U32(u32),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(StringCell),
}

impl Value {
    /// The data kind this value currently carries.
    pub fn kind(&self) -> DataKind {
        match self {
            Value::I8(_) => DataKind::I8,
            Value::U8(_) => DataKind::U8,
            Value::I16(_) => DataKind::I16,
            Value::U16(_) => DataKind::U16,
            Value::I32(_) => DataKind::I32,
            Value::U32(_) => DataKind::U32,
            Value::F32(_) => DataKind::F32,
            Value::F64(_) => DataKind::F64,
            Value::Bool(_) => DataKind::Bool,
            Value::String(_) => DataKind::String,
        }
    }

    /// The zero/empty value for a given data kind, used to seed a freshly
    /// constructed leaf. `Stream`/`None` have no cell representation; callers
    /// must not construct leaves with those kinds.
    pub fn default_for(kind: DataKind) -> Option<Self> {
        Some(match kind {
            DataKind::I8 => Value::I8(0),
            DataKind::U8 => Value::U8(0),
            DataKind::I16 => Value::I16(0),
            DataKind::U16 => Value::U16(0),
            DataKind::I32 => Value::I32(0),
            DataKind::U32 => Value::U32(0),
            DataKind::F32 => Value::F32(0.0),
            DataKind::F64 => Value::F64(0.0),
            DataKind::Bool => Value::Bool(false),
            DataKind::String => Value::String(StringCell::new()),
            DataKind::Stream | DataKind::None => return None,
        })
    }

    /// Parse a literal string into a value of the given kind (§4.2 `convert` setter).
    ///
    /// Integers parse base-10 with sign; floats parse standard decimal;
    /// booleans are `1|t|T -> true`, anything else -> false; strings copy
    /// verbatim. Parse failures report `invalid-argument`.
    pub fn parse(kind: DataKind, literal: &str) -> Result<Self, VsdError> {
        let bad = || VsdError::invalid_argument(format!("cannot parse {literal:?} as {kind}"));
        Ok(match kind {
            DataKind::I8 => Value::I8(literal.parse().map_err(|_| bad())?),
            DataKind::U8 => Value::U8(literal.parse().map_err(|_| bad())?),
            DataKind::I16 => Value::I16(literal.parse().map_err(|_| bad())?),
            DataKind::U16 => Value::U16(literal.parse().map_err(|_| bad())?),
            DataKind::I32 => Value::I32(literal.parse().map_err(|_| bad())?),
            DataKind::U32 => Value::U32(literal.parse().map_err(|_| bad())?),
            DataKind::F32 => Value::F32(literal.parse().map_err(|_| bad())?),
            DataKind::F64 => Value::F64(literal.parse().map_err(|_| bad())?),
            DataKind::Bool => Value::Bool(matches!(literal, "1" | "t" | "T")),
            DataKind::String => {
                let mut cell = StringCell::new();
                cell.set(literal);
                Value::String(cell)
            }
            DataKind::Stream | DataKind::None => return Err(bad()),
        })
    }

    /// Borrow as a string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(cell) => Some(cell.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_cell_grows_by_power_of_two_and_never_shrinks() {
        let mut cell = StringCell::new();
        cell.set("hi");
        assert_eq!(cell.capacity(), MIN_STRING_CAPACITY);
        cell.set("a longer string than before");
        let grown = cell.capacity();
        assert!(grown >= 28);
        assert_eq!(grown, grown.next_power_of_two());
        cell.set("x");
        assert_eq!(cell.capacity(), grown, "capacity must not shrink on a shorter assignment");
        assert_eq!(cell.as_str(), "x");
    }

    #[test]
    fn convert_setter_parses_by_kind() {
        assert_eq!(Value::parse(DataKind::U16, "42").unwrap(), Value::U16(42));
        assert_eq!(Value::parse(DataKind::Bool, "t").unwrap(), Value::Bool(true));
        assert_eq!(Value::parse(DataKind::Bool, "false").unwrap(), Value::Bool(false));
        assert!(Value::parse(DataKind::U16, "nope").is_err());
    }
}
