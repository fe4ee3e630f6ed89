//! Raw type tags and the semantic type lattice.
//!
//! A finalized tree stores one tag byte per vtable entry. Raw types refine
//! the semantic types with storage width (an integer may be stored as 2,
//! 4, or 8 bytes; a decimal as 4 or 8), so a reader can decode a field
//! from its tag alone. Tag values are stable wire constants.

use dart_core::{Error, Result};

/// Storage-level type of a buffer element. The discriminants are the wire
/// tag bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawType {
    Object = 0,
    Array = 1,
    /// u16 length prefix.
    String = 2,
    /// u16 length prefix; emitted by other writers for short strings,
    /// accepted on read, never produced here.
    SmallString = 3,
    /// u32 length prefix.
    BigString = 4,
    /// i16 little-endian.
    ShortInteger = 5,
    /// i32 little-endian.
    Integer = 6,
    /// i64 little-endian.
    LongInteger = 7,
    /// f32 little-endian; accepted on read, never produced here.
    Decimal = 8,
    /// f64 little-endian.
    LongDecimal = 9,
    /// One byte, 0 or 1.
    Boolean = 10,
    /// Zero bytes; the tag alone carries the value.
    Null = 11,
}

impl RawType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Natural machine alignment of the stored field.
    pub const fn alignment(self) -> usize {
        match self {
            RawType::Object | RawType::Array => 8,
            RawType::String | RawType::SmallString => 2,
            RawType::BigString => 4,
            RawType::ShortInteger => 2,
            RawType::Integer => 4,
            RawType::LongInteger => 8,
            RawType::Decimal => 4,
            RawType::LongDecimal => 8,
            RawType::Boolean | RawType::Null => 1,
        }
    }

    /// Stored size for fixed-width raw types; `None` for containers and
    /// strings, whose size is data-dependent.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            RawType::ShortInteger => Some(2),
            RawType::Integer => Some(4),
            RawType::LongInteger => Some(8),
            RawType::Decimal => Some(4),
            RawType::LongDecimal => Some(8),
            RawType::Boolean => Some(1),
            RawType::Null => Some(0),
            _ => None,
        }
    }

    /// Collapse the storage refinement back to the semantic type.
    pub const fn semantic(self) -> Type {
        match self {
            RawType::Object => Type::Object,
            RawType::Array => Type::Array,
            RawType::String | RawType::SmallString | RawType::BigString => Type::String,
            RawType::ShortInteger | RawType::Integer | RawType::LongInteger => {
                Type::Integer
            }
            RawType::Decimal | RawType::LongDecimal => Type::Decimal,
            RawType::Boolean => Type::Boolean,
            RawType::Null => Type::Null,
        }
    }
}

impl TryFrom<u8> for RawType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => RawType::Object,
            1 => RawType::Array,
            2 => RawType::String,
            3 => RawType::SmallString,
            4 => RawType::BigString,
            5 => RawType::ShortInteger,
            6 => RawType::Integer,
            7 => RawType::LongInteger,
            8 => RawType::Decimal,
            9 => RawType::LongDecimal,
            10 => RawType::Boolean,
            11 => RawType::Null,
            other => {
                return Err(Error::Validation(format!("unknown type tag {other}")));
            }
        })
    }
}

/// Semantic type of a value, independent of representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Object,
    Array,
    String,
    Integer,
    Decimal,
    Boolean,
    Null,
}

impl Type {
    /// Lowercase name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Type::Object => "object",
            Type::Array => "array",
            Type::String => "string",
            Type::Integer => "integer",
            Type::Decimal => "decimal",
            Type::Boolean => "boolean",
            Type::Null => "null",
        }
    }
}
