//! Zero-copy element views over a finalized region.
//!
//! A raw element is a `(type, bytes)` pair: the tag from the parent's
//! vtable and a slice starting at the element's base. Walking a tree is
//! pure pointer arithmetic over these views: no parsing, no allocation,
//! no copies.
//!
//! Every view in circulation comes from a region produced by the writer
//! or accepted by the validator, so decode paths index the slice
//! directly; an out-of-bounds panic here would mean a broken writer or
//! validator, not bad input.
//!
//! Object layout at the base pointer:
//!
//! ```text
//! u32 bytes | u32 elems | elems x { u32 offset, u8 type, u8 key_len, u16 key_prefix }
//!           | per entry: align(4) key | align(T) value ... | pad to 8
//! ```
//!
//! Array layout is identical with `{ u32 offset, u8 type, 3 pad }`
//! entries addressing the elements directly.

use crate::heap::{numeric_eq, BasicHeap, HeapData};
use crate::raw::RawType;
use dart_core::RcPolicy;
use std::cmp::Ordering;

/// Object/array header size: `u32 bytes` + `u32 elems`.
pub(crate) const HEADER_SIZE: usize = 8;
/// Every vtable entry occupies 8 bytes, objects and arrays alike.
pub(crate) const ENTRY_SIZE: usize = 8;

/// Round `pos` up to `align` (a power of two).
pub(crate) const fn align_up(pos: usize, align: usize) -> usize {
    (pos + align - 1) & !(align - 1)
}

pub(crate) fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

pub(crate) fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

pub(crate) fn le_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        data[at],
        data[at + 1],
        data[at + 2],
        data[at + 3],
        data[at + 4],
        data[at + 5],
        data[at + 6],
        data[at + 7],
    ])
}

/// Decoded object vtable entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectEntry {
    pub offset: usize,
    pub ty: RawType,
    /// Key length clamped to 255; the true length lives in the key string.
    pub key_len: u8,
    /// First two key bytes, zero-padded.
    pub prefix: [u8; 2],
}

/// First two bytes of a key, zero-padded.
pub(crate) fn key_prefix(key: &[u8]) -> [u8; 2] {
    let mut prefix = [0u8; 2];
    for (slot, byte) in prefix.iter_mut().zip(key) {
        *slot = *byte;
    }
    prefix
}

/// Borrowed view of one element inside a finalized region.
#[derive(Clone, Copy)]
pub(crate) struct RawElem<'a> {
    pub ty: RawType,
    /// Region starting at the element base; extends to the end of the
    /// enclosing allocation (the element's own header bounds its data).
    pub data: &'a [u8],
}

impl<'a> RawElem<'a> {
    /// Total bytes occupied by this subtree, padding included.
    pub(crate) fn get_sizeof(&self) -> usize {
        match self.ty {
            RawType::Object | RawType::Array => le_u32(self.data, 0) as usize,
            RawType::String | RawType::SmallString => {
                2 + le_u16(self.data, 0) as usize + 1
            }
            RawType::BigString => 4 + le_u32(self.data, 0) as usize + 1,
            other => other.fixed_size().expect("fixed-width raw type"),
        }
    }

    /// Pair/element count (containers) or byte length (strings).
    pub(crate) fn size(&self) -> usize {
        match self.ty {
            RawType::Object | RawType::Array => le_u32(self.data, 4) as usize,
            RawType::String | RawType::SmallString => le_u16(self.data, 0) as usize,
            RawType::BigString => le_u32(self.data, 0) as usize,
            other => unreachable!("size() on primitive {other:?}"),
        }
    }

    pub(crate) fn boolean_value(&self) -> bool {
        self.data[0] != 0
    }

    pub(crate) fn integer_value(&self) -> i64 {
        match self.ty {
            RawType::ShortInteger => le_u16(self.data, 0) as i16 as i64,
            RawType::Integer => le_u32(self.data, 0) as i32 as i64,
            RawType::LongInteger => le_u64(self.data, 0) as i64,
            other => unreachable!("integer_value() on {other:?}"),
        }
    }

    pub(crate) fn decimal_value(&self) -> f64 {
        match self.ty {
            RawType::Decimal => f32::from_bits(le_u32(self.data, 0)) as f64,
            RawType::LongDecimal => f64::from_bits(le_u64(self.data, 0)),
            other => unreachable!("decimal_value() on {other:?}"),
        }
    }

    pub(crate) fn str_value(&self) -> &'a str {
        let (len, start) = match self.ty {
            RawType::String | RawType::SmallString => (le_u16(self.data, 0) as usize, 2),
            RawType::BigString => (le_u32(self.data, 0) as usize, 4),
            other => unreachable!("str_value() on {other:?}"),
        };
        // Safety: string payloads are UTF-8-checked during validation and
        // written from &str during finalize.
        unsafe { std::str::from_utf8_unchecked(&self.data[start..start + len]) }
    }

    pub(crate) fn object_entry(&self, index: usize) -> ObjectEntry {
        let at = HEADER_SIZE + ENTRY_SIZE * index;
        ObjectEntry {
            offset: le_u32(self.data, at) as usize,
            ty: RawType::try_from(self.data[at + 4]).expect("validated type tag"),
            key_len: self.data[at + 5],
            prefix: [self.data[at + 6], self.data[at + 7]],
        }
    }

    pub(crate) fn array_entry(&self, index: usize) -> (usize, RawType) {
        let at = HEADER_SIZE + ENTRY_SIZE * index;
        (
            le_u32(self.data, at) as usize,
            RawType::try_from(self.data[at + 4]).expect("validated type tag"),
        )
    }

    /// Key string of the object entry at `index`. Keys are always
    /// u16-length strings.
    pub(crate) fn key_at(&self, index: usize) -> &'a str {
        let entry = self.object_entry(index);
        let len = le_u16(self.data, entry.offset) as usize;
        // Safety: validated/written as UTF-8.
        unsafe {
            std::str::from_utf8_unchecked(
                &self.data[entry.offset + 2..entry.offset + 2 + len],
            )
        }
    }

    /// Value of the object entry at `index`; it sits after the key,
    /// re-aligned to the value type's requirement.
    pub(crate) fn value_at(&self, index: usize) -> RawElem<'a> {
        let entry = self.object_entry(index);
        let key_len = le_u16(self.data, entry.offset) as usize;
        let key_end = entry.offset + 2 + key_len + 1;
        let value_off = align_up(key_end, entry.ty.alignment());
        RawElem {
            ty: entry.ty,
            data: &self.data[value_off..],
        }
    }

    /// Array element at `index`.
    pub(crate) fn elem_at(&self, index: usize) -> RawElem<'a> {
        let (offset, ty) = self.array_entry(index);
        RawElem {
            ty,
            data: &self.data[offset..],
        }
    }

    /// Byte offset (from this element's base) of the object entry's
    /// value, or of the array element. Used for as-owner promotion.
    pub(crate) fn child_offset(&self, index: usize) -> usize {
        match self.ty {
            RawType::Object => {
                let entry = self.object_entry(index);
                let key_len = le_u16(self.data, entry.offset) as usize;
                align_up(entry.offset + 2 + key_len + 1, entry.ty.alignment())
            }
            RawType::Array => self.array_entry(index).0,
            other => unreachable!("child_offset() on {other:?}"),
        }
    }

    /// Binary search over the vtable. The vtable is sorted by (length,
    /// then bytes); the clamped length field and two-byte prefix reject
    /// most candidates without chasing the key offset.
    pub(crate) fn search(&self, key: &str) -> Option<usize> {
        let query = key.as_bytes();
        let query_clamped = query.len().min(u8::MAX as usize) as u8;
        let query_prefix = key_prefix(query);

        let mut lo = 0usize;
        let mut hi = self.size();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.compare_entry(mid, query, query_clamped, query_prefix) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Order of the entry at `index` relative to the query key.
    fn compare_entry(
        &self,
        index: usize,
        query: &[u8],
        query_clamped: u8,
        query_prefix: [u8; 2],
    ) -> Ordering {
        let entry = self.object_entry(index);

        // Both lengths saturate at 255: fall back to the true lengths
        // stored with the key strings.
        let len_order = if entry.key_len == u8::MAX && query_clamped == u8::MAX {
            let true_len = le_u16(self.data, entry.offset) as usize;
            true_len.cmp(&query.len())
        } else {
            entry.key_len.cmp(&query_clamped)
        };

        len_order
            .then_with(|| entry.prefix.cmp(&query_prefix))
            .then_with(|| {
                let len = le_u16(self.data, entry.offset) as usize;
                let bytes = &self.data[entry.offset + 2..entry.offset + 2 + len];
                bytes.cmp(query)
            })
    }

    /// Value for `key`, if present.
    pub(crate) fn lookup(&self, key: &str) -> Option<RawElem<'a>> {
        self.search(key).map(|index| self.value_at(index))
    }
}

/// Deep equality between two finalized elements.
///
/// Identical tag and identical bytes short-circuit to equal (the writer
/// emits a canonical encoding, padding included). Differing bytes still
/// need the semantic walk: foreign writers may pick different integer
/// widths for the same value.
pub(crate) fn elem_eq(a: RawElem<'_>, b: RawElem<'_>) -> bool {
    if a.ty == b.ty {
        let size = a.get_sizeof();
        if size == b.get_sizeof() && a.data[..size] == b.data[..size] {
            return true;
        }
    }
    use crate::raw::Type::*;
    match (a.ty.semantic(), b.ty.semantic()) {
        (Null, Null) => true,
        (Boolean, Boolean) => a.boolean_value() == b.boolean_value(),
        (Integer, Integer) => a.integer_value() == b.integer_value(),
        (Decimal, Decimal) => a.decimal_value() == b.decimal_value(),
        (Integer, Decimal) => numeric_eq(a.integer_value(), b.decimal_value()),
        (Decimal, Integer) => numeric_eq(b.integer_value(), a.decimal_value()),
        (String, String) => a.str_value() == b.str_value(),
        (Object, Object) => {
            a.size() == b.size()
                && (0..a.size()).all(|i| {
                    a.key_at(i) == b.key_at(i) && elem_eq(a.value_at(i), b.value_at(i))
                })
        }
        (Array, Array) => {
            a.size() == b.size()
                && (0..a.size()).all(|i| elem_eq(a.elem_at(i), b.elem_at(i)))
        }
        _ => false,
    }
}

/// Deep equality between a mutable tree and a finalized element.
pub(crate) fn heap_elem_eq<P: RcPolicy>(heap: &BasicHeap<P>, elem: RawElem<'_>) -> bool {
    use crate::raw::Type;
    match (&heap.data, elem.ty.semantic()) {
        (HeapData::Null, Type::Null) => true,
        (HeapData::Boolean(b), Type::Boolean) => *b == elem.boolean_value(),
        (HeapData::Integer(i), Type::Integer) => *i == elem.integer_value(),
        (HeapData::Integer(i), Type::Decimal) => numeric_eq(*i, elem.decimal_value()),
        (HeapData::Decimal(d), Type::Decimal) => *d == elem.decimal_value(),
        (HeapData::Decimal(d), Type::Integer) => numeric_eq(elem.integer_value(), *d),
        (HeapData::String(s), Type::String) => s.as_str() == elem.str_value(),
        (HeapData::Object(fields), Type::Object) => {
            // Both sides are sorted in the same key order.
            fields.len() == elem.size()
                && fields.iter().enumerate().all(|(i, (key, value))| {
                    key.as_str() == elem.key_at(i) && heap_elem_eq(value, elem.value_at(i))
                })
        }
        (HeapData::Array(elems), Type::Array) => {
            elems.len() == elem.size()
                && elems
                    .iter()
                    .enumerate()
                    .all(|(i, value)| heap_elem_eq(value, elem.elem_at(i)))
        }
        _ => false,
    }
}
