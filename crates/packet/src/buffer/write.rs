//! Tree-to-bytes layout.
//!
//! Finalizing walks the mutable tree once to quote a worst-case size
//! (every scalar at its widest, every alignment pad maximal), allocates
//! one zeroed region of that size, lays the tree out into it, and records
//! the actually-used length. Zero initialization makes padding
//! deterministic: equal trees produce byte-identical regions.
//!
//! Merge (`inject`) and projection (`project`) over an already-finalized
//! object cannot know their final pair count before de-duplication, so
//! they speculate with an upper-bound vtable, write the packed data after
//! it, and on completion slide the data backwards over the unused vtable
//! tail, patching every entry offset by the shift and re-zeroing the
//! vacated bytes.

use crate::buffer::raw::{align_up, key_prefix, le_u32, RawElem, ENTRY_SIZE, HEADER_SIZE};
use crate::heap::{BasicHeap, Elements, Fields, HeapData};
use crate::raw::RawType;
use crate::sso::KeyRef;
use dart_core::{AlignedBytes, Error, RcPolicy, Result};
use std::cmp::Ordering;
use tracing::trace;

/// Storage type a heap value finalizes as. Integers narrow to the
/// smallest width that holds the value; decimals keep full width so that
/// buffer identity never depends on f32 representability.
pub(crate) fn raw_type_of<P: RcPolicy>(data: &HeapData<P>) -> RawType {
    match data {
        HeapData::Null => RawType::Null,
        HeapData::Boolean(_) => RawType::Boolean,
        HeapData::Integer(value) => {
            if (i16::MIN as i64..=i16::MAX as i64).contains(value) {
                RawType::ShortInteger
            } else if (i32::MIN as i64..=i32::MAX as i64).contains(value) {
                RawType::Integer
            } else {
                RawType::LongInteger
            }
        }
        HeapData::Decimal(_) => RawType::LongDecimal,
        HeapData::String(s) => {
            if s.len() <= u16::MAX as usize {
                RawType::String
            } else {
                RawType::BigString
            }
        }
        HeapData::Object(_) => RawType::Object,
        HeapData::Array(_) => RawType::Array,
    }
}

/// Stored size of a string layout: length field + bytes + nul.
fn string_size(len: usize) -> usize {
    let len_field = if len <= u16::MAX as usize { 2 } else { 4 };
    len_field + len + 1
}

/// Worst-case bytes `data` can occupy, alignment padding included.
pub(crate) fn upper_bound<P: RcPolicy>(data: &HeapData<P>) -> usize {
    match data {
        HeapData::Null => 0,
        HeapData::Boolean(_) => 1,
        // Widest scalar plus maximal re-alignment.
        HeapData::Integer(_) | HeapData::Decimal(_) => 7 + 8,
        HeapData::String(s) => 3 + string_size(s.len()),
        HeapData::Object(fields) => {
            let mut bound = 7 + HEADER_SIZE + ENTRY_SIZE * fields.len() + 7;
            for (key, value) in fields.iter() {
                bound += 3 + string_size(key.len()) + upper_bound(&value.data);
            }
            bound
        }
        HeapData::Array(elems) => {
            let mut bound = 7 + HEADER_SIZE + ENTRY_SIZE * elems.len() + 7;
            for value in elems.iter() {
                bound += upper_bound(&value.data);
            }
            bound
        }
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// Write a string layout at `pos` and return the cursor past the nul.
fn write_string(buf: &mut [u8], pos: usize, s: &str) -> usize {
    let bytes = s.as_bytes();
    let start = if bytes.len() <= u16::MAX as usize {
        put_u16(buf, pos, bytes.len() as u16);
        pos + 2
    } else {
        put_u32(buf, pos, bytes.len() as u32);
        pos + 4
    };
    buf[start..start + bytes.len()].copy_from_slice(bytes);
    buf[start + bytes.len()] = 0;
    start + bytes.len() + 1
}

/// Lay `data` out at `pos` (already aligned for its raw type) and return
/// the cursor past the written subtree.
pub(crate) fn write_elem<P: RcPolicy>(
    data: &HeapData<P>,
    buf: &mut [u8],
    pos: usize,
) -> Result<usize> {
    match data {
        HeapData::Null => Ok(pos),
        HeapData::Boolean(b) => {
            buf[pos] = *b as u8;
            Ok(pos + 1)
        }
        HeapData::Integer(value) => match raw_type_of::<P>(data) {
            RawType::ShortInteger => {
                put_u16(buf, pos, *value as i16 as u16);
                Ok(pos + 2)
            }
            RawType::Integer => {
                put_u32(buf, pos, *value as i32 as u32);
                Ok(pos + 4)
            }
            _ => {
                put_u64(buf, pos, *value as u64);
                Ok(pos + 8)
            }
        },
        HeapData::Decimal(value) => {
            put_u64(buf, pos, value.to_bits());
            Ok(pos + 8)
        }
        HeapData::String(s) => Ok(write_string(buf, pos, s.as_str())),
        HeapData::Object(fields) => write_object::<P>(fields, buf, pos),
        HeapData::Array(elems) => write_array::<P>(elems, buf, pos),
    }
}

fn write_object<P: RcPolicy>(
    fields: &Fields<P>,
    buf: &mut [u8],
    base: usize,
) -> Result<usize> {
    let count = fields.len();
    let mut cursor = base + HEADER_SIZE + ENTRY_SIZE * count;
    for (index, (key, value)) in fields.iter().enumerate() {
        cursor = write_pair(buf, base, index, cursor, key.as_str(), &value.data)?;
    }
    finish_container(buf, base, cursor, count)
}

fn write_array<P: RcPolicy>(
    elems: &Elements<P>,
    buf: &mut [u8],
    base: usize,
) -> Result<usize> {
    let count = elems.len();
    let mut cursor = base + HEADER_SIZE + ENTRY_SIZE * count;
    for (index, value) in elems.iter().enumerate() {
        let ty = raw_type_of(&value.data);
        cursor = align_up(cursor, ty.alignment());
        let entry_at = base + HEADER_SIZE + ENTRY_SIZE * index;
        put_u32(buf, entry_at, (cursor - base) as u32);
        buf[entry_at + 4] = ty.as_u8();
        cursor = write_elem(&value.data, buf, cursor)?;
    }
    finish_container(buf, base, cursor, count)
}

/// Write one object pair (key string, vtable entry, value) with the value
/// produced from heap data. `index` is the entry slot; offsets are
/// relative to `base`.
fn write_pair<P: RcPolicy>(
    buf: &mut [u8],
    base: usize,
    index: usize,
    cursor: usize,
    key: &str,
    value: &HeapData<P>,
) -> Result<usize> {
    let ty = raw_type_of(value);
    let cursor = write_pair_key(buf, base, index, cursor, key, ty);
    let mut cursor = align_up(cursor, ty.alignment());
    cursor = write_elem(value, buf, cursor)?;
    Ok(cursor)
}

/// Write one object pair whose value is copied verbatim from an existing
/// finalized element (its storage type is preserved).
fn copy_pair(
    buf: &mut [u8],
    base: usize,
    index: usize,
    cursor: usize,
    key: &str,
    value: RawElem<'_>,
) -> usize {
    let cursor = write_pair_key(buf, base, index, cursor, key, value.ty);
    let cursor = align_up(cursor, value.ty.alignment());
    let size = value.get_sizeof();
    buf[cursor..cursor + size].copy_from_slice(&value.data[..size]);
    cursor + size
}

/// Align, write the key string, and fill the vtable entry. Returns the
/// cursor past the key's nul.
fn write_pair_key(
    buf: &mut [u8],
    base: usize,
    index: usize,
    cursor: usize,
    key: &str,
    value_ty: RawType,
) -> usize {
    let cursor = align_up(cursor, 4);
    let bytes = key.as_bytes();
    let entry_at = base + HEADER_SIZE + ENTRY_SIZE * index;
    put_u32(buf, entry_at, (cursor - base) as u32);
    buf[entry_at + 4] = value_ty.as_u8();
    buf[entry_at + 5] = bytes.len().min(u8::MAX as usize) as u8;
    buf[entry_at + 6..entry_at + 8].copy_from_slice(&key_prefix(bytes));
    write_string(buf, cursor, key)
}

/// Pad to object alignment and write the container header.
fn finish_container(
    buf: &mut [u8],
    base: usize,
    cursor: usize,
    count: usize,
) -> Result<usize> {
    let end = align_up(cursor, 8);
    let total = end - base;
    if total > u32::MAX as usize {
        return Err(Error::InvalidArgument(
            "container subtree exceeds the 4 GiB layout limit".to_string(),
        ));
    }
    put_u32(buf, base, total as u32);
    put_u32(buf, base + 4, count as u32);
    Ok(end)
}

/// Finalize a heap tree into a self-contained region. The root must be an
/// object.
pub(crate) fn finalize_heap<P: RcPolicy>(heap: &BasicHeap<P>) -> Result<AlignedBytes> {
    heap.fields()?;
    let bound = upper_bound(&heap.data);
    let mut region = AlignedBytes::zeroed(bound)?;
    let end = write_elem(&heap.data, region.as_mut_slice(), 0)?;
    region.truncate(end);
    trace!(bytes = end, "finalized heap into buffer");
    Ok(region)
}

/// Merge `incoming` over a finalized object, producing a new region.
/// Later pairs win against the base. Works entirely at the byte level:
/// kept pairs are copied verbatim, incoming values are laid out fresh.
pub(crate) fn inject_finalized<P: RcPolicy>(
    base: RawElem<'_>,
    incoming: &Fields<P>,
) -> Result<AlignedBytes> {
    let base_count = base.size();
    let speculated = base_count + incoming.len();

    let mut bound = HEADER_SIZE + ENTRY_SIZE * speculated + 7;
    for index in 0..base_count {
        let key_len = base.key_at(index).len();
        bound += 3 + string_size(key_len) + 7 + base.value_at(index).get_sizeof();
    }
    for (key, value) in incoming.iter() {
        bound += 3 + string_size(key.len()) + upper_bound(&value.data);
    }

    let mut region = AlignedBytes::zeroed(bound)?;
    let buf = region.as_mut_slice();
    let data_start = HEADER_SIZE + ENTRY_SIZE * speculated;
    let mut cursor = data_start;
    let mut written = 0usize;

    let mut base_index = 0usize;
    let mut incoming_iter = incoming.iter().peekable();
    loop {
        let take_incoming = match (base_index < base_count, incoming_iter.peek()) {
            (false, None) => break,
            (false, Some(_)) => true,
            (true, None) => false,
            (true, Some((incoming_key, _))) => {
                match KeyRef::new(base.key_at(base_index))
                    .cmp(KeyRef::new(incoming_key.as_str()))
                {
                    Ordering::Less => false,
                    Ordering::Greater => true,
                    Ordering::Equal => {
                        // Duplicate: the incoming pair replaces the kept one.
                        base_index += 1;
                        true
                    }
                }
            }
        };
        if take_incoming {
            let (key, value) = incoming_iter.next().expect("peeked");
            cursor = write_pair(buf, 0, written, cursor, key.as_str(), &value.data)?;
        } else {
            let key = base.key_at(base_index);
            cursor = copy_pair(buf, 0, written, cursor, key, base.value_at(base_index));
            base_index += 1;
        }
        written += 1;
    }

    let end = relocate_and_seal(buf, speculated, written, data_start, cursor)?;
    region.truncate(end);
    trace!(bytes = end, pairs = written, "injected into finalized object");
    Ok(region)
}

/// Project the named keys out of a finalized object into a new region.
/// `keys` must be sorted in vtable order and de-duplicated.
pub(crate) fn project_finalized(
    base: RawElem<'_>,
    keys: &[&str],
) -> Result<AlignedBytes> {
    let speculated = keys.len();

    // Resolve before sizing; absent keys simply drop out.
    let found: Vec<usize> = keys.iter().filter_map(|key| base.search(key)).collect();

    let mut bound = HEADER_SIZE + ENTRY_SIZE * speculated + 7;
    for &index in &found {
        let key_len = base.key_at(index).len();
        bound += 3 + string_size(key_len) + 7 + base.value_at(index).get_sizeof();
    }

    let mut region = AlignedBytes::zeroed(bound)?;
    let buf = region.as_mut_slice();
    let data_start = HEADER_SIZE + ENTRY_SIZE * speculated;
    let mut cursor = data_start;

    for (written, &index) in found.iter().enumerate() {
        let key = base.key_at(index);
        cursor = copy_pair(buf, 0, written, cursor, key, base.value_at(index));
    }

    let end = relocate_and_seal(buf, speculated, found.len(), data_start, cursor)?;
    region.truncate(end);
    Ok(region)
}

/// Collapse the unused vtable tail left by a speculative layout, patch
/// entry offsets by the shift, zero the vacated bytes, and seal the
/// header.
fn relocate_and_seal(
    buf: &mut [u8],
    speculated: usize,
    written: usize,
    data_start: usize,
    cursor: usize,
) -> Result<usize> {
    let mut cursor = cursor;
    if written < speculated {
        let delta = ENTRY_SIZE * (speculated - written);
        buf.copy_within(data_start..cursor, data_start - delta);
        for index in 0..written {
            let entry_at = HEADER_SIZE + ENTRY_SIZE * index;
            let offset = le_u32(buf, entry_at) as usize - delta;
            put_u32(buf, entry_at, offset as u32);
        }
        buf[cursor - delta..cursor].fill(0);
        cursor -= delta;
    }
    finish_container(buf, 0, cursor, written)
}
