//! Validation of adopted byte regions.
//!
//! Bytes arriving from outside (network, disk, another process) are
//! walked once before any zero-copy traversal is allowed. The walk proves
//! the properties the readers in [`super::raw`] rely on: in-range,
//! aligned, monotonically increasing offsets; known type tags; sorted
//! vtables; terminated, UTF-8 key and string payloads. After a successful
//! walk, no traversal of the region can read out of bounds.
//!
//! Checked reads only: nothing here indexes the region before proving
//! the bytes exist.

use crate::buffer::raw::{align_up, key_prefix, ENTRY_SIZE, HEADER_SIZE};
use crate::raw::RawType;
use crate::sso::KeyRef;
use dart_core::{Error, Result};
use tracing::debug;

/// Containers nested deeper than this fail validation. Bounds stack use
/// on hostile input.
const MAX_DEPTH: usize = 512;

fn fail(msg: impl Into<String>) -> Error {
    Error::Validation(msg.into())
}

fn read_u16(region: &[u8], at: usize) -> Result<u16> {
    let bytes = region
        .get(at..at + 2)
        .ok_or_else(|| fail(format!("truncated u16 at offset {at}")))?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(region: &[u8], at: usize) -> Result<u32> {
    let bytes = region
        .get(at..at + 4)
        .ok_or_else(|| fail(format!("truncated u32 at offset {at}")))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Validate a full region holding an object at offset 0.
pub(crate) fn validate(bytes: &[u8]) -> Result<()> {
    let total = read_u32(bytes, 0)? as usize;
    if total != bytes.len() {
        let err = fail(format!(
            "length out of bounds: header claims {total} bytes, region holds {}",
            bytes.len()
        ));
        debug!(%err, "rejected adopted bytes");
        return Err(err);
    }
    validate_elem(RawType::Object, bytes, 0)?;
    Ok(())
}

/// Validate one element whose base is at the start of `region` (clipped
/// to the parent's extent). Returns the element's stored size.
fn validate_elem(ty: RawType, region: &[u8], depth: usize) -> Result<usize> {
    match ty {
        RawType::Object | RawType::Array => {
            if depth >= MAX_DEPTH {
                return Err(fail("nesting depth exceeded"));
            }
            validate_container(ty, region, depth)
        }
        RawType::String | RawType::SmallString => {
            let len = read_u16(region, 0)? as usize;
            validate_string_payload(region, 2, len)
        }
        RawType::BigString => {
            let len = read_u32(region, 0)? as usize;
            validate_string_payload(region, 4, len)
        }
        RawType::Boolean => match region.first() {
            Some(0) | Some(1) => Ok(1),
            Some(other) => Err(fail(format!("invalid boolean byte {other}"))),
            None => Err(fail("truncated boolean")),
        },
        RawType::Null => Ok(0),
        fixed => {
            let size = fixed.fixed_size().expect("scalar raw type");
            if region.len() < size {
                return Err(fail(format!("truncated {}-byte scalar", size)));
            }
            Ok(size)
        }
    }
}

/// Length field already read; check the payload bytes and terminator.
fn validate_string_payload(region: &[u8], start: usize, len: usize) -> Result<usize> {
    let payload = region
        .get(start..start + len)
        .ok_or_else(|| fail("string payload out of bounds"))?;
    match region.get(start + len) {
        Some(0) => {}
        Some(_) => return Err(fail("string missing nul terminator")),
        None => return Err(fail("string payload out of bounds")),
    }
    std::str::from_utf8(payload).map_err(|_| fail("string payload is not UTF-8"))?;
    Ok(start + len + 1)
}

fn validate_container(ty: RawType, region: &[u8], depth: usize) -> Result<usize> {
    if region.len() < HEADER_SIZE {
        return Err(fail("truncated container header"));
    }
    let total = read_u32(region, 0)? as usize;
    let count = read_u32(region, 4)? as usize;
    if total > region.len() {
        return Err(fail(format!(
            "container size {total} exceeds enclosing region of {}",
            region.len()
        )));
    }
    if total % 8 != 0 {
        return Err(fail(format!("container size {total} not 8-aligned")));
    }
    let vtable_end = HEADER_SIZE + ENTRY_SIZE * count;
    if vtable_end > total {
        return Err(fail(format!(
            "vtable of {count} entries exceeds container size {total}"
        )));
    }
    let region = &region[..total];

    let mut watermark = vtable_end;
    let mut previous_key: Option<&[u8]> = None;
    for index in 0..count {
        let entry_at = HEADER_SIZE + ENTRY_SIZE * index;
        let offset = read_u32(region, entry_at)? as usize;
        let child_ty = RawType::try_from(region[entry_at + 4])?;

        let (child_off, child_region) = if ty == RawType::Object {
            // Entry addresses the key; the value follows it, re-aligned.
            if offset % 4 != 0 {
                return Err(fail(format!("key offset {offset} not 4-aligned")));
            }
            if offset < watermark || offset >= total {
                return Err(fail(format!("key offset {offset} out of bounds")));
            }
            let key_len = read_u16(region, offset)? as usize;
            let key_end = validate_string_payload(&region[offset..], 2, key_len)?;
            let key = &region[offset + 2..offset + 2 + key_len];

            // Entries must match the key they point at and be strictly
            // ascending in (length, then bytes) order.
            if region[entry_at + 5] != key_len.min(u8::MAX as usize) as u8 {
                return Err(fail("vtable key length mismatch"));
            }
            if region[entry_at + 6..entry_at + 8] != key_prefix(key) {
                return Err(fail("vtable key prefix mismatch"));
            }
            // Keys come out of validated UTF-8 payloads.
            let key_str = std::str::from_utf8(key).expect("checked above");
            if let Some(previous) = previous_key {
                let previous_str = std::str::from_utf8(previous).expect("checked above");
                if KeyRef::new(previous_str) >= KeyRef::new(key_str) {
                    return Err(fail("vtable keys out of order"));
                }
            }
            previous_key = Some(key);

            let value_off = align_up(offset + key_end, child_ty.alignment());
            if value_off > total {
                return Err(fail(format!("value offset {value_off} out of bounds")));
            }
            (value_off, &region[value_off..])
        } else {
            if offset % child_ty.alignment() != 0 {
                return Err(fail(format!(
                    "element offset {offset} misaligned for {child_ty:?}"
                )));
            }
            // Zero-size elements may share the watermark; anything with
            // data must sit at or past it.
            if offset < watermark || offset > total {
                return Err(fail(format!("element offset {offset} out of bounds")));
            }
            if child_ty != RawType::Null && offset >= total {
                return Err(fail(format!("element offset {offset} out of bounds")));
            }
            (offset, &region[offset..])
        };

        let child_size = validate_elem(child_ty, child_region, depth + 1)?;
        watermark = child_off + child_size;
        if watermark > total {
            return Err(fail("child overruns container"));
        }
    }

    if align_up(watermark, 8) != total {
        return Err(fail(format!(
            "container size {total} inconsistent with content end {watermark}"
        )));
    }
    Ok(total)
}
