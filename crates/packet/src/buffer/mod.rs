//! The finalized, immutable tree representation.
//!
//! A buffer owns one aligned allocation through a reference-counted
//! handle; the root element is an object at offset 0. Traversal never
//! parses, copies, or allocates: lookups binary-search the vtable and
//! children are addressed by stored offsets.
//!
//! Sub-values handed out of the tree are promoted to owners: the child
//! shares the same root allocation (one refcount bump) and records its
//! own base offset. Dropping the last owner frees the allocation.

pub(crate) mod raw;
pub(crate) mod validate;
pub(crate) mod write;

use crate::heap::{check_key, BasicHeap, Elements, Fields, HeapData};
use crate::raw::{RawType, Type};
use crate::sso::{HeapString, KeyRef};
use dart_core::{AlignedBytes, Error, RcPolicy, Result};
use raw::{elem_eq, heap_elem_eq, RawElem};
use std::fmt;

/// A finalized tree value, generic over the refcount policy.
///
/// `Buffer` and `LocalBuffer` are the concrete aliases.
pub struct BasicBuffer<P: RcPolicy> {
    pub(crate) root: P::Handle<AlignedBytes>,
    pub(crate) ty: RawType,
    pub(crate) offset: usize,
}

impl<P: RcPolicy> Clone for BasicBuffer<P> {
    fn clone(&self) -> Self {
        BasicBuffer {
            root: self.root.clone(),
            ty: self.ty,
            offset: self.offset,
        }
    }
}

impl<P: RcPolicy> BasicBuffer<P> {
    /// Adopt a region already produced or checked by this module.
    pub(crate) fn from_region(region: AlignedBytes) -> Self {
        BasicBuffer {
            root: P::new(region),
            ty: RawType::Object,
            offset: 0,
        }
    }

    /// Adopt untrusted bytes after full validation. The copy into a fresh
    /// aligned allocation also re-establishes base alignment.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        validate::validate(bytes)?;
        Ok(Self::from_region(AlignedBytes::from_slice(bytes)?))
    }

    /// Child view sharing this buffer's allocation.
    fn promote(&self, ty: RawType, offset: usize) -> Self {
        BasicBuffer {
            root: self.root.clone(),
            ty,
            offset,
        }
    }

    /// Null result of a missed lookup; keeps the allocation alive so the
    /// value stays self-describing.
    pub(crate) fn null_view(&self) -> Self {
        self.promote(RawType::Null, self.offset)
    }

    pub(crate) fn raw(&self) -> RawElem<'_> {
        RawElem {
            ty: self.ty,
            data: &self.root[self.offset..],
        }
    }

    /// Key string of the object entry at `index`, borrowed from the
    /// backing allocation.
    pub(crate) fn key_str_at(&self, index: usize) -> &str {
        self.raw().key_at(index)
    }

    /// Owner-promoted view of the container child at `index`.
    pub(crate) fn child_at(&self, index: usize) -> Self {
        let elem = self.raw();
        let child_ty = match self.ty {
            RawType::Object => elem.object_entry(index).ty,
            RawType::Array => elem.array_entry(index).1,
            other => unreachable!("child_at() on {other:?}"),
        };
        self.promote(child_ty, self.offset + elem.child_offset(index))
    }
}

// Observers
impl<P: RcPolicy> BasicBuffer<P> {
    pub fn get_type(&self) -> Type {
        self.ty.semantic()
    }

    /// Storage-level type, exposing the width refinement.
    pub fn raw_type(&self) -> RawType {
        self.ty
    }

    pub fn is_object(&self) -> bool {
        self.get_type() == Type::Object
    }

    pub fn is_array(&self) -> bool {
        self.get_type() == Type::Array
    }

    pub fn is_string(&self) -> bool {
        self.get_type() == Type::String
    }

    pub fn is_integer(&self) -> bool {
        self.get_type() == Type::Integer
    }

    pub fn is_decimal(&self) -> bool {
        self.get_type() == Type::Decimal
    }

    pub fn is_boolean(&self) -> bool {
        self.get_type() == Type::Boolean
    }

    pub fn is_null(&self) -> bool {
        self.get_type() == Type::Null
    }

    /// Pair count (object), element count (array), or byte length
    /// (string).
    pub fn size(&self) -> Result<usize> {
        match self.get_type() {
            Type::Object | Type::Array | Type::String => Ok(self.raw().size()),
            other => Err(Error::type_mismatch(
                "object, array, or string",
                other.name(),
            )),
        }
    }

    /// Total bytes this subtree occupies, padding included.
    pub fn get_sizeof(&self) -> usize {
        self.raw().get_sizeof()
    }

    pub fn boolean_value(&self) -> Result<bool> {
        match self.get_type() {
            Type::Boolean => Ok(self.raw().boolean_value()),
            other => Err(Error::type_mismatch("boolean", other.name())),
        }
    }

    pub fn integer_value(&self) -> Result<i64> {
        match self.get_type() {
            Type::Integer => Ok(self.raw().integer_value()),
            other => Err(Error::type_mismatch("integer", other.name())),
        }
    }

    pub fn decimal_value(&self) -> Result<f64> {
        match self.get_type() {
            Type::Decimal => Ok(self.raw().decimal_value()),
            other => Err(Error::type_mismatch("decimal", other.name())),
        }
    }

    pub fn string_view(&self) -> Result<&str> {
        match self.get_type() {
            Type::String => Ok(self.raw().str_value()),
            other => Err(Error::type_mismatch("string", other.name())),
        }
    }

    pub fn string_copy(&self) -> Result<String> {
        self.string_view().map(str::to_owned)
    }

    pub fn boolean_or(&self, default: bool) -> bool {
        self.boolean_value().unwrap_or(default)
    }

    pub fn integer_or(&self, default: i64) -> i64 {
        self.integer_value().unwrap_or(default)
    }

    pub fn decimal_or(&self, default: f64) -> f64 {
        self.decimal_value().unwrap_or(default)
    }

    pub fn string_or(&self, default: &str) -> String {
        self.string_view()
            .map(str::to_owned)
            .unwrap_or_else(|_| default.to_owned())
    }
}

// Lookup
impl<P: RcPolicy> BasicBuffer<P> {
    fn require_object(&self) -> Result<RawElem<'_>> {
        if self.ty != RawType::Object {
            return Err(Error::type_mismatch("object", self.get_type().name()));
        }
        Ok(self.raw())
    }

    fn require_array(&self) -> Result<RawElem<'_>> {
        if self.ty != RawType::Array {
            return Err(Error::type_mismatch("array", self.get_type().name()));
        }
        Ok(self.raw())
    }

    /// Field value as an owner-promoted view, or a null view when the
    /// key is absent.
    pub fn get(&self, key: impl AsRef<str>) -> Result<Self> {
        let elem = self.require_object()?;
        Ok(match elem.search(key.as_ref()) {
            Some(index) => {
                let entry_ty = elem.object_entry(index).ty;
                self.promote(entry_ty, self.offset + elem.child_offset(index))
            }
            None => self.null_view(),
        })
    }

    /// Field value; the key must be present.
    pub fn at(&self, key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref();
        let elem = self.require_object()?;
        match elem.search(key) {
            Some(index) => {
                let entry_ty = elem.object_entry(index).ty;
                Ok(self.promote(entry_ty, self.offset + elem.child_offset(index)))
            }
            None => Err(Error::NotFound {
                key: key.to_owned(),
            }),
        }
    }

    /// Lookup returning `None` when the key is absent (or self is not an
    /// object).
    pub fn find(&self, key: impl AsRef<str>) -> Option<Self> {
        let elem = self.require_object().ok()?;
        let index = elem.search(key.as_ref())?;
        let entry_ty = elem.object_entry(index).ty;
        Some(self.promote(entry_ty, self.offset + elem.child_offset(index)))
    }

    pub fn has_key(&self, key: impl AsRef<str>) -> bool {
        self.require_object()
            .map(|elem| elem.search(key.as_ref()).is_some())
            .unwrap_or(false)
    }

    /// Element at `index`, or a null view when past the end.
    pub fn get_index(&self, index: usize) -> Result<Self> {
        let elem = self.require_array()?;
        if index >= elem.size() {
            return Ok(self.null_view());
        }
        let (_, ty) = elem.array_entry(index);
        Ok(self.promote(ty, self.offset + elem.child_offset(index)))
    }

    /// Element at `index`; the index must be in range.
    pub fn at_index(&self, index: usize) -> Result<Self> {
        let elem = self.require_array()?;
        let len = elem.size();
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }
        let (_, ty) = elem.array_entry(index);
        Ok(self.promote(ty, self.offset + elem.child_offset(index)))
    }

    /// Keys in vtable order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let elem = self.require_object()?;
        Ok((0..elem.size()).map(|i| elem.key_at(i).to_owned()).collect())
    }

    /// Values in vtable order (objects) or element order (arrays).
    pub fn values(&self) -> Result<Vec<Self>> {
        match self.ty {
            RawType::Object | RawType::Array => {
                Ok((0..self.raw().size()).map(|i| self.child_at(i)).collect())
            }
            _ => Err(Error::type_mismatch(
                "object or array",
                self.get_type().name(),
            )),
        }
    }
}

// Bytes I/O and transitions
impl<P: RcPolicy> BasicBuffer<P> {
    /// Borrow this object's self-contained byte region.
    pub fn get_bytes(&self) -> Result<&[u8]> {
        self.require_object()?;
        let size = self.get_sizeof();
        Ok(&self.root[self.offset..self.offset + size])
    }

    /// Copy this object's byte region out.
    pub fn dup_bytes(&self) -> Result<Vec<u8>> {
        self.get_bytes().map(<[u8]>::to_vec)
    }

    /// Materialize the mutable form of this subtree.
    pub fn to_heap(&self) -> BasicHeap<P> {
        lift_elem(self.raw())
    }

    /// New finalized object: self overlaid with `pairs` (later pairs
    /// win). Kept pairs are copied at the byte level, never re-encoded.
    pub fn inject<K, I>(&self, pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, BasicHeap<P>)>,
    {
        let elem = self.require_object()?;
        let mut incoming = Fields::<P>::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            check_key(key)?;
            incoming.insert(HeapString::new(key), value);
        }
        let region = write::inject_finalized(elem, &incoming)?;
        Ok(Self::from_region(region))
    }

    /// New finalized object holding only the named keys that exist.
    pub fn project<K, I>(&self, keys: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = K>,
    {
        let elem = self.require_object()?;
        let mut sorted: Vec<String> =
            keys.into_iter().map(|k| k.as_ref().to_owned()).collect();
        sorted.sort_by(|a, b| KeyRef::new(a).cmp(KeyRef::new(b)));
        sorted.dedup();
        let refs: Vec<&str> = sorted.iter().map(String::as_str).collect();
        let region = write::project_finalized(elem, &refs)?;
        Ok(Self::from_region(region))
    }
}

impl<P: RcPolicy> BasicHeap<P> {
    /// Lay this tree out as a self-contained finalized buffer. The root
    /// must be an object.
    pub fn finalize(&self) -> Result<BasicBuffer<P>> {
        let region = write::finalize_heap(self)?;
        Ok(BasicBuffer::from_region(region))
    }
}

/// Rebuild the mutable form of a finalized element.
fn lift_elem<P: RcPolicy>(elem: RawElem<'_>) -> BasicHeap<P> {
    match elem.ty.semantic() {
        Type::Null => BasicHeap::null(),
        Type::Boolean => BasicHeap::boolean(elem.boolean_value()),
        Type::Integer => BasicHeap::integer(elem.integer_value()),
        Type::Decimal => BasicHeap::decimal(elem.decimal_value()),
        Type::String => BasicHeap::string(elem.str_value()),
        Type::Object => {
            let mut fields = Fields::new();
            for index in 0..elem.size() {
                fields.insert(
                    HeapString::new(elem.key_at(index)),
                    lift_elem(elem.value_at(index)),
                );
            }
            BasicHeap {
                data: HeapData::Object(P::new(fields)),
            }
        }
        Type::Array => {
            let mut elems = Elements::with_capacity(elem.size());
            for index in 0..elem.size() {
                elems.push(lift_elem(elem.elem_at(index)));
            }
            BasicHeap {
                data: HeapData::Array(P::new(elems)),
            }
        }
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicBuffer<Q>> for BasicBuffer<P> {
    fn eq(&self, other: &BasicBuffer<Q>) -> bool {
        elem_eq(self.raw(), other.raw())
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicHeap<Q>> for BasicBuffer<P> {
    fn eq(&self, other: &BasicHeap<Q>) -> bool {
        heap_elem_eq(other, self.raw())
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicBuffer<Q>> for BasicHeap<P> {
    fn eq(&self, other: &BasicBuffer<Q>) -> bool {
        heap_elem_eq(self, other.raw())
    }
}

impl<P: RcPolicy> fmt::Debug for BasicBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_heap())
    }
}
