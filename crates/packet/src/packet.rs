//! The unified value: heap or buffer behind one API.
//!
//! A packet holds whichever representation its value currently has.
//! Observation dispatches to the active side. Mutation first makes the
//! heap side active (a finalized packet is lifted back to the mutable
//! form transparently) and then forwards. The transitions are explicit too:
//! [`finalize`](BasicPacket::finalize) lays the tree out as a
//! self-contained byte region, [`definalize`](BasicPacket::definalize)
//! materializes the mutable tree again.
//!
//! Borrowing the underlying bytes is the one operation that refuses to
//! convert implicitly: [`get_bytes`](BasicPacket::get_bytes) on a
//! non-finalized packet reports `Error::State` rather than silently
//! allocating a buffer behind a shared reference.
//!
//! # Examples
//!
//! ```
//! use dart_packet::Packet;
//!
//! let mut packet = Packet::object();
//! packet.insert("hello", "world").unwrap();
//! packet.finalize().unwrap();
//!
//! let bytes = packet.get_bytes().unwrap().to_vec();
//! let restored = Packet::from_bytes(&bytes).unwrap();
//! assert_eq!(restored.get("hello").unwrap().string_copy().unwrap(), "world");
//! ```

use crate::buffer::BasicBuffer;
use crate::convert::ToDart;
use crate::heap::{check_key, BasicHeap};
use crate::raw::Type;
use dart_core::{Error, RcPolicy, Result};
use std::fmt;
use tracing::trace;

pub(crate) enum Repr<P: RcPolicy> {
    Heap(BasicHeap<P>),
    Finalized(BasicBuffer<P>),
}

/// A tree value in either representation, generic over the refcount
/// policy.
///
/// `Packet` and `LocalPacket` are the concrete aliases.
pub struct BasicPacket<P: RcPolicy> {
    pub(crate) repr: Repr<P>,
}

impl<P: RcPolicy> Clone for BasicPacket<P> {
    fn clone(&self) -> Self {
        BasicPacket {
            repr: match &self.repr {
                Repr::Heap(heap) => Repr::Heap(heap.clone()),
                Repr::Finalized(buffer) => Repr::Finalized(buffer.clone()),
            },
        }
    }
}

impl<P: RcPolicy> From<BasicHeap<P>> for BasicPacket<P> {
    fn from(heap: BasicHeap<P>) -> Self {
        BasicPacket {
            repr: Repr::Heap(heap),
        }
    }
}

impl<P: RcPolicy> From<BasicBuffer<P>> for BasicPacket<P> {
    fn from(buffer: BasicBuffer<P>) -> Self {
        BasicPacket {
            repr: Repr::Finalized(buffer),
        }
    }
}

impl<P: RcPolicy> Default for BasicPacket<P> {
    fn default() -> Self {
        Self::null()
    }
}

// Factories
impl<P: RcPolicy> BasicPacket<P> {
    pub fn null() -> Self {
        BasicHeap::null().into()
    }

    pub fn boolean(value: bool) -> Self {
        BasicHeap::boolean(value).into()
    }

    pub fn integer(value: i64) -> Self {
        BasicHeap::integer(value).into()
    }

    pub fn decimal(value: f64) -> Self {
        BasicHeap::decimal(value).into()
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        BasicHeap::string(value).into()
    }

    pub fn object() -> Self {
        BasicHeap::object().into()
    }

    pub fn array() -> Self {
        BasicHeap::array().into()
    }

    /// Object built from key/value pairs. Later duplicates win.
    pub fn object_from<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: ToDart<P>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut heap = BasicHeap::object();
        for (key, value) in pairs {
            heap.insert(key, value.to_dart()?)?;
        }
        Ok(heap.into())
    }

    /// Array built from a sequence of values.
    pub fn array_from<V, I>(values: I) -> Result<Self>
    where
        V: ToDart<P>,
        I: IntoIterator<Item = V>,
    {
        let mut elems = Vec::new();
        for value in values {
            elems.push(value.to_dart()?);
        }
        Ok(BasicHeap::array_from(elems).into())
    }
}

// Representation access and transitions
impl<P: RcPolicy> BasicPacket<P> {
    pub fn is_finalized(&self) -> bool {
        matches!(self.repr, Repr::Finalized(_))
    }

    /// The active heap side, lifting a finalized buffer first if needed.
    fn ensure_heap(&mut self) -> &mut BasicHeap<P> {
        if let Repr::Finalized(buffer) = &self.repr {
            trace!("definalizing packet for mutation");
            self.repr = Repr::Heap(buffer.to_heap());
        }
        match &mut self.repr {
            Repr::Heap(heap) => heap,
            Repr::Finalized(_) => unreachable!("heap side just established"),
        }
    }

    /// Convert to the buffer form. No-op when already finalized. The
    /// root must be an object.
    pub fn finalize(&mut self) -> Result<&mut Self> {
        if let Repr::Heap(heap) = &self.repr {
            self.repr = Repr::Finalized(heap.finalize()?);
        }
        Ok(self)
    }

    /// Convert to the heap form. No-op when already mutable.
    pub fn definalize(&mut self) -> &mut Self {
        self.ensure_heap();
        self
    }

    /// Alias for [`definalize`](Self::definalize).
    pub fn lift(&mut self) -> &mut Self {
        self.definalize()
    }

    /// Alias for [`finalize`](Self::finalize).
    pub fn lower(&mut self) -> Result<&mut Self> {
        self.finalize()
    }

    /// The heap side, if active.
    pub fn as_heap(&self) -> Option<&BasicHeap<P>> {
        match &self.repr {
            Repr::Heap(heap) => Some(heap),
            Repr::Finalized(_) => None,
        }
    }

    /// The buffer side, if active.
    pub fn as_buffer(&self) -> Option<&BasicBuffer<P>> {
        match &self.repr {
            Repr::Heap(_) => None,
            Repr::Finalized(buffer) => Some(buffer),
        }
    }
}

// Bytes I/O
impl<P: RcPolicy> BasicPacket<P> {
    /// Adopt untrusted bytes after validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(BasicBuffer::from_bytes(bytes)?.into())
    }

    /// Borrow the finalized byte region.
    pub fn get_bytes(&self) -> Result<&[u8]> {
        match &self.repr {
            Repr::Finalized(buffer) => buffer.get_bytes(),
            Repr::Heap(_) => Err(Error::State(
                "packet must be finalized before its bytes can be borrowed",
            )),
        }
    }

    /// Copy the finalized byte region out.
    pub fn dup_bytes(&self) -> Result<Vec<u8>> {
        self.get_bytes().map(<[u8]>::to_vec)
    }
}

// Observers
impl<P: RcPolicy> BasicPacket<P> {
    pub fn get_type(&self) -> Type {
        match &self.repr {
            Repr::Heap(heap) => heap.get_type(),
            Repr::Finalized(buffer) => buffer.get_type(),
        }
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

    pub fn size(&self) -> Result<usize> {
        match &self.repr {
            Repr::Heap(heap) => heap.size(),
            Repr::Finalized(buffer) => buffer.size(),
        }
    }

    pub fn boolean_value(&self) -> Result<bool> {
        match &self.repr {
            Repr::Heap(heap) => heap.boolean_value(),
            Repr::Finalized(buffer) => buffer.boolean_value(),
        }
    }

    pub fn integer_value(&self) -> Result<i64> {
        match &self.repr {
            Repr::Heap(heap) => heap.integer_value(),
            Repr::Finalized(buffer) => buffer.integer_value(),
        }
    }

    pub fn decimal_value(&self) -> Result<f64> {
        match &self.repr {
            Repr::Heap(heap) => heap.decimal_value(),
            Repr::Finalized(buffer) => buffer.decimal_value(),
        }
    }

    pub fn string_view(&self) -> Result<&str> {
        match &self.repr {
            Repr::Heap(heap) => heap.string_view(),
            Repr::Finalized(buffer) => buffer.string_view(),
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

    pub fn keys(&self) -> Result<Vec<String>> {
        match &self.repr {
            Repr::Heap(heap) => heap.keys(),
            Repr::Finalized(buffer) => buffer.keys(),
        }
    }

    pub fn values(&self) -> Result<Vec<BasicPacket<P>>> {
        match &self.repr {
            Repr::Heap(heap) => {
                Ok(heap.values()?.into_iter().map(Into::into).collect())
            }
            Repr::Finalized(buffer) => {
                Ok(buffer.values()?.into_iter().map(Into::into).collect())
            }
        }
    }

    /// Field value (objects), or null when the key is absent.
    pub fn get(&self, key: impl AsRef<str>) -> Result<BasicPacket<P>> {
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.get(key)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.get(key)?.into()),
        }
    }

    /// Field value; the key must be present.
    pub fn at(&self, key: impl AsRef<str>) -> Result<BasicPacket<P>> {
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.at(key)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.at(key)?.into()),
        }
    }

    /// Lookup returning `None` when the key is absent (or self is not an
    /// object).
    pub fn find(&self, key: impl AsRef<str>) -> Option<BasicPacket<P>> {
        match &self.repr {
            Repr::Heap(heap) => heap.find(key).map(Into::into),
            Repr::Finalized(buffer) => buffer.find(key).map(Into::into),
        }
    }

    /// Field value, or `default` when absent or not an object.
    pub fn get_or(&self, key: impl AsRef<str>, default: BasicPacket<P>) -> BasicPacket<P> {
        self.find(key).unwrap_or(default)
    }

    pub fn has_key(&self, key: impl AsRef<str>) -> bool {
        match &self.repr {
            Repr::Heap(heap) => heap.has_key(key),
            Repr::Finalized(buffer) => buffer.has_key(key),
        }
    }

    /// Element at `index` (arrays), or null when past the end.
    pub fn get_index(&self, index: usize) -> Result<BasicPacket<P>> {
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.get_index(index)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.get_index(index)?.into()),
        }
    }

    /// Element at `index`; the index must be in range.
    pub fn at_index(&self, index: usize) -> Result<BasicPacket<P>> {
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.at_index(index)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.at_index(index)?.into()),
        }
    }
}

// Mutation (auto-definalizes)
impl<P: RcPolicy> BasicPacket<P> {
    /// Insert or overwrite a field.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl ToDart<P>) -> Result<()> {
        // Validate and convert before touching the representation, so a
        // failed insert leaves the packet exactly as it was.
        check_key(key.as_ref())?;
        let value = value.to_dart()?;
        self.ensure_heap().insert(key, value)
    }

    /// Overwrite a field that must already exist.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl ToDart<P>) -> Result<()> {
        check_key(key.as_ref())?;
        let value = value.to_dart()?;
        self.ensure_heap().set(key, value)
    }

    /// Remove a field. `Ok(false)` if it was absent.
    pub fn erase(&mut self, key: impl AsRef<str>) -> Result<bool> {
        self.ensure_heap().erase(key)
    }

    pub fn push_back(&mut self, value: impl ToDart<P>) -> Result<()> {
        let value = value.to_dart()?;
        self.ensure_heap().push_back(value)
    }

    pub fn pop_back(&mut self) -> Result<Option<BasicPacket<P>>> {
        Ok(self.ensure_heap().pop_back()?.map(Into::into))
    }

    /// Insert at `index`, shifting later elements.
    pub fn insert_index(&mut self, index: usize, value: impl ToDart<P>) -> Result<()> {
        let value = value.to_dart()?;
        self.ensure_heap().insert_index(index, value)
    }

    /// Remove and return the element at `index`.
    pub fn erase_index(&mut self, index: usize) -> Result<BasicPacket<P>> {
        Ok(self.ensure_heap().erase_index(index)?.into())
    }

    /// Chainable insert.
    pub fn add_field(mut self, key: impl AsRef<str>, value: impl ToDart<P>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Chainable erase.
    pub fn remove_field(mut self, key: impl AsRef<str>) -> Result<Self> {
        self.erase(key)?;
        Ok(self)
    }

    /// New object: self overlaid with `pairs` (later pairs win). A
    /// finalized packet merges at the byte level and stays finalized; a
    /// mutable one merges on the heap.
    pub fn inject<K, V, I>(&self, pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: ToDart<P>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut converted = Vec::new();
        for (key, value) in pairs {
            converted.push((key, value.to_dart()?));
        }
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.inject(converted)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.inject(converted)?.into()),
        }
    }

    /// New object holding only the named keys that exist. Preserves the
    /// active representation.
    pub fn project<K, I>(&self, keys: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = K>,
    {
        match &self.repr {
            Repr::Heap(heap) => Ok(heap.project(keys)?.into()),
            Repr::Finalized(buffer) => Ok(buffer.project(keys)?.into()),
        }
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicPacket<Q>> for BasicPacket<P> {
    fn eq(&self, other: &BasicPacket<Q>) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Heap(l), Repr::Heap(r)) => l == r,
            (Repr::Heap(l), Repr::Finalized(r)) => l == r,
            (Repr::Finalized(l), Repr::Heap(r)) => l == r,
            (Repr::Finalized(l), Repr::Finalized(r)) => l == r,
        }
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicHeap<Q>> for BasicPacket<P> {
    fn eq(&self, other: &BasicHeap<Q>) -> bool {
        match &self.repr {
            Repr::Heap(heap) => heap == other,
            Repr::Finalized(buffer) => buffer == other,
        }
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicBuffer<Q>> for BasicPacket<P> {
    fn eq(&self, other: &BasicBuffer<Q>) -> bool {
        match &self.repr {
            Repr::Heap(heap) => heap == other,
            Repr::Finalized(buffer) => buffer == other,
        }
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicPacket<Q>> for BasicHeap<P> {
    fn eq(&self, other: &BasicPacket<Q>) -> bool {
        other == self
    }
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicPacket<Q>> for BasicBuffer<P> {
    fn eq(&self, other: &BasicPacket<Q>) -> bool {
        other == self
    }
}

impl<P: RcPolicy> fmt::Debug for BasicPacket<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Heap(heap) => write!(f, "{heap:?}"),
            Repr::Finalized(buffer) => write!(f, "{buffer:?}"),
        }
    }
}
