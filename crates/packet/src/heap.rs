//! The mutable tree representation.
//!
//! A heap value is a tagged union over the seven semantic types. Object
//! and array state live behind reference-counted handles, so cloning a
//! heap is O(1) and sub-trees are freely shared. Every mutating entry
//! point goes through clone-on-write: if the container handle is shared,
//! the container is cloned first and the mutation lands on the copy, so
//! other holders observe no change.
//!
//! Object fields are kept in a map ordered by (key length, then key
//! bytes), the order the finalized vtable requires, with borrowed-key
//! lookup that never allocates.
//!
//! # Examples
//!
//! ```
//! use dart_packet::Heap;
//!
//! let mut obj = Heap::object();
//! obj.insert("name", Heap::string("dart")).unwrap();
//! obj.insert("count", Heap::integer(3)).unwrap();
//! assert_eq!(obj.at("count").unwrap().integer_value().unwrap(), 3);
//! assert_eq!(obj.size().unwrap(), 2);
//! ```

use crate::raw::Type;
use crate::sso::{HeapString, KeyRef};
use dart_core::{Error, RcPolicy, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Longest permitted object key, in bytes.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

pub(crate) type Fields<P> =
    BTreeMap<HeapString<P>, BasicHeap<P>>;
pub(crate) type Elements<P> = Vec<BasicHeap<P>>;

pub(crate) enum HeapData<P: RcPolicy> {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(HeapString<P>),
    Object(P::Handle<Fields<P>>),
    Array(P::Handle<Elements<P>>),
}

impl<P: RcPolicy> Clone for HeapData<P> {
    fn clone(&self) -> Self {
        match self {
            HeapData::Null => HeapData::Null,
            HeapData::Boolean(b) => HeapData::Boolean(*b),
            HeapData::Integer(i) => HeapData::Integer(*i),
            HeapData::Decimal(d) => HeapData::Decimal(*d),
            HeapData::String(s) => HeapData::String(s.clone()),
            HeapData::Object(fields) => HeapData::Object(fields.clone()),
            HeapData::Array(elems) => HeapData::Array(elems.clone()),
        }
    }
}

/// A mutable tree value, generic over the refcount policy.
///
/// `Heap` and `LocalHeap` are the concrete aliases.
pub struct BasicHeap<P: RcPolicy> {
    pub(crate) data: HeapData<P>,
}

impl<P: RcPolicy> Clone for BasicHeap<P> {
    fn clone(&self) -> Self {
        BasicHeap {
            data: self.data.clone(),
        }
    }
}

impl<P: RcPolicy> Default for BasicHeap<P> {
    fn default() -> Self {
        Self::null()
    }
}

// Factories
impl<P: RcPolicy> BasicHeap<P> {
    pub fn null() -> Self {
        BasicHeap {
            data: HeapData::Null,
        }
    }

    pub fn boolean(value: bool) -> Self {
        BasicHeap {
            data: HeapData::Boolean(value),
        }
    }

    pub fn integer(value: i64) -> Self {
        BasicHeap {
            data: HeapData::Integer(value),
        }
    }

    pub fn decimal(value: f64) -> Self {
        BasicHeap {
            data: HeapData::Decimal(value),
        }
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        BasicHeap {
            data: HeapData::String(HeapString::new(value.as_ref())),
        }
    }

    /// Empty object.
    pub fn object() -> Self {
        BasicHeap {
            data: HeapData::Object(P::new(Fields::new())),
        }
    }

    /// Empty array.
    pub fn array() -> Self {
        BasicHeap {
            data: HeapData::Array(P::new(Elements::new())),
        }
    }

    /// Object built from key/value pairs. Later duplicates win.
    pub fn object_from<K, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, BasicHeap<P>)>,
    {
        let mut fields = Fields::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            check_key(key)?;
            fields.insert(HeapString::new(key), value);
        }
        Ok(BasicHeap {
            data: HeapData::Object(P::new(fields)),
        })
    }

    /// Array built from a sequence of values.
    pub fn array_from<I>(values: I) -> Self
    where
        I: IntoIterator<Item = BasicHeap<P>>,
    {
        BasicHeap {
            data: HeapData::Array(P::new(values.into_iter().collect())),
        }
    }
}

// Observers
impl<P: RcPolicy> BasicHeap<P> {
    pub fn get_type(&self) -> Type {
        self.data.ty()
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
        match &self.data {
            HeapData::Object(fields) => Ok(fields.len()),
            HeapData::Array(elems) => Ok(elems.len()),
            HeapData::String(s) => Ok(s.len()),
            other => Err(Error::type_mismatch("object, array, or string", other.ty().name())),
        }
    }

    pub fn boolean_value(&self) -> Result<bool> {
        match &self.data {
            HeapData::Boolean(b) => Ok(*b),
            other => Err(Error::type_mismatch("boolean", other.ty().name())),
        }
    }

    pub fn integer_value(&self) -> Result<i64> {
        match &self.data {
            HeapData::Integer(i) => Ok(*i),
            other => Err(Error::type_mismatch("integer", other.ty().name())),
        }
    }

    pub fn decimal_value(&self) -> Result<f64> {
        match &self.data {
            HeapData::Decimal(d) => Ok(*d),
            other => Err(Error::type_mismatch("decimal", other.ty().name())),
        }
    }

    pub fn string_view(&self) -> Result<&str> {
        match &self.data {
            HeapData::String(s) => Ok(s.as_str()),
            other => Err(Error::type_mismatch("string", other.ty().name())),
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
        self.string_view().map(str::to_owned).unwrap_or_else(|_| default.to_owned())
    }

    /// Live handle count of the shared container (or long string);
    /// `None` for primitives and inline strings.
    pub fn use_count(&self) -> Option<usize> {
        match &self.data {
            HeapData::Object(fields) => Some(P::use_count(fields)),
            HeapData::Array(elems) => Some(P::use_count(elems)),
            HeapData::String(s) => s.use_count(),
            _ => None,
        }
    }
}

// Object operations
impl<P: RcPolicy> BasicHeap<P> {
    pub(crate) fn fields(&self) -> Result<&Fields<P>> {
        match &self.data {
            HeapData::Object(fields) => Ok(fields),
            other => Err(Error::type_mismatch("object", other.ty().name())),
        }
    }

    /// Clone-on-write access to the field map.
    fn fields_mut(&mut self) -> Result<&mut Fields<P>> {
        match &mut self.data {
            HeapData::Object(fields) => Ok(P::make_mut(fields)),
            other => Err(Error::type_mismatch("object", other.ty().name())),
        }
    }

    /// Insert or overwrite a field.
    pub fn insert(&mut self, key: impl AsRef<str>, value: BasicHeap<P>) -> Result<()> {
        let key = key.as_ref();
        check_key(key)?;
        self.fields_mut()?.insert(HeapString::new(key), value);
        Ok(())
    }

    /// Overwrite a field that must already exist.
    pub fn set(&mut self, key: impl AsRef<str>, value: BasicHeap<P>) -> Result<()> {
        let key = key.as_ref();
        check_key(key)?;
        // Precondition first; the map is only touched once it holds.
        if !self.fields()?.contains_key(KeyRef::new(key)) {
            return Err(Error::NotFound {
                key: key.to_owned(),
            });
        }
        self.fields_mut()?.insert(HeapString::new(key), value);
        Ok(())
    }

    /// Remove a field. `Ok(false)` if it was absent.
    pub fn erase(&mut self, key: impl AsRef<str>) -> Result<bool> {
        let key = key.as_ref();
        // Avoid the COW clone when there is nothing to remove.
        if !self.fields()?.contains_key(KeyRef::new(key)) {
            return Ok(false);
        }
        Ok(self.fields_mut()?.remove(KeyRef::new(key)).is_some())
    }

    pub fn has_key(&self, key: impl AsRef<str>) -> bool {
        match &self.data {
            HeapData::Object(fields) => fields.contains_key(KeyRef::new(key.as_ref())),
            _ => false,
        }
    }

    /// Lookup returning `None` when the key is absent (or self is not an
    /// object).
    pub fn find(&self, key: impl AsRef<str>) -> Option<BasicHeap<P>> {
        match &self.data {
            HeapData::Object(fields) => fields.get(KeyRef::new(key.as_ref())).cloned(),
            _ => None,
        }
    }

    /// Field value, or null when the key is absent.
    pub fn get(&self, key: impl AsRef<str>) -> Result<BasicHeap<P>> {
        Ok(self
            .fields()?
            .get(KeyRef::new(key.as_ref()))
            .cloned()
            .unwrap_or_else(BasicHeap::null))
    }

    /// Field value; the key must be present.
    pub fn at(&self, key: impl AsRef<str>) -> Result<BasicHeap<P>> {
        let key = key.as_ref();
        self.fields()?
            .get(KeyRef::new(key))
            .cloned()
            .ok_or_else(|| Error::NotFound {
                key: key.to_owned(),
            })
    }

    /// Field value, or `default` when absent or not an object.
    pub fn get_or(&self, key: impl AsRef<str>, default: BasicHeap<P>) -> BasicHeap<P> {
        self.find(key).unwrap_or(default)
    }

    /// Chainable insert.
    pub fn add_field(mut self, key: impl AsRef<str>, value: BasicHeap<P>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Chainable erase.
    pub fn remove_field(mut self, key: impl AsRef<str>) -> Result<Self> {
        self.erase(key)?;
        Ok(self)
    }

    /// New object: self overlaid with `pairs` (later pairs win, including
    /// over existing fields).
    pub fn inject<K, I>(&self, pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, BasicHeap<P>)>,
    {
        let mut fields = self.fields()?.clone();
        for (key, value) in pairs {
            let key = key.as_ref();
            check_key(key)?;
            fields.insert(HeapString::new(key), value);
        }
        Ok(BasicHeap {
            data: HeapData::Object(P::new(fields)),
        })
    }

    /// New object holding only the named keys that exist in self.
    pub fn project<K, I>(&self, keys: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = K>,
    {
        let fields = self.fields()?;
        let mut projected = Fields::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = fields.get(KeyRef::new(key)) {
                projected.insert(HeapString::new(key), value.clone());
            }
        }
        Ok(BasicHeap {
            data: HeapData::Object(P::new(projected)),
        })
    }

    /// Keys in vtable order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.fields()?.keys().map(|k| k.as_str().to_owned()).collect())
    }

    /// Values in vtable (key) order.
    pub fn values(&self) -> Result<Vec<BasicHeap<P>>> {
        match &self.data {
            HeapData::Object(fields) => Ok(fields.values().cloned().collect()),
            HeapData::Array(elems) => Ok(elems.to_vec()),
            other => Err(Error::type_mismatch("object or array", other.ty().name())),
        }
    }
}

// Array operations
impl<P: RcPolicy> BasicHeap<P> {
    pub(crate) fn elements(&self) -> Result<&Elements<P>> {
        match &self.data {
            HeapData::Array(elems) => Ok(elems),
            other => Err(Error::type_mismatch("array", other.ty().name())),
        }
    }

    /// Clone-on-write access to the element vector.
    fn elements_mut(&mut self) -> Result<&mut Elements<P>> {
        match &mut self.data {
            HeapData::Array(elems) => Ok(P::make_mut(elems)),
            other => Err(Error::type_mismatch("array", other.ty().name())),
        }
    }

    pub fn push_back(&mut self, value: BasicHeap<P>) -> Result<()> {
        self.elements_mut()?.push(value);
        Ok(())
    }

    pub fn pop_back(&mut self) -> Result<Option<BasicHeap<P>>> {
        // Popping an empty array is a no-op, not an error.
        if self.elements()?.is_empty() {
            return Ok(None);
        }
        Ok(self.elements_mut()?.pop())
    }

    /// Insert at `index`, shifting later elements. `index == len` appends.
    pub fn insert_index(&mut self, index: usize, value: BasicHeap<P>) -> Result<()> {
        let len = self.elements()?.len();
        if index > len {
            return Err(Error::OutOfRange { index, len });
        }
        self.elements_mut()?.insert(index, value);
        Ok(())
    }

    /// Remove and return the element at `index`.
    pub fn erase_index(&mut self, index: usize) -> Result<BasicHeap<P>> {
        let len = self.elements()?.len();
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }
        Ok(self.elements_mut()?.remove(index))
    }

    /// Element at `index`, or null when past the end.
    pub fn get_index(&self, index: usize) -> Result<BasicHeap<P>> {
        Ok(self
            .elements()?
            .get(index)
            .cloned()
            .unwrap_or_else(BasicHeap::null))
    }

    /// Element at `index`; the index must be in range.
    pub fn at_index(&self, index: usize) -> Result<BasicHeap<P>> {
        let elems = self.elements()?;
        elems.get(index).cloned().ok_or(Error::OutOfRange {
            index,
            len: elems.len(),
        })
    }
}

impl<P: RcPolicy> HeapData<P> {
    pub(crate) fn ty(&self) -> Type {
        match self {
            HeapData::Null => Type::Null,
            HeapData::Boolean(_) => Type::Boolean,
            HeapData::Integer(_) => Type::Integer,
            HeapData::Decimal(_) => Type::Decimal,
            HeapData::String(_) => Type::String,
            HeapData::Object(_) => Type::Object,
            HeapData::Array(_) => Type::Array,
        }
    }
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidArgument(format!(
            "object key of {} bytes exceeds the {MAX_KEY_LEN}-byte limit",
            key.len()
        )));
    }
    Ok(())
}

/// Integer/decimal comparison is numeric: a decimal equal to an integer
/// compares equal to it.
pub(crate) fn numeric_eq(int: i64, dec: f64) -> bool {
    // Bounds chosen so the cast back to i64 is exact: 2^63 as f64 is
    // representable but out of i64 range, so it is excluded.
    if !dec.is_finite() || dec.trunc() != dec {
        return false;
    }
    if dec < -9.223_372_036_854_776e18 || dec >= 9.223_372_036_854_776e18 {
        return false;
    }
    dec as i64 == int
}

impl<P: RcPolicy, Q: RcPolicy> PartialEq<BasicHeap<Q>> for BasicHeap<P> {
    fn eq(&self, other: &BasicHeap<Q>) -> bool {
        match (&self.data, &other.data) {
            (HeapData::Null, HeapData::Null) => true,
            (HeapData::Boolean(l), HeapData::Boolean(r)) => l == r,
            (HeapData::Integer(l), HeapData::Integer(r)) => l == r,
            (HeapData::Decimal(l), HeapData::Decimal(r)) => l == r,
            (HeapData::Integer(i), HeapData::Decimal(d))
            | (HeapData::Decimal(d), HeapData::Integer(i)) => numeric_eq(*i, *d),
            (HeapData::String(l), HeapData::String(r)) => l.as_str() == r.as_str(),
            (HeapData::Object(l), HeapData::Object(r)) => {
                l.len() == r.len()
                    && l.iter().zip(r.iter()).all(|((lk, lv), (rk, rv))| {
                        lk.as_str() == rk.as_str() && lv == rv
                    })
            }
            (HeapData::Array(l), HeapData::Array(r)) => {
                l.len() == r.len() && l.iter().zip(r.iter()).all(|(lv, rv)| lv == rv)
            }
            _ => false,
        }
    }
}

impl<P: RcPolicy> fmt::Debug for BasicHeap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            HeapData::Null => write!(f, "null"),
            HeapData::Boolean(b) => write!(f, "{b}"),
            HeapData::Integer(i) => write!(f, "{i}"),
            HeapData::Decimal(d) => write!(f, "{d}"),
            HeapData::String(s) => write!(f, "{:?}", s.as_str()),
            HeapData::Object(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k.as_str(), v)))
                .finish(),
            HeapData::Array(elems) => f.debug_list().entries(elems.iter()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dart_core::{Atomic, Local};

    type Heap = BasicHeap<Atomic>;

    #[test]
    fn test_factories_and_type_predicates() {
        assert!(Heap::null().is_null());
        assert!(Heap::boolean(true).is_boolean());
        assert!(Heap::integer(7).is_integer());
        assert!(Heap::decimal(2.5).is_decimal());
        assert!(Heap::string("s").is_string());
        assert!(Heap::object().is_object());
        assert!(Heap::array().is_array());
    }

    #[test]
    fn test_insert_get_erase() {
        let mut obj = Heap::object();
        obj.insert("k", Heap::integer(1)).unwrap();
        assert!(obj.has_key("k"));
        assert_eq!(obj.get("k").unwrap().integer_value().unwrap(), 1);
        assert!(obj.get("missing").unwrap().is_null());
        assert!(obj.at("missing").is_err());

        assert!(obj.erase("k").unwrap());
        assert!(!obj.erase("k").unwrap());
        assert!(!obj.has_key("k"));
    }

    #[test]
    fn test_insert_then_erase_restores_equality() {
        let mut obj = Heap::object_from([("a", Heap::integer(1))]).unwrap();
        let before = obj.clone();
        obj.insert("b", Heap::string("tmp")).unwrap();
        obj.erase("b").unwrap();
        assert_eq!(obj, before);
    }

    #[test]
    fn test_set_requires_existing_key() {
        let mut obj = Heap::object();
        assert!(matches!(
            obj.set("k", Heap::integer(1)),
            Err(Error::NotFound { .. })
        ));
        obj.insert("k", Heap::integer(1)).unwrap();
        obj.set("k", Heap::integer(2)).unwrap();
        assert_eq!(obj.at("k").unwrap().integer_value().unwrap(), 2);
    }

    #[test]
    fn test_oversized_key_rejected() {
        let mut obj = Heap::object();
        let key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            obj.insert(key, Heap::null()),
            Err(Error::InvalidArgument(_))
        ));
        // Failed mutation leaves the object unchanged.
        assert_eq!(obj.size().unwrap(), 0);
    }

    #[test]
    fn test_cow_on_shared_object() {
        let mut a = Heap::object_from([("k", Heap::integer(1))]).unwrap();
        let b = a.clone();
        assert_eq!(a.use_count(), Some(2));

        a.insert("k", Heap::integer(2)).unwrap();

        assert_eq!(a.at("k").unwrap().integer_value().unwrap(), 2);
        assert_eq!(b.at("k").unwrap().integer_value().unwrap(), 1);
        // Both sides own their map exclusively after the copy.
        assert_eq!(a.use_count(), Some(1));
        assert_eq!(b.use_count(), Some(1));
    }

    #[test]
    fn test_cow_on_shared_array() {
        let mut a = Heap::array_from([Heap::integer(1)]);
        let b = a.clone();
        a.push_back(Heap::integer(2)).unwrap();
        assert_eq!(a.size().unwrap(), 2);
        assert_eq!(b.size().unwrap(), 1);
    }

    #[test]
    fn test_array_ops() {
        let mut arr = Heap::array();
        arr.push_back(Heap::integer(1)).unwrap();
        arr.push_back(Heap::integer(3)).unwrap();
        arr.insert_index(1, Heap::integer(2)).unwrap();
        assert_eq!(arr.size().unwrap(), 3);
        assert_eq!(arr.at_index(1).unwrap().integer_value().unwrap(), 2);

        assert!(matches!(
            arr.insert_index(5, Heap::null()),
            Err(Error::OutOfRange { index: 5, len: 3 })
        ));
        assert!(arr.get_index(9).unwrap().is_null());
        assert!(arr.at_index(9).is_err());

        let removed = arr.erase_index(0).unwrap();
        assert_eq!(removed.integer_value().unwrap(), 1);
        assert_eq!(arr.pop_back().unwrap().unwrap().integer_value().unwrap(), 3);
        assert_eq!(arr.pop_back().unwrap().unwrap().integer_value().unwrap(), 2);
        assert!(arr.pop_back().unwrap().is_none());
    }

    #[test]
    fn test_inject_right_bias() {
        let base = Heap::object_from([("x", Heap::integer(1)), ("y", Heap::integer(2))])
            .unwrap();
        let merged = base
            .inject([
                ("y", Heap::integer(20)),
                ("z", Heap::integer(30)),
                ("z", Heap::integer(31)),
            ])
            .unwrap();
        assert_eq!(merged.at("x").unwrap().integer_value().unwrap(), 1);
        assert_eq!(merged.at("y").unwrap().integer_value().unwrap(), 20);
        assert_eq!(merged.at("z").unwrap().integer_value().unwrap(), 31);
        // The source object is untouched.
        assert_eq!(base.at("y").unwrap().integer_value().unwrap(), 2);
    }

    #[test]
    fn test_project_keeps_only_present_keys() {
        let obj = Heap::object_from([("a", Heap::integer(1)), ("b", Heap::integer(2))])
            .unwrap();
        let projected = obj.project(["b", "missing"]).unwrap();
        assert_eq!(projected.size().unwrap(), 1);
        assert_eq!(projected.at("b").unwrap().integer_value().unwrap(), 2);
    }

    #[test]
    fn test_keys_in_vtable_order() {
        let obj = Heap::object_from([
            ("bb", Heap::integer(2)),
            ("a", Heap::integer(1)),
            ("aa", Heap::integer(3)),
        ])
        .unwrap();
        assert_eq!(obj.keys().unwrap(), ["a", "aa", "bb"]);
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Heap::integer(3), Heap::decimal(3.0));
        assert_ne!(Heap::integer(3), Heap::decimal(3.5));
        assert_ne!(Heap::integer(3), Heap::decimal(f64::NAN));
        assert!(numeric_eq(0, -0.0));
        assert!(!numeric_eq(i64::MAX, 9.3e18));
    }

    #[test]
    fn test_cross_policy_equality() {
        let atomic = BasicHeap::<Atomic>::object_from([("k", BasicHeap::integer(1))])
            .unwrap();
        let local = BasicHeap::<Local>::object_from([("k", BasicHeap::integer(1))])
            .unwrap();
        assert_eq!(atomic, local);
    }

    #[test]
    fn test_get_or_family() {
        let obj = Heap::object_from([("k", Heap::integer(1))]).unwrap();
        assert_eq!(obj.get_or("k", Heap::null()).integer_value().unwrap(), 1);
        assert!(obj.get_or("missing", Heap::null()).is_null());
        assert_eq!(Heap::string("x").integer_or(9), 9);
        assert_eq!(Heap::integer(4).integer_or(9), 4);
        assert_eq!(Heap::integer(4).string_or("fallback"), "fallback");
    }

    #[test]
    fn test_chainable_builders() {
        let obj = Heap::object()
            .add_field("a", Heap::integer(1))
            .unwrap()
            .add_field("b", Heap::integer(2))
            .unwrap()
            .remove_field("a")
            .unwrap();
        assert_eq!(obj.keys().unwrap(), ["b"]);
    }
}
