//! The conversion layer: host values in, host values out.
//!
//! [`ToDart`] normalizes a host value into the tree's semantic types;
//! [`FromDart`] recovers one from either representation. Every primitive,
//! string, container, and tuple shape the model can express has an impl,
//! and user types join by implementing the traits themselves. Conversions
//! that can lose information (unsigned overflow, narrowing, arity or
//! type mismatches) report errors instead of truncating.
//!
//! Comparison against host primitives rides on the same normalization:
//! `packet == 3_i64` builds the right-hand value and reuses deep
//! equality, so integer/decimal comparison stays numeric everywhere.
//!
//! # Examples
//!
//! ```
//! use dart_packet::{FromDart, Packet, ToDart};
//!
//! let packet: Packet = (1_i64, "two", 3.0_f64).to_dart().unwrap().into();
//! let (a, b, c) = <(i64, String, f64)>::from_dart(&packet).unwrap();
//! assert_eq!((a, b.as_str(), c), (1, "two", 3.0));
//! ```

use crate::buffer::BasicBuffer;
use crate::heap::BasicHeap;
use crate::packet::{BasicPacket, Repr};
use crate::raw::Type;
use dart_core::{Error, RcPolicy, Result};
use std::collections::{BTreeMap, HashMap};

/// Conversion of a host value into the tree model.
pub trait ToDart<P: RcPolicy> {
    fn to_dart(&self) -> Result<BasicHeap<P>>;
}

/// Recovery of a host value from a packet in either representation.
pub trait FromDart<P: RcPolicy>: Sized {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self>;
}

// Identity-family conversions.

impl<P: RcPolicy> ToDart<P> for BasicHeap<P> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(self.clone())
    }
}

impl<P: RcPolicy> ToDart<P> for BasicBuffer<P> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(self.to_heap())
    }
}

impl<P: RcPolicy> ToDart<P> for BasicPacket<P> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(match &self.repr {
            Repr::Heap(heap) => heap.clone(),
            Repr::Finalized(buffer) => buffer.to_heap(),
        })
    }
}

impl<P: RcPolicy> FromDart<P> for BasicHeap<P> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        value.to_dart()
    }
}

impl<P: RcPolicy> FromDart<P> for BasicBuffer<P> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        match &value.repr {
            Repr::Finalized(buffer) => Ok(buffer.clone()),
            Repr::Heap(heap) => heap.finalize(),
        }
    }
}

impl<P: RcPolicy> FromDart<P> for BasicPacket<P> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        Ok(value.clone())
    }
}

// Primitives.

impl<P: RcPolicy> ToDart<P> for () {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::null())
    }
}

impl<P: RcPolicy> FromDart<P> for () {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        match value.get_type() {
            Type::Null => Ok(()),
            other => Err(Error::type_mismatch("null", other.name())),
        }
    }
}

impl<P: RcPolicy> ToDart<P> for bool {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::boolean(*self))
    }
}

impl<P: RcPolicy> FromDart<P> for bool {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        value.boolean_value()
    }
}

macro_rules! impl_widening_to_dart {
    ($($ty:ty),*) => {$(
        impl<P: RcPolicy> ToDart<P> for $ty {
            fn to_dart(&self) -> Result<BasicHeap<P>> {
                Ok(BasicHeap::integer(i64::from(*self)))
            }
        }
    )*};
}

impl_widening_to_dart!(i8, i16, i32, i64, u8, u16, u32);

impl<P: RcPolicy> ToDart<P> for isize {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::integer(*self as i64))
    }
}

macro_rules! impl_unsigned_checked_to_dart {
    ($($ty:ty),*) => {$(
        impl<P: RcPolicy> ToDart<P> for $ty {
            fn to_dart(&self) -> Result<BasicHeap<P>> {
                let value = i64::try_from(*self).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "unsigned value {self} exceeds the 64-bit signed range"
                    ))
                })?;
                Ok(BasicHeap::integer(value))
            }
        }
    )*};
}

impl_unsigned_checked_to_dart!(u64, usize);

macro_rules! impl_narrowing_from_dart {
    ($($ty:ty),*) => {$(
        impl<P: RcPolicy> FromDart<P> for $ty {
            fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
                let wide = value.integer_value()?;
                <$ty>::try_from(wide).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "integer {wide} does not fit in {}",
                        std::any::type_name::<$ty>()
                    ))
                })
            }
        }
    )*};
}

impl_narrowing_from_dart!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<P: RcPolicy> ToDart<P> for f32 {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::decimal(f64::from(*self)))
    }
}

impl<P: RcPolicy> ToDart<P> for f64 {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::decimal(*self))
    }
}

impl<P: RcPolicy> FromDart<P> for f64 {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        // Integers widen numerically.
        match value.get_type() {
            Type::Integer => Ok(value.integer_value()? as f64),
            _ => value.decimal_value(),
        }
    }
}

impl<P: RcPolicy> FromDart<P> for f32 {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        f64::from_dart(value).map(|wide| wide as f32)
    }
}

// Strings.

impl<P: RcPolicy> ToDart<P> for str {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::string(self))
    }
}

impl<P: RcPolicy> ToDart<P> for String {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        Ok(BasicHeap::string(self))
    }
}

impl<P: RcPolicy> FromDart<P> for String {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        value.string_copy()
    }
}

// References delegate to their referent.
impl<P: RcPolicy, T: ToDart<P> + ?Sized> ToDart<P> for &T {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        (**self).to_dart()
    }
}

// Option maps to null / value.

impl<P: RcPolicy, T: ToDart<P>> ToDart<P> for Option<T> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        match self {
            Some(value) => value.to_dart(),
            None => Ok(BasicHeap::null()),
        }
    }
}

impl<P: RcPolicy, T: FromDart<P>> FromDart<P> for Option<T> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_dart(value).map(Some)
        }
    }
}

// Sequences map to arrays.

impl<P: RcPolicy, T: ToDart<P>> ToDart<P> for [T] {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        let mut elems = Vec::with_capacity(self.len());
        for value in self {
            elems.push(value.to_dart()?);
        }
        Ok(BasicHeap::array_from(elems))
    }
}

impl<P: RcPolicy, T: ToDart<P>> ToDart<P> for Vec<T> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        self.as_slice().to_dart()
    }
}

impl<P: RcPolicy, T: ToDart<P>, const N: usize> ToDart<P> for [T; N] {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        self.as_slice().to_dart()
    }
}

impl<P: RcPolicy, T: FromDart<P>> FromDart<P> for Vec<T> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        let mut out = Vec::new();
        for element in value.iter()? {
            out.push(T::from_dart(&element)?);
        }
        Ok(out)
    }
}

impl<P: RcPolicy, T: FromDart<P>, const N: usize> FromDart<P> for [T; N] {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        let elements = Vec::<T>::from_dart(value)?;
        let len = elements.len();
        elements.try_into().map_err(|_| {
            Error::InvalidArgument(format!(
                "expected an array of {N} elements, found {len}"
            ))
        })
    }
}

// Maps with string keys map to objects.

impl<P: RcPolicy, K: AsRef<str>, V: ToDart<P>> ToDart<P> for BTreeMap<K, V> {
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        let mut object = BasicHeap::object();
        for (key, value) in self {
            object.insert(key, value.to_dart()?)?;
        }
        Ok(object)
    }
}

impl<P: RcPolicy, K: AsRef<str>, V: ToDart<P>, S: std::hash::BuildHasher> ToDart<P>
    for HashMap<K, V, S>
{
    fn to_dart(&self) -> Result<BasicHeap<P>> {
        let mut object = BasicHeap::object();
        for (key, value) in self {
            object.insert(key, value.to_dart()?)?;
        }
        Ok(object)
    }
}

impl<P: RcPolicy, V: FromDart<P>> FromDart<P> for BTreeMap<String, V> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        let mut out = BTreeMap::new();
        for (key, element) in value.pair_iter()? {
            out.insert(key.to_owned(), V::from_dart(&element)?);
        }
        Ok(out)
    }
}

impl<P: RcPolicy, V: FromDart<P>> FromDart<P> for HashMap<String, V> {
    fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
        let mut out = HashMap::new();
        for (key, element) in value.pair_iter()? {
            out.insert(key.to_owned(), V::from_dart(&element)?);
        }
        Ok(out)
    }
}

// Tuples map to fixed-arity arrays.

macro_rules! impl_tuple_convert {
    ($len:expr, $($name:ident : $index:tt),+) => {
        impl<P: RcPolicy, $($name: ToDart<P>),+> ToDart<P> for ($($name,)+) {
            fn to_dart(&self) -> Result<BasicHeap<P>> {
                Ok(BasicHeap::array_from([$(self.$index.to_dart()?),+]))
            }
        }

        impl<P: RcPolicy, $($name: FromDart<P>),+> FromDart<P> for ($($name,)+) {
            fn from_dart(value: &BasicPacket<P>) -> Result<Self> {
                let len = value.size()?;
                if len != $len {
                    return Err(Error::InvalidArgument(format!(
                        "expected an array of {} elements, found {len}", $len
                    )));
                }
                Ok(($($name::from_dart(&value.at_index($index)?)?,)+))
            }
        }
    };
}

impl_tuple_convert!(1, A: 0);
impl_tuple_convert!(2, A: 0, B: 1);
impl_tuple_convert!(3, A: 0, B: 1, C: 2);
impl_tuple_convert!(4, A: 0, B: 1, C: 2, D: 3);
impl_tuple_convert!(5, A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple_convert!(6, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple_convert!(7, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple_convert!(8, A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

// Comparison against host primitives: normalize the scalar and reuse
// deep equality, which already handles integer/decimal numerics.

macro_rules! impl_scalar_eq {
    ($ty:ty, $ctor:expr) => {
        impl<P: RcPolicy> PartialEq<$ty> for BasicHeap<P> {
            fn eq(&self, other: &$ty) -> bool {
                *self == $ctor(other)
            }
        }

        impl<P: RcPolicy> PartialEq<BasicHeap<P>> for $ty {
            fn eq(&self, other: &BasicHeap<P>) -> bool {
                other == self
            }
        }

        impl<P: RcPolicy> PartialEq<$ty> for BasicBuffer<P> {
            fn eq(&self, other: &$ty) -> bool {
                *self == $ctor(other)
            }
        }

        impl<P: RcPolicy> PartialEq<BasicBuffer<P>> for $ty {
            fn eq(&self, other: &BasicBuffer<P>) -> bool {
                other == self
            }
        }

        impl<P: RcPolicy> PartialEq<$ty> for BasicPacket<P> {
            fn eq(&self, other: &$ty) -> bool {
                match &self.repr {
                    Repr::Heap(heap) => heap == other,
                    Repr::Finalized(buffer) => buffer == other,
                }
            }
        }

        impl<P: RcPolicy> PartialEq<BasicPacket<P>> for $ty {
            fn eq(&self, other: &BasicPacket<P>) -> bool {
                other == self
            }
        }
    };
}

impl_scalar_eq!(bool, |v: &bool| BasicHeap::<P>::boolean(*v));
impl_scalar_eq!(i32, |v: &i32| BasicHeap::<P>::integer(i64::from(*v)));
impl_scalar_eq!(i64, |v: &i64| BasicHeap::<P>::integer(*v));
impl_scalar_eq!(f64, |v: &f64| BasicHeap::<P>::decimal(*v));
impl_scalar_eq!(&str, |v: &&str| BasicHeap::<P>::string(*v));
impl_scalar_eq!(String, |v: &String| BasicHeap::<P>::string(v));

#[cfg(test)]
mod tests {
    use super::*;
    use dart_core::Atomic;

    type Heap = BasicHeap<Atomic>;
    type Packet = BasicPacket<Atomic>;

    fn packet_of<T: ToDart<Atomic>>(value: T) -> Packet {
        value.to_dart().unwrap().into()
    }

    #[test]
    fn test_primitive_round_trips() {
        assert_eq!(bool::from_dart(&packet_of(true)).unwrap(), true);
        assert_eq!(i64::from_dart(&packet_of(-9_i64)).unwrap(), -9);
        assert_eq!(u16::from_dart(&packet_of(9_u16)).unwrap(), 9);
        assert_eq!(f64::from_dart(&packet_of(0.25_f64)).unwrap(), 0.25);
        assert_eq!(String::from_dart(&packet_of("text")).unwrap(), "text");
        assert_eq!(<()>::from_dart(&packet_of(())).unwrap(), ());
    }

    #[test]
    fn test_unsigned_overflow_rejected() {
        let oversized = u64::MAX;
        assert!(matches!(
            ToDart::<Atomic>::to_dart(&oversized),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ToDart::<Atomic>::to_dart(&(i64::MAX as u64)).is_ok());
    }

    #[test]
    fn test_narrowing_rejected() {
        let packet = packet_of(300_i64);
        assert!(matches!(
            u8::from_dart(&packet),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(u16::from_dart(&packet).unwrap(), 300);
    }

    #[test]
    fn test_integer_widens_to_float() {
        assert_eq!(f64::from_dart(&packet_of(3_i64)).unwrap(), 3.0);
    }

    #[test]
    fn test_option_round_trip() {
        let some: Option<i64> = Some(4);
        let none: Option<i64> = None;
        assert_eq!(Option::<i64>::from_dart(&packet_of(some)).unwrap(), Some(4));
        assert_eq!(Option::<i64>::from_dart(&packet_of(none)).unwrap(), None);
    }

    #[test]
    fn test_container_round_trips() {
        let list = vec![1_i64, 2, 3];
        assert_eq!(Vec::<i64>::from_dart(&packet_of(list.clone())).unwrap(), list);

        let mut map = BTreeMap::new();
        map.insert("one".to_owned(), 1_i64);
        map.insert("two".to_owned(), 2_i64);
        assert_eq!(
            BTreeMap::<String, i64>::from_dart(&packet_of(map.clone())).unwrap(),
            map
        );
    }

    #[test]
    fn test_tuple_round_trip() {
        let tuple = (1_i64, "two".to_owned(), 3.0_f64);
        let packet = packet_of(tuple.clone());
        assert!(packet.is_array());
        assert_eq!(<(i64, String, f64)>::from_dart(&packet).unwrap(), tuple);
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let packet = packet_of((1_i64, 2_i64));
        assert!(matches!(
            <(i64, i64, i64)>::from_dart(&packet),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_dart_works_on_finalized() {
        let mut packet = Packet::object_from([("xs", vec![1_i64, 2])]).unwrap();
        packet.finalize().unwrap();
        let xs = Vec::<i64>::from_dart(&packet.get("xs").unwrap()).unwrap();
        assert_eq!(xs, [1, 2]);
    }

    #[test]
    fn test_scalar_equality() {
        let mut packet =
            Packet::object_from([("i", Packet::integer(3)), ("d", Packet::decimal(3.0))])
                .unwrap();
        for _ in 0..2 {
            assert!(packet.get("i").unwrap() == 3_i64);
            // Numeric comparison crosses the integer/decimal divide.
            assert!(packet.get("i").unwrap() == 3.0_f64);
            assert!(packet.get("d").unwrap() == 3_i64);
            assert!(3_i64 == packet.get("d").unwrap());
            assert!(packet.get("i").unwrap() != 4_i64);
            packet.finalize().unwrap();
        }
        assert!(Heap::string("x") == "x");
        assert!("x" == Heap::string("x"));
        assert!(Heap::boolean(true) == true);
    }

    #[test]
    fn test_heap_identity_conversion_is_cheap() {
        let heap = Heap::object_from([("k", Heap::integer(1))]).unwrap();
        let copy: Heap = heap.to_dart().unwrap();
        // Identity conversion shares the container.
        assert_eq!(copy.use_count(), Some(2));
        assert_eq!(heap, copy);
    }
}
