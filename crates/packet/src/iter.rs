//! Iteration over both representations.
//!
//! Three flavors: values ([`ValueIter`]), object keys ([`KeyIter`]), and
//! key/value pairs ([`PairIter`]). On the heap side an iterator wraps the
//! container iterator; on the buffer side it is an index range plus the
//! vtable decode, so iterating a finalized tree allocates nothing beyond
//! the owner-promoted children it yields.
//!
//! All three are double-ended and exact-size.

use crate::buffer::BasicBuffer;
use crate::heap::{BasicHeap, HeapData};
use crate::packet::{BasicPacket, Repr};
use crate::sso::HeapString;
use dart_core::{Error, RcPolicy, Result};
use std::collections::btree_map;
use std::ops::Range;

enum ValueRepr<'a, P: RcPolicy> {
    HeapObject(btree_map::Values<'a, HeapString<P>, BasicHeap<P>>),
    HeapArray(std::slice::Iter<'a, BasicHeap<P>>),
    Buffer {
        buffer: &'a BasicBuffer<P>,
        range: Range<usize>,
    },
}

/// Iterator over the values of an object or the elements of an array.
pub struct ValueIter<'a, P: RcPolicy> {
    inner: ValueRepr<'a, P>,
}

impl<P: RcPolicy> Iterator for ValueIter<'_, P> {
    type Item = BasicPacket<P>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ValueRepr::HeapObject(values) => values.next().map(|v| v.clone().into()),
            ValueRepr::HeapArray(elems) => elems.next().map(|v| v.clone().into()),
            ValueRepr::Buffer { buffer, range } => {
                range.next().map(|i| buffer.child_at(i).into())
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.inner {
            ValueRepr::HeapObject(values) => values.len(),
            ValueRepr::HeapArray(elems) => elems.len(),
            ValueRepr::Buffer { range, .. } => range.len(),
        };
        (len, Some(len))
    }
}

impl<P: RcPolicy> DoubleEndedIterator for ValueIter<'_, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ValueRepr::HeapObject(values) => values.next_back().map(|v| v.clone().into()),
            ValueRepr::HeapArray(elems) => elems.next_back().map(|v| v.clone().into()),
            ValueRepr::Buffer { buffer, range } => {
                range.next_back().map(|i| buffer.child_at(i).into())
            }
        }
    }
}

impl<P: RcPolicy> ExactSizeIterator for ValueIter<'_, P> {}

enum KeyRepr<'a, P: RcPolicy> {
    Heap(btree_map::Keys<'a, HeapString<P>, BasicHeap<P>>),
    Buffer {
        buffer: &'a BasicBuffer<P>,
        range: Range<usize>,
    },
}

/// Iterator over an object's keys, in vtable order.
pub struct KeyIter<'a, P: RcPolicy> {
    inner: KeyRepr<'a, P>,
}

impl<'a, P: RcPolicy> Iterator for KeyIter<'a, P> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            KeyRepr::Heap(keys) => keys.next().map(HeapString::as_str),
            KeyRepr::Buffer { buffer, range } => {
                range.next().map(|i| buffer.key_str_at(i))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.inner {
            KeyRepr::Heap(keys) => keys.len(),
            KeyRepr::Buffer { range, .. } => range.len(),
        };
        (len, Some(len))
    }
}

impl<P: RcPolicy> DoubleEndedIterator for KeyIter<'_, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            KeyRepr::Heap(keys) => keys.next_back().map(HeapString::as_str),
            KeyRepr::Buffer { buffer, range } => {
                range.next_back().map(|i| buffer.key_str_at(i))
            }
        }
    }
}

impl<P: RcPolicy> ExactSizeIterator for KeyIter<'_, P> {}

enum PairRepr<'a, P: RcPolicy> {
    Heap(btree_map::Iter<'a, HeapString<P>, BasicHeap<P>>),
    Buffer {
        buffer: &'a BasicBuffer<P>,
        range: Range<usize>,
    },
}

/// Iterator over an object's key/value pairs, in vtable order.
pub struct PairIter<'a, P: RcPolicy> {
    inner: PairRepr<'a, P>,
}

impl<'a, P: RcPolicy> Iterator for PairIter<'a, P> {
    type Item = (&'a str, BasicPacket<P>);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            PairRepr::Heap(pairs) => {
                pairs.next().map(|(k, v)| (k.as_str(), v.clone().into()))
            }
            PairRepr::Buffer { buffer, range } => range
                .next()
                .map(|i| (buffer.key_str_at(i), buffer.child_at(i).into())),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.inner {
            PairRepr::Heap(pairs) => pairs.len(),
            PairRepr::Buffer { range, .. } => range.len(),
        };
        (len, Some(len))
    }
}

impl<P: RcPolicy> DoubleEndedIterator for PairIter<'_, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            PairRepr::Heap(pairs) => {
                pairs.next_back().map(|(k, v)| (k.as_str(), v.clone().into()))
            }
            PairRepr::Buffer { buffer, range } => range
                .next_back()
                .map(|i| (buffer.key_str_at(i), buffer.child_at(i).into())),
        }
    }
}

impl<P: RcPolicy> ExactSizeIterator for PairIter<'_, P> {}

impl<P: RcPolicy> BasicHeap<P> {
    /// Values of an object or elements of an array.
    pub fn iter(&self) -> Result<ValueIter<'_, P>> {
        let inner = match &self.data {
            HeapData::Object(fields) => ValueRepr::HeapObject(fields.values()),
            HeapData::Array(elems) => ValueRepr::HeapArray(elems.iter()),
            other => {
                return Err(Error::type_mismatch("object or array", other.ty().name()));
            }
        };
        Ok(ValueIter { inner })
    }

    /// Keys of an object.
    pub fn key_iter(&self) -> Result<KeyIter<'_, P>> {
        Ok(KeyIter {
            inner: KeyRepr::Heap(self.fields()?.keys()),
        })
    }

    /// Key/value pairs of an object.
    pub fn pair_iter(&self) -> Result<PairIter<'_, P>> {
        Ok(PairIter {
            inner: PairRepr::Heap(self.fields()?.iter()),
        })
    }
}

impl<P: RcPolicy> BasicBuffer<P> {
    /// Values of an object or elements of an array.
    pub fn iter(&self) -> Result<ValueIter<'_, P>> {
        if !self.is_object() && !self.is_array() {
            return Err(Error::type_mismatch(
                "object or array",
                self.get_type().name(),
            ));
        }
        Ok(ValueIter {
            inner: ValueRepr::Buffer {
                buffer: self,
                range: 0..self.raw().size(),
            },
        })
    }

    /// Keys of an object.
    pub fn key_iter(&self) -> Result<KeyIter<'_, P>> {
        self.require_object_for_iter()?;
        Ok(KeyIter {
            inner: KeyRepr::Buffer {
                buffer: self,
                range: 0..self.raw().size(),
            },
        })
    }

    /// Key/value pairs of an object.
    pub fn pair_iter(&self) -> Result<PairIter<'_, P>> {
        self.require_object_for_iter()?;
        Ok(PairIter {
            inner: PairRepr::Buffer {
                buffer: self,
                range: 0..self.raw().size(),
            },
        })
    }

    fn require_object_for_iter(&self) -> Result<()> {
        if self.is_object() {
            Ok(())
        } else {
            Err(Error::type_mismatch("object", self.get_type().name()))
        }
    }
}

impl<P: RcPolicy> BasicPacket<P> {
    /// Values of an object or elements of an array.
    pub fn iter(&self) -> Result<ValueIter<'_, P>> {
        match &self.repr {
            Repr::Heap(heap) => heap.iter(),
            Repr::Finalized(buffer) => buffer.iter(),
        }
    }

    /// Keys of an object.
    pub fn key_iter(&self) -> Result<KeyIter<'_, P>> {
        match &self.repr {
            Repr::Heap(heap) => heap.key_iter(),
            Repr::Finalized(buffer) => buffer.key_iter(),
        }
    }

    /// Key/value pairs of an object.
    pub fn pair_iter(&self) -> Result<PairIter<'_, P>> {
        match &self.repr {
            Repr::Heap(heap) => heap.pair_iter(),
            Repr::Finalized(buffer) => buffer.pair_iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dart_core::Atomic;

    type Packet = BasicPacket<Atomic>;

    fn sample() -> Packet {
        Packet::object_from([("a", 1_i64), ("bb", 2_i64), ("aa", 3_i64)]).unwrap()
    }

    #[test]
    fn test_key_iter_both_sides() {
        let mut packet = sample();
        for _ in 0..2 {
            let keys: Vec<&str> = packet.key_iter().unwrap().collect();
            assert_eq!(keys, ["a", "aa", "bb"]);
            packet.finalize().unwrap();
        }
    }

    #[test]
    fn test_value_iter_reverse() {
        let mut packet = sample();
        for _ in 0..2 {
            let forward: Vec<i64> = packet
                .iter()
                .unwrap()
                .map(|v| v.integer_value().unwrap())
                .collect();
            let reverse: Vec<i64> = packet
                .iter()
                .unwrap()
                .rev()
                .map(|v| v.integer_value().unwrap())
                .collect();
            assert_eq!(forward, [1, 3, 2]);
            assert_eq!(reverse, [2, 3, 1]);
            packet.finalize().unwrap();
        }
    }

    #[test]
    fn test_pair_iter_both_sides() {
        let mut packet = sample();
        for _ in 0..2 {
            let pairs: Vec<(String, i64)> = packet
                .pair_iter()
                .unwrap()
                .map(|(k, v)| (k.to_owned(), v.integer_value().unwrap()))
                .collect();
            assert_eq!(
                pairs,
                [
                    ("a".to_owned(), 1),
                    ("aa".to_owned(), 3),
                    ("bb".to_owned(), 2)
                ]
            );
            packet.finalize().unwrap();
        }
    }

    #[test]
    fn test_array_iteration() {
        let packet = Packet::array_from([10_i64, 20, 30]).unwrap();
        let sum: i64 = packet.iter().unwrap().map(|v| v.integer_value().unwrap()).sum();
        assert_eq!(sum, 60);
        assert_eq!(packet.iter().unwrap().len(), 3);
        assert!(packet.key_iter().is_err());

        // Arrays cannot finalize on their own; wrap in an object.
        let mut wrapper = Packet::object().add_field("arr", packet.clone()).unwrap();
        wrapper.finalize().unwrap();
        let arr = wrapper.get("arr").unwrap();
        let collected: Vec<i64> =
            arr.iter().unwrap().map(|v| v.integer_value().unwrap()).collect();
        assert_eq!(collected, [10, 20, 30]);
    }

    #[test]
    fn test_iter_on_primitive_fails() {
        let packet = Packet::integer(3);
        assert!(packet.iter().is_err());
        assert!(packet.pair_iter().is_err());
    }
}
