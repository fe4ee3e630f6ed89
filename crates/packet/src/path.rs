//! Dotted-path lookup.
//!
//! `get_nested("a.b.c")` walks objects left to right, one segment per
//! separator. Any miss, whether an absent key or a non-object in the
//! middle of the path, yields null rather than an error, so probing deep
//! structure needs no error plumbing.

use crate::buffer::BasicBuffer;
use crate::heap::BasicHeap;
use crate::packet::{BasicPacket, Repr};
use dart_core::RcPolicy;

impl<P: RcPolicy> BasicHeap<P> {
    /// Nested lookup with `.` as the separator.
    pub fn get_nested(&self, path: &str) -> Self {
        self.get_nested_sep(path, '.')
    }

    /// Nested lookup with a caller-chosen separator.
    pub fn get_nested_sep(&self, path: &str, separator: char) -> Self {
        let mut current = self.clone();
        for segment in path.split(separator) {
            match current.find(segment) {
                Some(value) => current = value,
                None => return Self::null(),
            }
        }
        current
    }
}

impl<P: RcPolicy> BasicBuffer<P> {
    /// Nested lookup with `.` as the separator.
    pub fn get_nested(&self, path: &str) -> Self {
        self.get_nested_sep(path, '.')
    }

    /// Nested lookup with a caller-chosen separator.
    pub fn get_nested_sep(&self, path: &str, separator: char) -> Self {
        let mut current = self.clone();
        for segment in path.split(separator) {
            match current.find(segment) {
                Some(value) => current = value,
                None => return self.null_view(),
            }
        }
        current
    }
}

impl<P: RcPolicy> BasicPacket<P> {
    /// Nested lookup with `.` as the separator.
    pub fn get_nested(&self, path: &str) -> Self {
        self.get_nested_sep(path, '.')
    }

    /// Nested lookup with a caller-chosen separator.
    pub fn get_nested_sep(&self, path: &str, separator: char) -> Self {
        match &self.repr {
            Repr::Heap(heap) => heap.get_nested_sep(path, separator).into(),
            Repr::Finalized(buffer) => buffer.get_nested_sep(path, separator).into(),
        }
    }
}
