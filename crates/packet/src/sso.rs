//! String storage for the mutable tree.
//!
//! Short strings live inline in the value itself (no allocation); longer
//! ones go on a shared, reference-counted `str` allocation. The inline
//! buffer stores "bytes remaining" in its final byte, so a full inline
//! string's counter doubles as its nul terminator.
//!
//! Object keys sort by length first, then lexicographically by bytes,
//! the same total order the finalized vtable is laid out in. [`KeyRef`]
//! carries that order for borrowed lookups without allocating.

use dart_core::RcPolicy;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

/// Longest string stored inline.
pub const SSO_MAX: usize = 15;

/// Inline string: `SSO_MAX` data bytes plus one trailing byte holding
/// `SSO_MAX - len`.
#[derive(Clone, Copy)]
pub(crate) struct InlineString {
    buf: [u8; SSO_MAX + 1],
}

impl InlineString {
    /// `None` if `s` does not fit inline.
    pub(crate) fn new(s: &str) -> Option<Self> {
        if s.len() > SSO_MAX {
            return None;
        }
        let mut buf = [0u8; SSO_MAX + 1];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        buf[SSO_MAX] = (SSO_MAX - s.len()) as u8;
        Some(InlineString { buf })
    }

    pub(crate) fn len(&self) -> usize {
        SSO_MAX - self.buf[SSO_MAX] as usize
    }

    pub(crate) fn as_str(&self) -> &str {
        // Safety: the buffer was copied from a &str in new(), whole, so
        // the prefix of length len() is valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.buf[..self.len()]) }
    }
}

/// Heap-side string: inline or shared.
pub(crate) enum HeapString<P: RcPolicy> {
    Inline(InlineString),
    Shared(P::Handle<str>),
}

impl<P: RcPolicy> HeapString<P> {
    pub(crate) fn new(s: &str) -> Self {
        match InlineString::new(s) {
            Some(inline) => HeapString::Inline(inline),
            None => HeapString::Shared(P::share_str(s)),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            HeapString::Inline(s) => s.as_str(),
            HeapString::Shared(s) => s,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Live handle count for shared strings; `None` while inline.
    pub(crate) fn use_count(&self) -> Option<usize> {
        match self {
            HeapString::Inline(_) => None,
            HeapString::Shared(s) => Some(P::use_count(s)),
        }
    }
}

impl<P: RcPolicy> Clone for HeapString<P> {
    fn clone(&self) -> Self {
        match self {
            HeapString::Inline(s) => HeapString::Inline(*s),
            HeapString::Shared(s) => HeapString::Shared(s.clone()),
        }
    }
}

impl<P: RcPolicy> fmt::Debug for HeapString<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<P: RcPolicy> PartialEq for HeapString<P> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<P: RcPolicy> Eq for HeapString<P> {}

impl<P: RcPolicy> PartialOrd for HeapString<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: RcPolicy> Ord for HeapString<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        KeyRef::new(self.as_str()).cmp(KeyRef::new(other.as_str()))
    }
}

impl<P: RcPolicy> Borrow<KeyRef> for HeapString<P> {
    fn borrow(&self) -> &KeyRef {
        KeyRef::new(self.as_str())
    }
}

/// Borrowed key view ordered by (length, then bytes).
///
/// Lets object lookups run against a plain `&str` with no allocation
/// while still matching the map's key order.
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct KeyRef(str);

impl KeyRef {
    pub(crate) fn new(s: &str) -> &KeyRef {
        // Safety: KeyRef is repr(transparent) over str, so the pointer
        // cast preserves layout and lifetime.
        unsafe { &*(s as *const str as *const KeyRef) }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for KeyRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}
