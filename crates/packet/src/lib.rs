//! Dual-representation tree data model for JSON-like structured data.
//!
//! The same logical value exists in one of two forms:
//!
//! - the **heap** form ([`BasicHeap`]): a mutable in-memory tree built
//!   from refcounted containers with copy-on-write sharing
//! - the **buffer** form ([`BasicBuffer`]): a self-contained, aligned
//!   byte region that needs no parsing, no allocation, and no
//!   deserialization to traverse, suitable as a zero-copy message
//!   payload between processes
//!
//! [`BasicPacket`] unifies both behind one API: observation dispatches to
//! the active side, mutation lifts back to the heap form, and
//! `finalize`/`definalize` convert explicitly. Thread-safety is part of
//! the type: the `Atomic` policy (aliases [`Packet`], [`Heap`],
//! [`Buffer`]) shares through `Arc`, the `Local` policy
//! ([`LocalPacket`], [`LocalHeap`], [`LocalBuffer`]) through `Rc`.
//!
//! # Examples
//!
//! ```
//! use dart_packet::Packet;
//!
//! let mut msg = Packet::object();
//! msg.insert("hello", "world").unwrap();
//! msg.finalize().unwrap();
//!
//! // Ship the bytes anywhere; adoption re-validates them.
//! let wire = msg.dup_bytes().unwrap();
//! let received = Packet::from_bytes(&wire).unwrap();
//! assert_eq!(received.get("hello").unwrap().string_copy().unwrap(), "world");
//! ```

pub mod buffer;
pub mod builder;
pub mod convert;
pub mod heap;
pub mod iter;
#[cfg(feature = "json")]
pub mod json;
mod path;
pub mod raw;
mod sso;

pub mod packet;

pub use buffer::BasicBuffer;
pub use builder::TreeBuilder;
pub use convert::{FromDart, ToDart};
pub use heap::{BasicHeap, MAX_KEY_LEN};
pub use iter::{KeyIter, PairIter, ValueIter};
pub use packet::BasicPacket;
pub use raw::{RawType, Type};
pub use sso::SSO_MAX;

pub use dart_core::{AlignedBytes, Atomic, Error, Local, RcPolicy, Result};

/// Thread-safe packet (`Arc`-backed sharing).
pub type Packet = BasicPacket<Atomic>;
/// Thread-safe mutable tree.
pub type Heap = BasicHeap<Atomic>;
/// Thread-safe finalized tree.
pub type Buffer = BasicBuffer<Atomic>;

/// Single-threaded packet (`Rc`-backed sharing).
pub type LocalPacket = BasicPacket<Local>;
/// Single-threaded mutable tree.
pub type LocalHeap = BasicHeap<Local>;
/// Single-threaded finalized tree.
pub type LocalBuffer = BasicBuffer<Local>;
