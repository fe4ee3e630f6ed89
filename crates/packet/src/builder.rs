//! Push-style tree construction.
//!
//! External parsers drive a [`TreeBuilder`] with begin/end and scalar
//! events and collect the finished tree at the end. The builder keeps a
//! stack of open containers and an optional pending key, so it accepts
//! exactly the event sequences a well-formed document produces; anything
//! else fails with `InvalidArgument` and leaves the builder unusable
//! state-wise but memory-safe.
//!
//! # Examples
//!
//! ```
//! use dart_packet::{Atomic, TreeBuilder};
//!
//! let mut builder = TreeBuilder::<Atomic>::new();
//! builder.begin_object().unwrap();
//! builder.key("answer").unwrap();
//! builder.integer_value(42).unwrap();
//! builder.end_object().unwrap();
//!
//! let tree = builder.finish().unwrap();
//! assert_eq!(tree.at("answer").unwrap().integer_value().unwrap(), 42);
//! ```

use crate::heap::BasicHeap;
use dart_core::{Error, RcPolicy, Result};

enum Frame<P: RcPolicy> {
    Object {
        object: BasicHeap<P>,
        pending_key: Option<String>,
    },
    Array(BasicHeap<P>),
}

/// Event sink that assembles a mutable tree.
pub struct TreeBuilder<P: RcPolicy> {
    stack: Vec<Frame<P>>,
    root: Option<BasicHeap<P>>,
}

impl<P: RcPolicy> Default for TreeBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: RcPolicy> TreeBuilder<P> {
    pub fn new() -> Self {
        TreeBuilder {
            stack: Vec::new(),
            root: None,
        }
    }

    fn misuse(message: &str) -> Error {
        Error::InvalidArgument(format!("builder misuse: {message}"))
    }

    /// Accept a finished value: attach it to the open container or make
    /// it the root.
    fn accept(&mut self, value: BasicHeap<P>) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object {
                object,
                pending_key,
            }) => match pending_key.take() {
                Some(key) => object.insert(key, value),
                None => Err(Self::misuse("value inside an object requires a key first")),
            },
            Some(Frame::Array(array)) => array.push_back(value),
            None => {
                if self.root.is_some() {
                    return Err(Self::misuse("root value already produced"));
                }
                self.root = Some(value);
                Ok(())
            }
        }
    }

    pub fn begin_object(&mut self) -> Result<()> {
        // The slot check happens when the object closes and is accepted,
        // except the root-already-done case which fails fast here.
        if self.stack.is_empty() && self.root.is_some() {
            return Err(Self::misuse("root value already produced"));
        }
        self.stack.push(Frame::Object {
            object: BasicHeap::object(),
            pending_key: None,
        });
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Object {
                object,
                pending_key: None,
            }) => self.accept(object),
            Some(Frame::Object {
                pending_key: Some(key),
                ..
            }) => Err(Self::misuse(&format!("key {key:?} has no value"))),
            Some(frame @ Frame::Array(_)) => {
                self.stack.push(frame);
                Err(Self::misuse("end_object inside an array"))
            }
            None => Err(Self::misuse("end_object with no open container")),
        }
    }

    pub fn begin_array(&mut self) -> Result<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(Self::misuse("root value already produced"));
        }
        self.stack.push(Frame::Array(BasicHeap::array()));
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array(array)) => self.accept(array),
            Some(frame @ Frame::Object { .. }) => {
                self.stack.push(frame);
                Err(Self::misuse("end_array inside an object"))
            }
            None => Err(Self::misuse("end_array with no open container")),
        }
    }

    /// Name the next value inside the open object.
    pub fn key(&mut self, key: impl AsRef<str>) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { pending_key, .. }) => {
                if pending_key.is_some() {
                    return Err(Self::misuse("key already pending"));
                }
                *pending_key = Some(key.as_ref().to_owned());
                Ok(())
            }
            _ => Err(Self::misuse("key outside an object")),
        }
    }

    pub fn null_value(&mut self) -> Result<()> {
        self.accept(BasicHeap::null())
    }

    pub fn boolean_value(&mut self, value: bool) -> Result<()> {
        self.accept(BasicHeap::boolean(value))
    }

    pub fn integer_value(&mut self, value: i64) -> Result<()> {
        self.accept(BasicHeap::integer(value))
    }

    pub fn decimal_value(&mut self, value: f64) -> Result<()> {
        self.accept(BasicHeap::decimal(value))
    }

    pub fn string_value(&mut self, value: impl AsRef<str>) -> Result<()> {
        self.accept(BasicHeap::string(value))
    }

    /// Take the finished tree. Every opened container must be closed.
    pub fn finish(mut self) -> Result<BasicHeap<P>> {
        if !self.stack.is_empty() {
            return Err(Self::misuse("unclosed container"));
        }
        self.root
            .take()
            .ok_or_else(|| Self::misuse("no value produced"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dart_core::Atomic;

    type Builder = TreeBuilder<Atomic>;
    type Heap = BasicHeap<Atomic>;

    #[test]
    fn test_nested_document() {
        let mut builder = Builder::new();
        builder.begin_object().unwrap();
        builder.key("name").unwrap();
        builder.string_value("dart").unwrap();
        builder.key("tags").unwrap();
        builder.begin_array().unwrap();
        builder.integer_value(1).unwrap();
        builder.null_value().unwrap();
        builder.boolean_value(true).unwrap();
        builder.end_array().unwrap();
        builder.key("nested").unwrap();
        builder.begin_object().unwrap();
        builder.key("pi").unwrap();
        builder.decimal_value(3.25).unwrap();
        builder.end_object().unwrap();
        builder.end_object().unwrap();

        let tree = builder.finish().unwrap();
        let expected = Heap::object_from([
            ("name", Heap::string("dart")),
            (
                "tags",
                Heap::array_from([Heap::integer(1), Heap::null(), Heap::boolean(true)]),
            ),
            (
                "nested",
                Heap::object_from([("pi", Heap::decimal(3.25))]).unwrap(),
            ),
        ])
        .unwrap();
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_scalar_root() {
        let mut builder = Builder::new();
        builder.integer_value(7).unwrap();
        assert_eq!(builder.finish().unwrap(), Heap::integer(7));
    }

    #[test]
    fn test_misuse_value_without_key() {
        let mut builder = Builder::new();
        builder.begin_object().unwrap();
        assert!(builder.integer_value(1).is_err());
    }

    #[test]
    fn test_misuse_dangling_key() {
        let mut builder = Builder::new();
        builder.begin_object().unwrap();
        builder.key("k").unwrap();
        assert!(builder.end_object().is_err());
    }

    #[test]
    fn test_misuse_mismatched_end() {
        let mut builder = Builder::new();
        builder.begin_array().unwrap();
        assert!(builder.end_object().is_err());
    }

    #[test]
    fn test_misuse_unclosed_container() {
        let mut builder = Builder::new();
        builder.begin_object().unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_misuse_double_root() {
        let mut builder = Builder::new();
        builder.integer_value(1).unwrap();
        assert!(builder.integer_value(2).is_err());
        assert!(builder.begin_object().is_err());
    }

    #[test]
    fn test_misuse_key_outside_object() {
        let mut builder = Builder::new();
        assert!(builder.key("k").is_err());
        builder.begin_array().unwrap();
        assert!(builder.key("k").is_err());
    }
}
