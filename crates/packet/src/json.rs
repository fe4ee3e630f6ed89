//! JSON exchange (feature `json`).
//!
//! Parsing stays outside the core: `serde_json` produces the document and
//! this module drives a [`TreeBuilder`] with it, so any other parser
//! could feed the same callbacks. Emission walks whichever representation
//! is active through a `serde::Serialize` impl; a finalized packet
//! serializes straight out of its buffer without lifting.
//!
//! JSON numbers become integers when they fit `i64` and decimals
//! otherwise; object key order follows the tree's canonical (length,
//! then bytes) order on output.

use crate::builder::TreeBuilder;
use crate::heap::BasicHeap;
use crate::packet::BasicPacket;
use crate::raw::Type;
use dart_core::{Error, RcPolicy, Result};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

impl<P: RcPolicy> BasicPacket<P> {
    /// Parse a JSON document into a mutable-form packet.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_str(text).map_err(|err| Error::Parse(err.to_string()))?;
        let mut builder = TreeBuilder::new();
        feed(&mut builder, &document)?;
        Ok(builder.finish()?.into())
    }

    /// Render this packet as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::Parse(err.to_string()))
    }
}

/// Replay a parsed document into the builder callbacks.
fn feed<P: RcPolicy>(builder: &mut TreeBuilder<P>, value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Null => builder.null_value(),
        serde_json::Value::Bool(b) => builder.boolean_value(*b),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => builder.integer_value(int),
            None => {
                let dec = number.as_f64().ok_or_else(|| {
                    Error::Parse(format!("unrepresentable number {number}"))
                })?;
                builder.decimal_value(dec)
            }
        },
        serde_json::Value::String(s) => builder.string_value(s),
        serde_json::Value::Array(elements) => {
            builder.begin_array()?;
            for element in elements {
                feed(builder, element)?;
            }
            builder.end_array()
        }
        serde_json::Value::Object(members) => {
            builder.begin_object()?;
            for (key, member) in members {
                builder.key(key)?;
                feed(builder, member)?;
            }
            builder.end_object()
        }
    }
}

impl<P: RcPolicy> Serialize for BasicPacket<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_any(self, serializer)
    }
}

impl<P: RcPolicy> Serialize for BasicHeap<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_any(&BasicPacket::from(self.clone()), serializer)
    }
}

/// Serialize through the uniform observers so both representations share
/// one code path.
fn serialize_any<P: RcPolicy, S: Serializer>(
    value: &BasicPacket<P>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::Error as _;
    match value.get_type() {
        Type::Null => serializer.serialize_unit(),
        Type::Boolean => {
            serializer.serialize_bool(value.boolean_value().map_err(S::Error::custom)?)
        }
        Type::Integer => serializer.serialize_i64(value.integer_value().map_err(S::Error::custom)?),
        Type::Decimal => serializer.serialize_f64(value.decimal_value().map_err(S::Error::custom)?),
        Type::String => {
            serializer.serialize_str(value.string_view().map_err(S::Error::custom)?)
        }
        Type::Array => {
            let iter = value.iter().map_err(S::Error::custom)?;
            let mut seq = serializer.serialize_seq(Some(iter.len()))?;
            for element in iter {
                seq.serialize_element(&element)?;
            }
            seq.end()
        }
        Type::Object => {
            let iter = value.pair_iter().map_err(S::Error::custom)?;
            let mut map = serializer.serialize_map(Some(iter.len()))?;
            for (key, member) in iter {
                map.serialize_entry(key, &member)?;
            }
            map.end()
        }
    }
}
