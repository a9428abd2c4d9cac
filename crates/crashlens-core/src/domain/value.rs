//! JSON-shaped value tree
//!
//! [`ValueNode`] is the closed set of values a record may hold. It is a plain
//! tree: arrays keep their element order, objects keep insertion order for
//! reproducible serialization but compare without regard to key order.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Insertion-ordered property map used by object nodes.
pub type ValueMap = IndexMap<String, ValueNode>;

/// A JSON-representable value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueNode {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    /// Floating point number; only finite values are transferable
    Float(f64),
    String(String),
    Array(Vec<ValueNode>),
    Object(ValueMap),
}

impl ValueNode {
    /// Creates an empty object node.
    pub fn object() -> Self {
        ValueNode::Object(ValueMap::new())
    }

    /// Creates an empty array node.
    pub fn array() -> Self {
        ValueNode::Array(Vec::new())
    }

    /// Returns true if this value, and everything below it, can be written as JSON.
    pub fn is_transferable(&self) -> bool {
        match self {
            ValueNode::Float(f) => f.is_finite(),
            ValueNode::Array(items) => items.iter().all(ValueNode::is_transferable),
            ValueNode::Object(map) => map.values().all(ValueNode::is_transferable),
            ValueNode::Null | ValueNode::Bool(_) | ValueNode::Integer(_) | ValueNode::String(_) => {
                true
            }
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueNode::Null => "null",
            ValueNode::Bool(_) => "bool",
            ValueNode::Integer(_) => "integer",
            ValueNode::Float(_) => "float",
            ValueNode::String(_) => "string",
            ValueNode::Array(_) => "array",
            ValueNode::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueNode::Null)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ValueNode::Array(_) | ValueNode::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueNode::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integer and float nodes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValueNode::Integer(i) => Some(*i as f64),
            ValueNode::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<ValueNode>> {
        match self {
            ValueNode::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            ValueNode::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when this node is an object.
    pub fn get(&self, key: &str) -> Option<&ValueNode> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Converts into a `serde_json::Value`.
    ///
    /// Non-finite floats become `null`, matching what `serde_json` writes for them.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            ValueNode::Null => serde_json::Value::Null,
            ValueNode::Bool(b) => serde_json::Value::Bool(*b),
            ValueNode::Integer(i) => serde_json::Value::from(*i),
            ValueNode::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueNode::String(s) => serde_json::Value::String(s.clone()),
            ValueNode::Array(items) => {
                serde_json::Value::Array(items.iter().map(ValueNode::to_json_value).collect())
            }
            ValueNode::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for ValueNode {
    fn from(b: bool) -> Self {
        ValueNode::Bool(b)
    }
}

impl From<i64> for ValueNode {
    fn from(i: i64) -> Self {
        ValueNode::Integer(i)
    }
}

impl From<i32> for ValueNode {
    fn from(i: i32) -> Self {
        ValueNode::Integer(i64::from(i))
    }
}

impl From<u32> for ValueNode {
    fn from(i: u32) -> Self {
        ValueNode::Integer(i64::from(i))
    }
}

impl From<u64> for ValueNode {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(ValueNode::Integer)
            .unwrap_or(ValueNode::Float(i as f64))
    }
}

impl From<f64> for ValueNode {
    fn from(f: f64) -> Self {
        ValueNode::Float(f)
    }
}

impl From<&str> for ValueNode {
    fn from(s: &str) -> Self {
        ValueNode::String(s.to_string())
    }
}

impl From<String> for ValueNode {
    fn from(s: String) -> Self {
        ValueNode::String(s)
    }
}

impl<T: Into<ValueNode>> From<Option<T>> for ValueNode {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(ValueNode::Null)
    }
}

impl<T: Into<ValueNode>> From<Vec<T>> for ValueNode {
    fn from(items: Vec<T>) -> Self {
        ValueNode::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<ValueMap> for ValueNode {
    fn from(map: ValueMap) -> Self {
        ValueNode::Object(map)
    }
}

impl From<serde_json::Value> for ValueNode {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ValueNode::Null,
            serde_json::Value::Bool(b) => ValueNode::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ValueNode::Integer(i),
                None => ValueNode::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ValueNode::String(s),
            serde_json::Value::Array(items) => {
                ValueNode::Array(items.into_iter().map(ValueNode::from).collect())
            }
            serde_json::Value::Object(map) => {
                ValueNode::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl<K: Into<String>, V: Into<ValueNode>> FromIterator<(K, V)> for ValueNode {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ValueNode::Object(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for ValueNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValueNode::Null => serializer.serialize_unit(),
            ValueNode::Bool(b) => serializer.serialize_bool(*b),
            ValueNode::Integer(i) => serializer.serialize_i64(*i),
            ValueNode::Float(f) => serializer.serialize_f64(*f),
            ValueNode::String(s) => serializer.serialize_str(s),
            ValueNode::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ValueNode::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

struct ValueNodeVisitor;

impl<'de> Visitor<'de> for ValueNodeVisitor {
    type Value = ValueNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ValueNode, E> {
        Ok(ValueNode::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ValueNode, E> {
        Ok(ValueNode::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ValueNode, E> {
        Ok(ValueNode::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ValueNode, E> {
        Ok(ValueNode::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ValueNode, E> {
        Ok(ValueNode::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ValueNode, E> {
        Ok(ValueNode::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<ValueNode, E> {
        Ok(ValueNode::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<ValueNode, E> {
        Ok(ValueNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ValueNode, D::Error> {
        ValueNode::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ValueNode, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ValueNode::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ValueNode, A::Error> {
        let mut map = ValueMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, ValueNode>()? {
            map.insert(key, value);
        }
        Ok(ValueNode::Object(map))
    }
}

impl<'de> Deserialize<'de> for ValueNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueNodeVisitor)
    }
}
