//! DynamicRecord - the data transfer object base
//!
//! A [`DynamicRecord`] wraps exactly one object- or array-rooted
//! [`ValueNode`] tree. Every value that enters a record goes through the
//! transferability predicates defined here, so anything a record holds can
//! be written out as JSON and read back into a structurally equal record.
//!
//! Typed records (person, telemetry bodies) are thin wrappers that declare a
//! [`FieldSpec`] schema and validate it through [`TypedRecord::validate`].

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::DtoError;
use super::value::{ValueMap, ValueNode};

/// A validated, JSON-shaped data container
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    root: ValueNode,
}

impl DynamicRecord {
    // ========================================================================
    // Transferability predicates
    // ========================================================================

    /// Checks whether `value` may be used as the root seed of a record.
    ///
    /// Only objects and arrays qualify, and every nested value must itself
    /// be transferable.
    pub fn is_transferable_object(value: &ValueNode) -> bool {
        value.is_container() && value.is_transferable()
    }

    /// Checks whether `value` may be stored as a property value.
    pub fn is_transferable_data_value(value: &ValueNode) -> bool {
        value.is_transferable()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Creates an empty object-rooted record.
    pub fn new() -> Self {
        Self {
            root: ValueNode::object(),
        }
    }

    /// Builds a record from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DtoError> {
        let root: ValueNode = serde_json::from_str(json)?;
        Self::from_value(root)
    }

    /// Builds a record from raw JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, DtoError> {
        let root: ValueNode = serde_json::from_slice(bytes)?;
        Self::from_value(root)
    }

    /// Builds an object-rooted record from an in-memory map.
    pub fn from_map(map: ValueMap) -> Result<Self, DtoError> {
        if let Some((key, _)) = map.iter().find(|(_, v)| !Self::is_transferable_data_value(v)) {
            return Err(DtoError::NotTransferable(format!("property '{key}'")));
        }
        Ok(Self {
            root: ValueNode::Object(map),
        })
    }

    /// Builds an array-rooted record from an in-memory array.
    pub fn from_array(items: Vec<ValueNode>) -> Result<Self, DtoError> {
        if let Some(index) = items
            .iter()
            .position(|v| !Self::is_transferable_data_value(v))
        {
            return Err(DtoError::NotTransferable(format!("element {index}")));
        }
        Ok(Self {
            root: ValueNode::Array(items),
        })
    }

    /// Builds a record from any container node.
    pub fn from_value(root: ValueNode) -> Result<Self, DtoError> {
        match root {
            ValueNode::Object(map) => Self::from_map(map),
            ValueNode::Array(items) => Self::from_array(items),
            other => Err(DtoError::InvalidRoot(other.kind().to_string())),
        }
    }

    /// Builds an object-rooted record, dropping properties that are not transferable.
    ///
    /// Returns the record and the names of the dropped properties.
    pub fn sanitized(map: ValueMap) -> (Self, Vec<String>) {
        let mut dropped = Vec::new();
        let kept = map
            .into_iter()
            .filter(|(k, v)| {
                let ok = Self::is_transferable_data_value(v);
                if !ok {
                    dropped.push(k.clone());
                }
                ok
            })
            .collect();
        (
            Self {
                root: ValueNode::Object(kept),
            },
            dropped,
        )
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Returns the backing tree.
    pub fn root(&self) -> &ValueNode {
        &self.root
    }

    /// Consumes the record, returning the backing tree.
    pub fn into_value(self) -> ValueNode {
        self.root
    }

    pub fn is_object(&self) -> bool {
        matches!(self.root, ValueNode::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.root, ValueNode::Array(_))
    }

    /// True iff the root container holds no entries.
    ///
    /// A property explicitly set to `null` still counts as an entry.
    pub fn is_empty(&self) -> bool {
        match &self.root {
            ValueNode::Object(map) => map.is_empty(),
            ValueNode::Array(items) => items.is_empty(),
            _ => true,
        }
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        match &self.root {
            ValueNode::Object(map) => map.len(),
            ValueNode::Array(items) => items.len(),
            _ => 0,
        }
    }

    /// Top-level property names in insertion order. Empty for array roots.
    pub fn defined_properties(&self) -> Vec<&str> {
        match &self.root {
            ValueNode::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Compares top-level property names as sets, ignoring values and order.
    pub fn has_same_defined_properties_as(&self, other: &DynamicRecord) -> bool {
        let mine: HashSet<&str> = self.defined_properties().into_iter().collect();
        let theirs: HashSet<&str> = other.defined_properties().into_iter().collect();
        mine == theirs
    }

    // ========================================================================
    // Property access
    // ========================================================================

    pub fn get(&self, name: &str) -> Option<&ValueNode> {
        self.root.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the string value of `name`; `None` when absent, null or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ValueNode::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ValueNode::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ValueNode::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ValueNode::as_f64)
    }

    /// Returns a nested container property as its own record.
    pub fn get_record(&self, name: &str) -> Option<DynamicRecord> {
        self.get(name)
            .filter(|v| v.is_container())
            .map(|v| DynamicRecord { root: v.clone() })
    }

    /// Array element access for array-rooted records.
    pub fn get_index(&self, index: usize) -> Option<&ValueNode> {
        self.root.as_array().and_then(|items| items.get(index))
    }

    /// Iterates over `(name, value)` pairs of an object root.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &ValueNode)> {
        self.root
            .as_object()
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Assigns a property on an object-rooted record.
    ///
    /// The root shape never changes: array-rooted records reject named
    /// assignment.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ValueNode>) -> Result<(), DtoError> {
        let name = name.into();
        let value = value.into();
        if !Self::is_transferable_data_value(&value) {
            return Err(DtoError::NotTransferable(format!("property '{name}'")));
        }
        match &mut self.root {
            ValueNode::Object(map) => {
                map.insert(name, value);
                Ok(())
            }
            _ => Err(DtoError::NotAnObject(name)),
        }
    }

    /// Removes a property, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<ValueNode> {
        match &mut self.root {
            ValueNode::Object(map) => map.shift_remove(name),
            _ => None,
        }
    }

    /// Appends to an array-rooted record.
    pub fn push(&mut self, value: impl Into<ValueNode>) -> Result<(), DtoError> {
        let value = value.into();
        if !Self::is_transferable_data_value(&value) {
            return Err(DtoError::NotTransferable("array element".to_string()));
        }
        match &mut self.root {
            ValueNode::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(DtoError::InvalidRoot("object (push requires an array root)".to_string())),
        }
    }

    /// Inserts every property of `other` that this record does not already define.
    pub fn merge_missing(&mut self, other: &DynamicRecord) {
        if let (ValueNode::Object(mine), Some(theirs)) = (&mut self.root, other.root.as_object()) {
            for (k, v) in theirs {
                if !mine.contains_key(k) {
                    mine.insert(k.clone(), v.clone());
                }
            }
        }
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes to compact JSON text.
    pub fn to_json_string(&self) -> String {
        // A record only holds transferable values, so serialization cannot fail.
        serde_json::to_string(&self.root).unwrap_or_default()
    }

    /// Serializes to indented JSON text.
    pub fn to_json_string_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.root).unwrap_or_default()
    }

    /// Serializes to JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.root).unwrap_or_default()
    }
}

impl Default for DynamicRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DynamicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

impl From<DynamicRecord> for ValueNode {
    fn from(record: DynamicRecord) -> Self {
        record.root
    }
}

impl TryFrom<ValueNode> for DynamicRecord {
    type Error = DtoError;

    fn try_from(value: ValueNode) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl std::str::FromStr for DynamicRecord {
    type Err = DtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DynamicRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let root = ValueNode::deserialize(deserializer)?;
        Self::from_value(root).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Immutable records
// ============================================================================

/// A record that never changes after construction
///
/// Read access goes through `Deref` to [`DynamicRecord`]; no mutator is
/// reachable. Clones share one tree, so snapshots are cheap. Use
/// [`to_mutable`](Self::to_mutable) to start an edited copy.
///
/// ```compile_fail
/// use crashlens_core::domain::ImmutableRecord;
///
/// let mut frozen = ImmutableRecord::default();
/// frozen.set("key", 1).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImmutableRecord(Arc<DynamicRecord>);

impl ImmutableRecord {
    pub fn new(record: DynamicRecord) -> Self {
        Self(Arc::new(record))
    }

    pub fn from_json_str(json: &str) -> Result<Self, DtoError> {
        DynamicRecord::from_json_str(json).map(Self::new)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, DtoError> {
        DynamicRecord::from_json_bytes(bytes).map(Self::new)
    }

    pub fn from_map(map: ValueMap) -> Result<Self, DtoError> {
        DynamicRecord::from_map(map).map(Self::new)
    }

    /// An independent mutable copy.
    pub fn to_mutable(&self) -> DynamicRecord {
        DynamicRecord::clone(&self.0)
    }

    /// Unwraps into a mutable record, copying only if the tree is shared.
    pub fn into_mutable(self) -> DynamicRecord {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| DynamicRecord::clone(&shared))
    }
}

impl Deref for ImmutableRecord {
    type Target = DynamicRecord;

    fn deref(&self) -> &DynamicRecord {
        &self.0
    }
}

impl From<DynamicRecord> for ImmutableRecord {
    fn from(record: DynamicRecord) -> Self {
        Self::new(record)
    }
}

impl From<ImmutableRecord> for ValueNode {
    fn from(record: ImmutableRecord) -> Self {
        record.into_mutable().into()
    }
}

impl fmt::Display for ImmutableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Serialize for ImmutableRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ImmutableRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DynamicRecord::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// Typed records
// ============================================================================

/// Kind constraint for a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Bool,
    Any,
}

impl FieldKind {
    fn accepts(self, value: &ValueNode) -> bool {
        match self {
            FieldKind::String => matches!(value, ValueNode::String(_)),
            FieldKind::Integer => matches!(value, ValueNode::Integer(_)),
            FieldKind::Number => matches!(value, ValueNode::Integer(_) | ValueNode::Float(_)),
            FieldKind::Bool => matches!(value, ValueNode::Bool(_)),
            FieldKind::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Number => "a number",
            FieldKind::Bool => "a bool",
            FieldKind::Any => "any value",
        }
    }
}

/// One entry of a typed record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
    /// Maximum length in characters for string fields
    pub max_len: Option<usize>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
            max_len: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: false,
            kind,
            max_len: None,
        }
    }

    pub const fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Checks one value against this field. Null and absent values are
    /// accepted only for optional fields.
    pub fn check(&self, value: Option<&ValueNode>) -> Result<(), DtoError> {
        let value = match value {
            None | Some(ValueNode::Null) => {
                return if self.required {
                    Err(DtoError::MissingField(self.name.to_string()))
                } else {
                    Ok(())
                };
            }
            Some(v) => v,
        };
        if !self.kind.accepts(value) {
            return Err(DtoError::WrongKind {
                field: self.name.to_string(),
                expected: self.kind.describe(),
            });
        }
        if let (Some(max), Some(s)) = (self.max_len, value.as_str()) {
            if s.chars().count() > max {
                return Err(DtoError::FieldTooLong {
                    field: self.name.to_string(),
                    max,
                });
            }
        }
        Ok(())
    }
}

/// A record with a declared field schema layered over [`DynamicRecord`].
pub trait TypedRecord: Sized {
    /// Declared fields. Fields not listed here are allowed and left unchecked.
    const SCHEMA: &'static [FieldSpec];

    /// Wraps an already validated record.
    fn from_record_unchecked(record: DynamicRecord) -> Self;

    /// Borrows the backing record.
    fn as_record(&self) -> &DynamicRecord;

    /// Validates `record` against [`Self::SCHEMA`].
    fn validate(record: &DynamicRecord) -> Result<(), DtoError> {
        if !record.is_object() {
            return Err(DtoError::InvalidRoot("array".to_string()));
        }
        Self::SCHEMA
            .iter()
            .try_for_each(|spec| spec.check(record.get(spec.name)))
    }

    /// Validates and wraps `record`.
    fn from_record(record: DynamicRecord) -> Result<Self, DtoError> {
        Self::validate(&record)?;
        Ok(Self::from_record_unchecked(record))
    }

    /// Parses JSON text and validates it.
    fn from_json_str(json: &str) -> Result<Self, DtoError> {
        Self::from_record(DynamicRecord::from_json_str(json)?)
    }
}
