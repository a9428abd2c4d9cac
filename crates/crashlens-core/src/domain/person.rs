//! Person record
//!
//! Identifies the user affected by a report. People are keyed by `id`;
//! `username` and `email` are optional and may be updated later.

use super::errors::DtoError;
use super::record::{DynamicRecord, FieldKind, FieldSpec, TypedRecord};
use super::value::ValueNode;

/// Maximum length of a person id in characters
pub const MAX_ID_LEN: usize = 40;
/// Maximum length of username and email in characters
pub const MAX_NAME_LEN: usize = 255;

/// A monitored system user
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    record: DynamicRecord,
}

impl TypedRecord for Person {
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::required("id", FieldKind::String).with_max_len(MAX_ID_LEN),
        FieldSpec::optional("username", FieldKind::String).with_max_len(MAX_NAME_LEN),
        FieldSpec::optional("email", FieldKind::String).with_max_len(MAX_NAME_LEN),
    ];

    fn from_record_unchecked(record: DynamicRecord) -> Self {
        Self { record }
    }

    fn as_record(&self) -> &DynamicRecord {
        &self.record
    }
}

impl Person {
    /// Creates a person with only an id.
    pub fn new(id: impl Into<String>) -> Result<Self, DtoError> {
        Self::with_details(id, None, None)
    }

    /// Creates a person with optional username and email.
    pub fn with_details(
        id: impl Into<String>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, DtoError> {
        let id: String = id.into();
        let mut record = DynamicRecord::new();
        record.set("id", id)?;
        if let Some(username) = username {
            record.set("username", username)?;
        }
        if let Some(email) = email {
            record.set("email", email)?;
        }
        Self::from_record(record)
    }

    pub fn id(&self) -> &str {
        // Presence is guaranteed by the schema.
        self.record.get_str("id").unwrap_or_default()
    }

    pub fn username(&self) -> Option<&str> {
        self.record.get_str("username")
    }

    pub fn email(&self) -> Option<&str> {
        self.record.get_str("email")
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> Result<(), DtoError> {
        self.set_checked("id", ValueNode::String(id.into()))
    }

    pub fn set_username(&mut self, username: Option<&str>) -> Result<(), DtoError> {
        self.set_checked("username", username.into())
    }

    pub fn set_email(&mut self, email: Option<&str>) -> Result<(), DtoError> {
        self.set_checked("email", email.into())
    }

    /// Validates the single field against the schema before writing it.
    fn set_checked(&mut self, name: &str, value: ValueNode) -> Result<(), DtoError> {
        if let Some(spec) = Self::SCHEMA.iter().find(|s| s.name == name) {
            spec.check(Some(&value))?;
        }
        if value.is_null() {
            self.record.remove(name);
            Ok(())
        } else {
            self.record.set(name, value)
        }
    }
}

impl From<Person> for DynamicRecord {
    fn from(person: Person) -> Self {
        person.record
    }
}
