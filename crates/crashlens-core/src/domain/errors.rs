//! Domain error types
//!
//! Errors raised while building or mutating records. Parsing failures are
//! kept apart from schema failures so callers can tell a malformed seed from
//! a well-formed seed that carries values a record cannot hold.

use thiserror::Error;

/// Errors that can occur while constructing or mutating a record
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DtoError {
    /// Seed text or bytes are not valid JSON
    #[error("Malformed JSON seed: {0}")]
    Parse(String),

    /// A value is not representable as JSON (e.g. a non-finite number)
    #[error("Value is not transferable: {0}")]
    NotTransferable(String),

    /// The root of a record must be an object or an array
    #[error("Invalid record root: expected object or array, got {0}")]
    InvalidRoot(String),

    /// Named property access on an array-rooted record
    #[error("Record root is an array; named property '{0}' is not addressable")]
    NotAnObject(String),

    /// A required field of a typed record is absent or null
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A typed field holds a value of the wrong kind
    #[error("Field '{field}' expected {expected}")]
    WrongKind {
        /// Offending field name
        field: String,
        /// Human-readable expected kind
        expected: &'static str,
    },

    /// A string field exceeds its declared maximum length
    #[error("Field '{field}' exceeds {max} characters")]
    FieldTooLong {
        /// Offending field name
        field: String,
        /// Declared maximum length in characters
        max: usize,
    },
}

impl DtoError {
    /// True for malformed text/bytes seeds.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, DtoError::Parse(_))
    }

    /// True for every failure that is about shape or content rather than syntax.
    pub fn is_schema_error(&self) -> bool {
        !self.is_parse_error()
    }
}

impl From<serde_json::Error> for DtoError {
    fn from(e: serde_json::Error) -> Self {
        DtoError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DtoError::MissingField("id".to_string());
        assert_eq!(err.to_string(), "Missing required field: id");

        let err = DtoError::FieldTooLong {
            field: "username".to_string(),
            max: 255,
        };
        assert_eq!(err.to_string(), "Field 'username' exceeds 255 characters");
    }

    #[test]
    fn test_parse_and_schema_are_disjoint() {
        let parse = DtoError::Parse("eof".to_string());
        assert!(parse.is_parse_error());
        assert!(!parse.is_schema_error());

        let schema = DtoError::NotTransferable("NaN".to_string());
        assert!(schema.is_schema_error());
        assert!(!schema.is_parse_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: DtoError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.is_parse_error());
    }
}
