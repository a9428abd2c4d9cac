//! Domain entities and business logic
//!
//! This module contains the core domain types for CrashLens:
//! - The JSON value tree and the dynamic record built on it
//! - Typed records (person) with declared field schemas
//! - Levels, sources, telemetry types and tri-state flags
//! - Domain-specific error types

pub mod errors;
pub mod level;
pub mod person;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use errors::DtoError;
pub use level::{Level, Source, TelemetryType, TriStateFlag};
pub use person::Person;
pub use record::{DynamicRecord, FieldKind, FieldSpec, ImmutableRecord, TypedRecord};
pub use value::{ValueMap, ValueNode};
