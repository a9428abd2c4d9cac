//! Error types for the telemetry crate

use crashlens_core::domain::DtoError;
use thiserror::Error;

/// Errors surfaced by telemetry configuration and event decoding.
///
/// Recording never returns these; a rejected event is dropped and logged.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A data limit outside `0..=max` was requested; the previous
    /// configuration is kept
    #[error("data limit {requested} is outside the accepted range 0..={max}")]
    CapacityPolicyViolation { requested: i64, max: usize },

    /// A stored or received event does not match its telemetry type
    #[error("invalid telemetry event: {0}")]
    InvalidEvent(#[from] DtoError),
}
