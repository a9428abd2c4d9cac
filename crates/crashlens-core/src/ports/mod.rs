//! Port definitions
//!
//! Interfaces to the collaborators that live outside the core.
//!
//! ## Ports Overview
//!
//! - [`PayloadSender`] - Delivers an assembled report payload to the backend
//! - [`RecordStore`] - Get/set of a small named record (continuity state)
//! - [`LogSink`] - The host's own logging output, bypassed by log capture
//! - [`CrashCheck`] - Host predicate confirming the previous exit was an already-reported crash

pub mod log_sink;
pub mod record_store;
pub mod sender;

pub use log_sink::{LogSink, StderrSink};
pub use record_store::RecordStore;
pub use sender::PayloadSender;

use std::sync::Arc;

/// Synchronous host predicate: `true` when the previous termination is
/// already accounted for as a reported crash.
pub type CrashCheck = Arc<dyn Fn() -> bool + Send + Sync>;
