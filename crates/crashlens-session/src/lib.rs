//! CrashLens Session - Continuity tracking across process restarts
//!
//! Provides:
//! - `SessionMonitor`: per-process monitor with heartbeat task and shared instance
//! - `ContinuityRecord`: the small persisted record describing one run
//! - `SessionOutcome`: how the previous run ended
//! - `FileRecordStore` / `MemoryRecordStore`: `RecordStore` implementations
//! - `PlatformInfo`: non-identifying OS details

pub mod classify;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod record;
pub mod store;

pub use classify::{classify, ClassifyContext, SessionOutcome};
pub use error::PersistenceError;
pub use monitor::{MonitorStatus, SessionMonitor, SessionState};
pub use platform::PlatformInfo;
pub use record::{ContinuityRecord, SessionId};
pub use store::{FileRecordStore, MemoryRecordStore};
