//! Record store port (driven/secondary port)
//!
//! Persistence for small named records, used for the session continuity
//! record. Calls are synchronous and must complete quickly: the session
//! monitor calls them during process start and from its heartbeat.

/// Port trait for named-record persistence
pub trait RecordStore: Send + Sync {
    /// Reads the record stored under `name`; `Ok(None)` if none exists.
    fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Replaces the record stored under `name`.
    fn set(&self, name: &str, contents: &[u8]) -> anyhow::Result<()>;
}
