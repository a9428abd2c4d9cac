//! Payload sender port (driven/secondary port)
//!
//! The transport that delivers a fully assembled report to the reporting
//! backend. Retry and queueing policy belong to the implementation.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because transport errors are adapter-specific
//!   (HTTP, local spool, etc.) and need no domain-level classification.
//! - The payload is borrowed so callers can retain it for their own retry.

use crate::domain::DynamicRecord;

/// Port trait for report delivery
#[async_trait::async_trait]
pub trait PayloadSender: Send + Sync {
    /// Sends one payload. `Ok(())` means the backend accepted it.
    async fn send(&self, payload: &DynamicRecord) -> anyhow::Result<()>;
}
