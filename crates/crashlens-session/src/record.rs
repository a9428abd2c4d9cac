//! Continuity record
//!
//! The small record persisted across process restarts. It is stored as JSON;
//! unknown fields are ignored on read and missing optional fields default,
//! so records written by newer or older versions still load.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::platform::PlatformInfo;

/// Identifier of one process run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Persisted state of one process run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityRecord {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    /// Set only by an orderly shutdown
    #[serde(default)]
    pub clean_shutdown: bool,
    /// Set by the panic hook before the process unwinds
    #[serde(default)]
    pub crashed: bool,
    /// The host reported memory pressure during the run
    #[serde(default)]
    pub memory_warning: bool,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
}

impl ContinuityRecord {
    /// Creates the record for a run that starts now.
    pub fn begin(app_version: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            started_at: now,
            last_heartbeat_at: now,
            clean_shutdown: false,
            crashed: false,
            memory_warning: false,
            app_version,
            os: Some(PlatformInfo::collect().summary()),
        }
    }

    /// Marks the record as still alive at `at`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_heartbeat_at {
            self.last_heartbeat_at = at;
        }
    }

    /// Time between start and the last heartbeat.
    pub fn observed_lifetime(&self) -> chrono::Duration {
        self.last_heartbeat_at - self.started_at
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(self).map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_active_and_unclean() {
        let record = ContinuityRecord::begin(Some("1.2.3".to_string()));
        assert!(!record.clean_shutdown);
        assert!(!record.crashed);
        assert_eq!(record.started_at, record.last_heartbeat_at);
        assert_eq!(record.app_version.as_deref(), Some("1.2.3"));
        assert!(record.os.is_some());
    }

    #[test]
    fn test_encode_decode() {
        let record = ContinuityRecord::begin(None);
        let decoded = ContinuityRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_ignores_unknown_and_defaults_missing() {
        let json = br#"{
            "session_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "started_at": "2026-01-01T00:00:00Z",
            "last_heartbeat_at": "2026-01-01T00:05:00Z",
            "added_in_a_later_version": {"x": 1}
        }"#;
        let record = ContinuityRecord::decode(json).unwrap();
        assert!(!record.clean_shutdown);
        assert!(record.app_version.is_none());
        assert_eq!(record.observed_lifetime(), chrono::Duration::minutes(5));
        assert_eq!(
            record.session_id.to_string(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ContinuityRecord::decode(b"not json"),
            Err(PersistenceError::Corrupt(_))
        ));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut record = ContinuityRecord::begin(None);
        let before = record.last_heartbeat_at;
        record.touch(before - chrono::Duration::seconds(10));
        assert_eq!(record.last_heartbeat_at, before);
        record.touch(before + chrono::Duration::seconds(10));
        assert!(record.last_heartbeat_at > before);
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("nope".parse::<SessionId>().is_err());
    }
}
