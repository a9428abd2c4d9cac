//! Previous-run classification
//!
//! Decides how the previous process run ended from its continuity record.
//!
//! | previous record                         | outcome        |
//! |-----------------------------------------|----------------|
//! | missing or unreadable                   | `Unknown`      |
//! | clean shutdown flag set                 | `Normal`       |
//! | crashed flag set                        | `Crashed`      |
//! | unclean, OOM monitoring disabled        | `Unknown`      |
//! | unclean, host accounts for the exit     | `Unknown`      |
//! | unclean, app version changed            | `Unknown`      |
//! | unclean, heartbeat recent, no pressure  | `Unknown`      |
//! | unclean, heartbeat stale                | `SuspectedOom` |
//! | unclean, memory warning recorded        | `SuspectedOom` |
//!
//! A heartbeat is stale once it is older than
//! [`ClassifyContext::stale_after`]. A recent heartbeat alone does not show
//! the previous process is gone; another instance may still own the record.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use crashlens_core::ports::CrashCheck;
use serde::{Deserialize, Serialize};

use crate::record::ContinuityRecord;

/// How the previous process run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Orderly shutdown
    Normal,
    /// Ended in a panic captured by this process
    Crashed,
    /// Ended without an orderly shutdown and without another explanation
    SuspectedOom,
    /// No usable record, or the exit is already accounted for elsewhere
    Unknown,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Normal => "normal",
            SessionOutcome::Crashed => "crashed",
            SessionOutcome::SuspectedOom => "suspected_oom",
            SessionOutcome::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs besides the previous record.
pub struct ClassifyContext<'a> {
    pub oom_monitoring: bool,
    pub crash_check: Option<&'a CrashCheck>,
    pub current_app_version: Option<&'a str>,
    /// Classification time
    pub now: DateTime<Utc>,
    /// Heartbeat age after which the previous process counts as gone
    pub stale_after: Duration,
}

/// Classifies the previous run.
///
/// The crash check is only consulted for unclean exits that the record
/// itself does not already explain, and only while OOM monitoring is on.
pub fn classify(previous: Option<&ContinuityRecord>, ctx: &ClassifyContext<'_>) -> SessionOutcome {
    let Some(previous) = previous else {
        return SessionOutcome::Unknown;
    };

    if previous.clean_shutdown {
        return SessionOutcome::Normal;
    }
    if previous.crashed {
        return SessionOutcome::Crashed;
    }
    if !ctx.oom_monitoring {
        return SessionOutcome::Unknown;
    }
    if ctx.crash_check.is_some_and(|check| check()) {
        return SessionOutcome::Unknown;
    }
    if let (Some(before), Some(now)) = (previous.app_version.as_deref(), ctx.current_app_version) {
        if before != now {
            return SessionOutcome::Unknown;
        }
    }
    let heartbeat_age = ctx.now - previous.last_heartbeat_at;
    if heartbeat_age < ctx.stale_after && !previous.memory_warning {
        return SessionOutcome::Unknown;
    }
    SessionOutcome::SuspectedOom
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn ctx<'a>(check: Option<&'a CrashCheck>) -> ClassifyContext<'a> {
        ClassifyContext {
            oom_monitoring: true,
            crash_check: check,
            current_app_version: Some("1.0"),
            now: Utc::now(),
            stale_after: Duration::seconds(10),
        }
    }

    fn unclean() -> ContinuityRecord {
        let mut record = ContinuityRecord::begin(Some("1.0".to_string()));
        record.started_at = Utc::now() - Duration::hours(1);
        record.last_heartbeat_at = record.started_at + Duration::minutes(20);
        record
    }

    fn recently_alive() -> ContinuityRecord {
        let mut record = unclean();
        record.last_heartbeat_at = Utc::now() - Duration::seconds(2);
        record
    }

    #[test]
    fn test_no_previous_record_is_unknown() {
        assert_eq!(classify(None, &ctx(None)), SessionOutcome::Unknown);
    }

    #[test]
    fn test_clean_shutdown_is_normal() {
        let mut record = unclean();
        record.clean_shutdown = true;
        assert_eq!(classify(Some(&record), &ctx(None)), SessionOutcome::Normal);
    }

    #[test]
    fn test_unclean_without_check_is_suspected_oom() {
        assert_eq!(
            classify(Some(&unclean()), &ctx(None)),
            SessionOutcome::SuspectedOom
        );
    }

    #[test]
    fn test_confirmed_crash_is_not_double_counted() {
        let check: CrashCheck = Arc::new(|| true);
        assert_eq!(
            classify(Some(&unclean()), &ctx(Some(&check))),
            SessionOutcome::Unknown
        );
    }

    #[test]
    fn test_negative_check_still_suspects_oom() {
        let check: CrashCheck = Arc::new(|| false);
        assert_eq!(
            classify(Some(&unclean()), &ctx(Some(&check))),
            SessionOutcome::SuspectedOom
        );
    }

    #[test]
    fn test_recorded_crash_skips_check() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let check: CrashCheck = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        });
        let mut record = unclean();
        record.crashed = true;
        assert_eq!(
            classify(Some(&record), &ctx(Some(&check))),
            SessionOutcome::Crashed
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_oom_monitoring_disabled_is_unknown() {
        let context = ClassifyContext {
            oom_monitoring: false,
            ..ctx(None)
        };
        assert_eq!(classify(Some(&unclean()), &context), SessionOutcome::Unknown);
    }

    #[test]
    fn test_app_upgrade_is_unknown() {
        let context = ClassifyContext {
            current_app_version: Some("2.0"),
            ..ctx(None)
        };
        assert_eq!(classify(Some(&unclean()), &context), SessionOutcome::Unknown);
    }

    #[test]
    fn test_recent_heartbeat_without_pressure_is_unknown() {
        assert_eq!(
            classify(Some(&recently_alive()), &ctx(None)),
            SessionOutcome::Unknown
        );
    }

    #[test]
    fn test_recent_heartbeat_with_memory_warning_is_suspected_oom() {
        let mut record = recently_alive();
        record.memory_warning = true;
        assert_eq!(classify(Some(&record), &ctx(None)), SessionOutcome::SuspectedOom);
    }

    #[test]
    fn test_stale_heartbeat_with_memory_warning_is_suspected_oom() {
        let mut record = unclean();
        record.memory_warning = true;
        assert_eq!(classify(Some(&record), &ctx(None)), SessionOutcome::SuspectedOom);
    }

    #[test]
    fn test_zero_threshold_treats_any_heartbeat_as_stale() {
        let context = ClassifyContext {
            stale_after: Duration::zero(),
            ..ctx(None)
        };
        assert_eq!(
            classify(Some(&recently_alive()), &context),
            SessionOutcome::SuspectedOom
        );
    }

    #[test]
    fn test_memory_warning_does_not_override_crash_check() {
        let check: CrashCheck = Arc::new(|| true);
        let mut record = unclean();
        record.memory_warning = true;
        assert_eq!(
            classify(Some(&record), &ctx(Some(&check))),
            SessionOutcome::Unknown
        );
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionOutcome::SuspectedOom).unwrap(),
            "\"suspected_oom\""
        );
        assert_eq!(SessionOutcome::Normal.to_string(), "normal");
    }
}
