//! Session continuity monitor
//!
//! Loads the previous run's continuity record, replaces it with a fresh
//! record for this run and keeps that record alive with periodic
//! heartbeats until an orderly [`SessionMonitor::finalize`].
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --begin()--> Active --finalize()--> Finalized
//! ```
//!
//! Persistence is best-effort. Read and write failures are logged and
//! downgrade the previous-run classification to `Unknown`; none of them
//! reach the caller.

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use chrono::Utc;
use crashlens_core::config::SessionOptions;
use crashlens_core::domain::{DynamicRecord, ValueNode};
use crashlens_core::ports::{CrashCheck, RecordStore};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{classify, ClassifyContext, SessionOutcome};
use crate::error::PersistenceError;
use crate::record::{ContinuityRecord, SessionId};
use crate::store::FileRecordStore;

/// How long the panic path waits for the monitor lock before giving up.
const CRASH_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Missed heartbeats after which the previous process counts as gone.
const STALE_HEARTBEATS: u32 = 2;

static SHARED: OnceLock<Arc<SessionMonitor>> = OnceLock::new();

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Uninitialized,
    Active,
    Finalized,
}

/// Immutable snapshot returned by [`SessionMonitor::get_current_state`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub status: MonitorStatus,
    pub current: ContinuityRecord,
    pub previous: Option<ContinuityRecord>,
    pub previous_outcome: SessionOutcome,
}

impl SessionState {
    /// The snapshot as a record for embedding in a report.
    pub fn to_record(&self) -> DynamicRecord {
        match serde_json::to_value(self) {
            Ok(json) => DynamicRecord::from_value(ValueNode::from(json)).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to encode session state");
                DynamicRecord::new()
            }
        }
    }
}

struct MonitorInner {
    status: MonitorStatus,
    current: ContinuityRecord,
    previous: Option<ContinuityRecord>,
    previous_outcome: SessionOutcome,
    oom_monitoring: bool,
    crash_check: Option<CrashCheck>,
    /// Set when loading or replacing the previous record failed
    degraded: bool,
}

/// Tracks this run and classifies how the previous one ended.
pub struct SessionMonitor {
    store: Arc<dyn RecordStore>,
    record_name: String,
    app_version: Option<String>,
    stale_after: chrono::Duration,
    inner: Mutex<MonitorInner>,
    shutdown: CancellationToken,
}

impl SessionMonitor {
    /// Creates an uninitialized monitor. Nothing is read or written until
    /// [`begin`](Self::begin).
    pub fn new(store: Arc<dyn RecordStore>, options: &SessionOptions) -> Self {
        Self {
            store,
            record_name: options.record_name.clone(),
            app_version: options.app_version.clone(),
            stale_after: stale_threshold(options.heartbeat_interval_secs),
            inner: Mutex::new(MonitorInner {
                status: MonitorStatus::Uninitialized,
                current: ContinuityRecord::begin(options.app_version.clone()),
                previous: None,
                previous_outcome: SessionOutcome::Unknown,
                oom_monitoring: options.oom_monitoring,
                crash_check: None,
                degraded: false,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a monitor and begins the session immediately.
    pub fn start(store: Arc<dyn RecordStore>, options: &SessionOptions) -> Arc<Self> {
        let monitor = Arc::new(Self::new(store, options));
        monitor.begin();
        monitor
    }

    /// Starts a file-backed session and, inside a tokio runtime, its heartbeat task.
    pub fn launch(options: &SessionOptions) -> Arc<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(FileRecordStore::new(options.store_dir.clone()));
        let monitor = Self::start(store, options);
        monitor.spawn_heartbeat(Duration::from_secs(options.heartbeat_interval_secs));
        monitor
    }

    /// Process-wide monitor, launched with default options on first use
    /// unless a host installed one with [`install_shared`](Self::install_shared).
    pub fn shared() -> &'static Arc<SessionMonitor> {
        SHARED.get_or_init(|| Self::launch(&SessionOptions::default()))
    }

    /// Installs the process-wide monitor. Fails with the given monitor if
    /// one is already in place.
    pub fn install_shared(monitor: Arc<SessionMonitor>) -> Result<(), Arc<SessionMonitor>> {
        SHARED.set(monitor)
    }

    /// Loads the previous record, classifies it and writes the record for
    /// this run. Only the first call has an effect.
    pub fn begin(&self) {
        let previous = self.load_previous();

        let mut inner = self.inner.lock();
        if inner.status != MonitorStatus::Uninitialized {
            return;
        }
        let (previous, load_failed) = match previous {
            Ok(previous) => (previous, false),
            Err(e) => {
                warn!(error = %e, record = %self.record_name, "Failed to load previous continuity record");
                (None, true)
            }
        };

        inner.previous = previous;
        inner.degraded = load_failed;
        inner.current = ContinuityRecord::begin(self.app_version.clone());
        inner.status = MonitorStatus::Active;

        if let Err(e) = self.persist(&inner.current) {
            warn!(error = %e, record = %self.record_name, "Failed to write continuity record");
            inner.degraded = true;
        }

        let session_id = inner.current.session_id;
        let previous = inner.previous.clone();
        let degraded = inner.degraded;
        let oom_monitoring = inner.oom_monitoring;
        let crash_check = inner.crash_check.clone();
        drop(inner);

        // A check registered before begin() is host code; call it unlocked.
        let outcome = if degraded {
            SessionOutcome::Unknown
        } else {
            classify(
                previous.as_ref(),
                &ClassifyContext {
                    oom_monitoring,
                    crash_check: crash_check.as_ref(),
                    current_app_version: self.app_version.as_deref(),
                    now: Utc::now(),
                    stale_after: self.stale_after,
                },
            )
        };
        self.inner.lock().previous_outcome = outcome;

        info!(
            %session_id,
            previous_outcome = %outcome,
            previous_lifetime_secs = previous.as_ref().map(|p| p.observed_lifetime().num_seconds()),
            "Session started"
        );
    }

    /// Turns OOM classification on or off and registers the host's crash
    /// check, then reclassifies the previous run.
    ///
    /// The crash check is called once, on the calling thread, without any
    /// monitor lock held.
    pub fn enable_oom_monitoring(&self, enabled: bool, crash_check: Option<CrashCheck>) -> SessionOutcome {
        let (previous, degraded) = {
            let mut inner = self.inner.lock();
            inner.oom_monitoring = enabled;
            inner.crash_check = crash_check.clone();
            (inner.previous.clone(), inner.degraded)
        };

        let outcome = if degraded {
            SessionOutcome::Unknown
        } else {
            classify(
                previous.as_ref(),
                &ClassifyContext {
                    oom_monitoring: enabled,
                    crash_check: crash_check.as_ref(),
                    current_app_version: self.app_version.as_deref(),
                    now: Utc::now(),
                    stale_after: self.stale_after,
                },
            )
        };

        self.inner.lock().previous_outcome = outcome;
        debug!(enabled, outcome = %outcome, "OOM monitoring updated");
        outcome
    }

    /// Snapshot of the monitor. Callers never see the live record.
    pub fn get_current_state(&self) -> SessionState {
        let inner = self.inner.lock();
        SessionState {
            status: inner.status,
            current: inner.current.clone(),
            previous: inner.previous.clone(),
            previous_outcome: inner.previous_outcome,
        }
    }

    pub fn status(&self) -> MonitorStatus {
        self.inner.lock().status
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.lock().current.session_id
    }

    pub fn previous_outcome(&self) -> SessionOutcome {
        self.inner.lock().previous_outcome
    }

    pub fn has_crash_check(&self) -> bool {
        self.inner.lock().crash_check.is_some()
    }

    /// Refreshes `last_heartbeat_at` and persists it. No-op unless active.
    pub fn heartbeat(&self) {
        self.update(|record| record.touch(Utc::now()), "heartbeat");
    }

    /// Notes that the host reported memory pressure during this run.
    pub fn record_memory_warning(&self) {
        self.update(|record| record.memory_warning = true, "memory warning");
    }

    /// Marks this run as crashed. Used from the panic hook, so it waits
    /// only briefly for the lock and never panics.
    pub fn mark_crashed(&self) {
        let Some(mut inner) = self.inner.try_lock_for(CRASH_LOCK_TIMEOUT) else {
            return;
        };
        if inner.status != MonitorStatus::Active {
            return;
        }
        inner.current.crashed = true;
        inner.current.touch(Utc::now());
        if let Err(e) = self.persist(&inner.current) {
            warn!(error = %e, "Failed to persist crash marker");
        }
    }

    /// Orderly shutdown: sets the clean-shutdown flag, persists it and stops
    /// the heartbeat task. Idempotent.
    pub fn finalize(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.status == MonitorStatus::Finalized {
                return;
            }
            let was_active = inner.status == MonitorStatus::Active;
            inner.status = MonitorStatus::Finalized;
            if was_active {
                inner.current.clean_shutdown = true;
                inner.current.touch(Utc::now());
                if let Err(e) = self.persist(&inner.current) {
                    warn!(error = %e, "Failed to persist clean shutdown");
                }
            }
        }
        self.shutdown.cancel();
        info!("Session finalized");
    }

    /// Spawns the periodic heartbeat on the current tokio runtime.
    ///
    /// Returns `None` outside a runtime or for a zero period. The task holds
    /// only a weak reference and stops on [`finalize`](Self::finalize) or
    /// when the monitor is dropped.
    pub fn spawn_heartbeat(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        if period.is_zero() {
            warn!("Heartbeat period is zero; heartbeat disabled");
            return None;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime; heartbeat disabled");
                return None;
            }
        };

        let monitor: Weak<SessionMonitor> = Arc::downgrade(self);
        let token = self.shutdown.clone();

        Some(runtime.spawn(async move {
            debug!(period_ms = period.as_millis() as u64, "Heartbeat task started");
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately and begin() already wrote the record
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(monitor) = monitor.upgrade() else {
                            break;
                        };
                        monitor.heartbeat();
                    }
                    _ = token.cancelled() => break,
                }
            }
            debug!("Heartbeat task stopped");
        }))
    }

    // Persisting under the lock keeps a late heartbeat from overwriting the
    // clean-shutdown flag. The cost is one small atomic write per update.
    fn update(&self, apply: impl FnOnce(&mut ContinuityRecord), what: &'static str) {
        let mut inner = self.inner.lock();
        if inner.status != MonitorStatus::Active {
            return;
        }
        apply(&mut inner.current);
        if let Err(e) = self.persist(&inner.current) {
            warn!(error = %e, what, "Failed to persist continuity record");
        }
    }

    fn load_previous(&self) -> Result<Option<ContinuityRecord>, PersistenceError> {
        match self.store.get(&self.record_name)? {
            Some(bytes) => ContinuityRecord::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn persist(&self, record: &ContinuityRecord) -> Result<(), PersistenceError> {
        let bytes = record.encode()?;
        self.store.set(&self.record_name, &bytes)?;
        Ok(())
    }
}

fn stale_threshold(heartbeat_interval_secs: u64) -> chrono::Duration {
    let period = Duration::from_secs(heartbeat_interval_secs).saturating_mul(STALE_HEARTBEATS);
    chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::days(365))
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("record_name", &self.record_name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
