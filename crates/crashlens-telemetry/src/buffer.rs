//! Bounded telemetry buffer
//!
//! Holds the most recent telemetry events, oldest first, up to the
//! configured `data_limit`. Appending past the limit evicts from the front.
//!
//! All state sits behind one mutex. Every operation holds it only for a
//! bounded amount of work and snapshots are copied out, so a reader never
//! observes a half-applied insert or eviction.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crashlens_core::config::{TelemetryOptions, MAX_DATA_LIMIT};
use crashlens_core::domain::{DynamicRecord, Level, Source, TelemetryType, ValueMap};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::TelemetryError;
use crate::event::{TelemetryBody, TelemetryEvent};
use crate::metrics::TelemetryMetrics;
use crate::scrub::Scrubber;

static SHARED: OnceLock<Arc<TelemetryBuffer>> = OnceLock::new();

struct BufferState {
    options: TelemetryOptions,
    scrubber: Scrubber,
    events: VecDeque<TelemetryEvent>,
}

impl BufferState {
    fn apply(&mut self, options: TelemetryOptions) -> u64 {
        self.scrubber = Scrubber::new(options.scrub_view_inputs, &options.view_inputs_to_scrub);
        self.options = options;
        self.trim()
    }

    fn trim(&mut self) -> u64 {
        let mut evicted = 0;
        while self.events.len() > self.options.data_limit {
            self.events.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// Thread-safe, capacity-bounded queue of telemetry events
pub struct TelemetryBuffer {
    state: Mutex<BufferState>,
    metrics: Option<Arc<TelemetryMetrics>>,
}

impl TelemetryBuffer {
    /// Creates a buffer, rejecting options whose `data_limit` is too large.
    pub fn new(options: TelemetryOptions) -> Result<Self, TelemetryError> {
        check_limit(options.data_limit)?;
        let scrubber = Scrubber::new(options.scrub_view_inputs, &options.view_inputs_to_scrub);
        Ok(Self {
            state: Mutex::new(BufferState {
                events: VecDeque::with_capacity(options.data_limit),
                options,
                scrubber,
            }),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<TelemetryMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process-wide buffer, created disabled with default options on first
    /// use unless a host installed one with [`install_shared`](Self::install_shared).
    pub fn shared() -> &'static Arc<TelemetryBuffer> {
        SHARED.get_or_init(|| {
            let options = TelemetryOptions::default();
            let state = BufferState {
                scrubber: Scrubber::new(options.scrub_view_inputs, &options.view_inputs_to_scrub),
                events: VecDeque::new(),
                options,
            };
            Arc::new(Self {
                state: Mutex::new(state),
                metrics: None,
            })
        })
    }

    /// Installs the process-wide buffer. Fails with the given buffer if one
    /// is already in place.
    pub fn install_shared(buffer: Arc<TelemetryBuffer>) -> Result<(), Arc<TelemetryBuffer>> {
        SHARED.set(buffer)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replaces the whole configuration. Shrinking the limit evicts the
    /// oldest events. On error the previous configuration stays in effect.
    pub fn configure(&self, options: TelemetryOptions) -> Result<(), TelemetryError> {
        check_limit(options.data_limit)?;
        let evicted = self.state.lock().apply(options);
        self.note_evicted(evicted);
        Ok(())
    }

    /// Sets the capacity. `0` keeps the subsystem enabled but captures nothing.
    pub fn set_data_limit(&self, limit: i64) -> Result<(), TelemetryError> {
        let limit = usize::try_from(limit).map_err(|_| TelemetryError::CapacityPolicyViolation {
            requested: limit,
            max: MAX_DATA_LIMIT,
        })?;
        check_limit(limit)?;
        let evicted = {
            let mut state = self.state.lock();
            state.options.data_limit = limit;
            state.trim()
        };
        self.note_evicted(evicted);
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().options.enabled = enabled;
    }

    pub fn set_capture_log(&self, capture: bool) {
        self.state.lock().options.capture_log = capture;
    }

    pub fn set_scrub_view_inputs(&self, scrub: bool) {
        let mut state = self.state.lock();
        state.options.scrub_view_inputs = scrub;
        state.scrubber = Scrubber::new(scrub, &state.options.view_inputs_to_scrub);
    }

    pub fn set_view_inputs_to_scrub(&self, fields: BTreeSet<String>) {
        let mut state = self.state.lock();
        state.scrubber = Scrubber::new(state.options.scrub_view_inputs, &fields);
        state.options.view_inputs_to_scrub = fields;
    }

    /// Copy of the current configuration.
    pub fn options(&self) -> TelemetryOptions {
        self.state.lock().options.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().options.enabled
    }

    /// True when intercepted log lines should become `log` events.
    pub fn capture_log_enabled(&self) -> bool {
        let state = self.state.lock();
        state.options.enabled && state.options.capture_log
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Appends `event`, evicting from the front past the limit.
    ///
    /// Returns `false` when capture is disabled or the limit is zero.
    pub fn record(&self, event: TelemetryEvent) -> bool {
        let guard = self.state.lock();
        self.record_locked(guard, event)
    }

    /// Like [`record`](Self::record), but gives up if the lock cannot be
    /// taken within `timeout`. Used on the panic path.
    pub fn try_record(&self, event: TelemetryEvent, timeout: Duration) -> bool {
        match self.state.try_lock_for(timeout) {
            Some(guard) => self.record_locked(guard, event),
            None => false,
        }
    }

    fn record_locked(&self, mut state: MutexGuard<'_, BufferState>, event: TelemetryEvent) -> bool {
        if !state.options.enabled || state.options.data_limit == 0 {
            return false;
        }
        let kind = event.kind();
        let event = if kind == TelemetryType::View && state.scrubber.is_active() {
            scrub_event(&state.scrubber, event)
        } else {
            event
        };
        state.events.push_back(event);
        let evicted = state.trim();
        drop(state);

        if let Some(metrics) = &self.metrics {
            metrics.record_event(kind.as_str());
        }
        self.note_evicted(evicted);
        true
    }

    /// Records an event with an already built body.
    pub fn record_event_with_level(&self, level: Level, source: Source, body: TelemetryBody) -> bool {
        self.record(TelemetryEvent::new(level, source, body))
    }

    /// Builds a body of `kind` from caller data and records it.
    ///
    /// Events whose data lacks a required field are dropped with a warning.
    pub fn record_event_for_level(&self, level: Level, kind: TelemetryType, data: ValueMap) -> bool {
        match TelemetryBody::from_data(kind, data) {
            Ok((body, dropped)) => {
                self.note_dropped(kind, &dropped);
                self.record_event_with_level(level, Source::Client, body)
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Dropping telemetry event with invalid body");
                false
            }
        }
    }

    pub fn record_log_event(&self, level: Level, message: &str, extra: Option<ValueMap>) -> bool {
        self.record_typed(level, TelemetryBody::log(message), extra)
    }

    pub fn record_view_event(&self, level: Level, element: &str, extra: Option<ValueMap>) -> bool {
        self.record_typed(level, TelemetryBody::view(element), extra)
    }

    pub fn record_network_event(
        &self,
        level: Level,
        method: &str,
        url: &str,
        status_code: i64,
        extra: Option<ValueMap>,
    ) -> bool {
        self.record_typed(level, TelemetryBody::network(method, url, status_code), extra)
    }

    pub fn record_error_event(&self, level: Level, message: &str, extra: Option<ValueMap>) -> bool {
        self.record_typed(level, TelemetryBody::error(message), extra)
    }

    pub fn record_navigation_event(
        &self,
        level: Level,
        from: &str,
        to: &str,
        extra: Option<ValueMap>,
    ) -> bool {
        self.record_typed(level, TelemetryBody::navigation(from, to), extra)
    }

    /// Records a connectivity change unless `capture_connectivity` is off.
    pub fn record_connectivity_event(&self, level: Level, change: &str, extra: Option<ValueMap>) -> bool {
        if !self.options_capture_connectivity() {
            return false;
        }
        self.record_typed(level, TelemetryBody::connectivity(change), extra)
    }

    pub fn record_manual_event(&self, level: Level, data: ValueMap) -> bool {
        let (body, dropped) = TelemetryBody::manual(data);
        self.note_dropped(TelemetryType::Manual, &dropped);
        self.record_event_with_level(level, Source::Client, body)
    }

    fn record_typed(&self, level: Level, body: TelemetryBody, extra: Option<ValueMap>) -> bool {
        let body = match extra {
            Some(extra) => {
                let kind = body.kind();
                let (body, dropped) = body.with_extra(extra);
                self.note_dropped(kind, &dropped);
                body
            }
            None => body,
        };
        self.record_event_with_level(level, Source::Client, body)
    }

    fn options_capture_connectivity(&self) -> bool {
        self.state.lock().options.capture_connectivity.resolve(true)
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Copy of the buffered events, oldest first.
    pub fn get_all_events(&self) -> Vec<TelemetryEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    /// Buffered events in wire form, oldest first.
    pub fn get_all_data(&self) -> Vec<DynamicRecord> {
        self.get_all_events().iter().map(TelemetryEvent::to_record).collect()
    }

    /// Empties the buffer in one step.
    pub fn clear_all_data(&self) {
        self.state.lock().events.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn note_evicted(&self, evicted: u64) {
        if evicted == 0 {
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_evicted(evicted);
        }
    }

    fn note_dropped(&self, kind: TelemetryType, dropped: &[String]) {
        if dropped.is_empty() {
            return;
        }
        debug!(kind = %kind, fields = ?dropped, "Dropped non-transferable telemetry fields");
        if let Some(metrics) = &self.metrics {
            metrics.record_dropped_fields(dropped.len() as u64);
        }
    }
}

impl std::fmt::Debug for TelemetryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TelemetryBuffer")
            .field("enabled", &state.options.enabled)
            .field("data_limit", &state.options.data_limit)
            .field("len", &state.events.len())
            .finish()
    }
}

fn check_limit(limit: usize) -> Result<(), TelemetryError> {
    if limit > MAX_DATA_LIMIT {
        return Err(TelemetryError::CapacityPolicyViolation {
            requested: i64::try_from(limit).unwrap_or(i64::MAX),
            max: MAX_DATA_LIMIT,
        });
    }
    Ok(())
}

fn scrub_event(scrubber: &Scrubber, event: TelemetryEvent) -> TelemetryEvent {
    let TelemetryEvent {
        level,
        source,
        timestamp_ms,
        body,
    } = event;
    let body = body.map_record(|record| scrubber.scrub(record).0);
    TelemetryEvent {
        level,
        source,
        timestamp_ms,
        body,
    }
}
