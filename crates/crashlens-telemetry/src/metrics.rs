//! Prometheus metrics for telemetry capture

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters describing what the telemetry buffer admitted and discarded.
pub struct TelemetryMetrics {
    registry: Registry,
    /// Counter: admitted events by telemetry type
    pub events_total: IntCounterVec,
    /// Counter: events evicted from the front of a full buffer
    pub evicted_total: IntCounter,
    /// Counter: caller-supplied fields dropped as non-transferable
    pub dropped_fields_total: IntCounter,
}

impl TelemetryMetrics {
    /// Creates a new `TelemetryMetrics` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("crashlens".to_string()), None)?;

        let events_total = IntCounterVec::new(
            Opts::new("telemetry_events_total", "Telemetry events admitted to the buffer"),
            &["type"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let evicted_total = IntCounter::new(
            "telemetry_evicted_total",
            "Telemetry events evicted by the capacity limit",
        )?;
        registry.register(Box::new(evicted_total.clone()))?;

        let dropped_fields_total = IntCounter::new(
            "telemetry_dropped_fields_total",
            "Non-transferable telemetry fields dropped during sanitizing",
        )?;
        registry.register(Box::new(dropped_fields_total.clone()))?;

        Ok(Self {
            registry,
            events_total,
            evicted_total,
            dropped_fields_total,
        })
    }

    pub fn record_event(&self, kind: &str) {
        self.events_total.with_label_values(&[kind]).inc();
    }

    pub fn record_evicted(&self, count: u64) {
        if count > 0 {
            self.evicted_total.inc_by(count);
        }
    }

    pub fn record_dropped_fields(&self, count: u64) {
        if count > 0 {
            self.dropped_fields_total.inc_by(count);
        }
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = TelemetryMetrics::new().expect("create metrics");
        let output = metrics.encode().expect("encode");
        assert!(output.contains("crashlens_telemetry_evicted_total"));
    }

    #[test]
    fn test_record_event_by_type() {
        let metrics = TelemetryMetrics::new().unwrap();
        metrics.record_event("log");
        metrics.record_event("log");
        metrics.record_event("dom");

        assert_eq!(metrics.events_total.with_label_values(&["log"]).get(), 2);
        let output = metrics.encode().unwrap();
        assert!(output.contains("crashlens_telemetry_events_total"));
        assert!(output.contains("type=\"dom\""));
    }

    #[test]
    fn test_zero_counts_are_ignored() {
        let metrics = TelemetryMetrics::new().unwrap();
        metrics.record_evicted(0);
        metrics.record_dropped_fields(3);
        assert_eq!(metrics.evicted_total.get(), 0);
        assert_eq!(metrics.dropped_fields_total.get(), 3);
    }
}
