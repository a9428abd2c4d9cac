//! Integration tests: report assembly and hand-off to the transport

use std::sync::Arc;

use async_trait::async_trait;
use crashlens_core::config::{SessionOptions, TelemetryOptions};
use crashlens_core::domain::{DynamicRecord, Level, Person};
use crashlens_core::ports::PayloadSender;
use crashlens_session::{MemoryRecordStore, SessionMonitor};
use crashlens_telemetry::{ReportBuilder, Reporter, TelemetryBuffer};
use parking_lot::Mutex;

#[derive(Default)]
struct MockSender {
    sent: Mutex<Vec<DynamicRecord>>,
    fail: bool,
}

#[async_trait]
impl PayloadSender for MockSender {
    async fn send(&self, payload: &DynamicRecord) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("backend unavailable");
        }
        self.sent.lock().push(payload.clone());
        Ok(())
    }
}

fn buffer() -> Arc<TelemetryBuffer> {
    Arc::new(
        TelemetryBuffer::new(TelemetryOptions {
            enabled: true,
            ..TelemetryOptions::default()
        })
        .unwrap(),
    )
}

#[tokio::test]
async fn test_report_carries_telemetry_session_and_person() {
    let buffer = buffer();
    buffer.record_log_event(Level::Info, "opened settings", None);
    buffer.record_network_event(Level::Warning, "GET", "/api", 500, None);

    let monitor = SessionMonitor::start(Arc::new(MemoryRecordStore::new()), &SessionOptions::default());
    let sender = Arc::new(MockSender::default());
    let reporter = Reporter::new(sender.clone(), buffer.clone()).clear_on_success(true);

    let builder = ReportBuilder::message(Level::Error, "request failed")
        .person(Person::with_details("7", Some("ada"), None).unwrap())
        .session_from(&monitor);
    let payload = reporter.report(builder).await.unwrap();

    let data = payload.get_record("data").unwrap();
    assert_eq!(data.get_record("telemetry").unwrap().len(), 2);
    assert_eq!(data.get_record("person").unwrap().get_str("username"), Some("ada"));
    assert_eq!(
        data.get_record("session").unwrap().get_str("status"),
        Some("active")
    );

    assert_eq!(sender.sent.lock().len(), 1);
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_failed_send_keeps_telemetry() {
    let buffer = buffer();
    buffer.record_log_event(Level::Info, "kept", None);
    let sender = Arc::new(MockSender {
        fail: true,
        ..MockSender::default()
    });
    let reporter = Reporter::new(sender, buffer.clone()).clear_on_success(true);

    let err = reporter
        .report(ReportBuilder::message(Level::Error, "x"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("backend unavailable"));
    assert_eq!(buffer.len(), 1);
}

#[tokio::test]
async fn test_send_without_clear_keeps_buffer() {
    let buffer = buffer();
    buffer.record_log_event(Level::Info, "a", None);
    let reporter = Reporter::new(Arc::new(MockSender::default()), buffer.clone());
    let payload = ReportBuilder::message(Level::Info, "hi").telemetry_from(&buffer).build();
    reporter.send(&payload).await.unwrap();
    assert_eq!(buffer.len(), 1);
}
