//! Report assembly and delivery
//!
//! [`ReportBuilder`] snapshots the telemetry buffer and session state into
//! one payload:
//!
//! ```json
//! {"data": {"level": "...", "timestamp": 0, "body": {...}, "person": {...},
//!           "telemetry": [...], "session": {...}, "platform": {...},
//!           "notifier": {...}}}
//! ```
//!
//! Reading the buffer never consumes it. [`Reporter`] hands payloads to the
//! host's [`PayloadSender`] and may clear the buffer after a successful send.

use std::sync::Arc;

use chrono::Utc;
use crashlens_core::domain::{DynamicRecord, Level, Person, TypedRecord, ValueMap, ValueNode};
use crashlens_core::ports::PayloadSender;
use crashlens_session::{PlatformInfo, SessionMonitor};
use tracing::{debug, warn};

use crate::buffer::TelemetryBuffer;

const NOTIFIER_NAME: &str = "crashlens";

/// Builder for an outgoing report payload
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    level: Level,
    body: ValueNode,
    person: Option<Person>,
    telemetry: Vec<DynamicRecord>,
    session: Option<DynamicRecord>,
    platform: Option<PlatformInfo>,
}

impl ReportBuilder {
    /// A report whose body is a plain message.
    pub fn message(level: Level, text: &str) -> Self {
        let message: ValueNode = [("body", ValueNode::from(text))].into_iter().collect();
        Self::with_body(level, [("message", message)].into_iter().collect())
    }

    /// A report describing `error` and its chain of sources.
    pub fn error(level: Level, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(ValueNode::from(cause.to_string()));
            source = cause.source();
        }
        let trace: ValueNode = [
            ("message", ValueNode::from(error.to_string())),
            ("causes", ValueNode::Array(chain)),
        ]
        .into_iter()
        .collect();
        Self::with_body(level, [("error", trace)].into_iter().collect())
    }

    fn with_body(level: Level, body: ValueNode) -> Self {
        Self {
            level,
            body,
            person: None,
            telemetry: Vec::new(),
            session: None,
            platform: None,
        }
    }

    pub fn person(mut self, person: Person) -> Self {
        self.person = Some(person);
        self
    }

    /// Copies the current buffer contents into the report.
    pub fn telemetry_from(mut self, buffer: &TelemetryBuffer) -> Self {
        self.telemetry = buffer.get_all_data();
        self
    }

    /// Copies the session snapshot into the report.
    pub fn session_from(mut self, monitor: &SessionMonitor) -> Self {
        self.session = Some(monitor.get_current_state().to_record());
        self
    }

    pub fn platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn build(self) -> DynamicRecord {
        let mut data = ValueMap::new();
        data.insert("level".to_string(), self.level.as_str().into());
        data.insert("timestamp".to_string(), Utc::now().timestamp().into());
        data.insert("body".to_string(), self.body);
        if let Some(person) = self.person {
            data.insert("person".to_string(), person.as_record().clone().into());
        }
        data.insert(
            "telemetry".to_string(),
            ValueNode::Array(self.telemetry.into_iter().map(ValueNode::from).collect()),
        );
        if let Some(session) = self.session {
            data.insert("session".to_string(), session.into());
        }
        let platform = self.platform.unwrap_or_else(PlatformInfo::collect);
        data.insert(
            "platform".to_string(),
            [
                ("os", ValueNode::from(platform.os)),
                ("arch", ValueNode::from(platform.arch)),
                ("kernel", ValueNode::from(platform.kernel)),
            ]
            .into_iter()
            .collect(),
        );
        data.insert(
            "notifier".to_string(),
            [
                ("name", ValueNode::from(NOTIFIER_NAME)),
                ("version", ValueNode::from(env!("CARGO_PKG_VERSION"))),
            ]
            .into_iter()
            .collect(),
        );

        let (payload, dropped) =
            DynamicRecord::sanitized([("data".to_string(), ValueNode::Object(data))].into_iter().collect());
        if !dropped.is_empty() {
            warn!(fields = ?dropped, "Report payload lost non-transferable data");
        }
        payload
    }
}

/// Sends assembled reports through the host's transport
pub struct Reporter {
    sender: Arc<dyn PayloadSender>,
    buffer: Arc<TelemetryBuffer>,
    clear_on_success: bool,
}

impl Reporter {
    pub fn new(sender: Arc<dyn PayloadSender>, buffer: Arc<TelemetryBuffer>) -> Self {
        Self {
            sender,
            buffer,
            clear_on_success: false,
        }
    }

    /// Empty the telemetry buffer after each successful send.
    pub fn clear_on_success(mut self, clear: bool) -> Self {
        self.clear_on_success = clear;
        self
    }

    /// Sends `payload`. Retries and queueing belong to the sender.
    pub async fn send(&self, payload: &DynamicRecord) -> anyhow::Result<()> {
        self.sender.send(payload).await?;
        debug!(bytes = payload.to_json_bytes().len(), "Report sent");
        if self.clear_on_success {
            self.buffer.clear_all_data();
        }
        Ok(())
    }

    /// Attaches this reporter's telemetry to `builder`, then sends the result.
    pub async fn report(&self, builder: ReportBuilder) -> anyhow::Result<DynamicRecord> {
        let payload = builder.telemetry_from(&self.buffer).build();
        self.send(&payload).await?;
        Ok(payload)
    }
}
