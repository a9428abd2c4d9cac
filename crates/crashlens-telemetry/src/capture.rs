//! Log capture
//!
//! Two ways for log output to become `log` telemetry events:
//!
//! - [`LogCapture`]: an explicit entry point the host routes its own log
//!   calls through. The line is recorded, then written to the host's
//!   [`LogSink`] directly.
//! - [`CaptureLayer`]: a `tracing_subscriber` layer recording events emitted
//!   through `tracing`.
//!
//! Neither path re-enters itself. Events from the crashlens crates are never
//! captured, and a thread-local guard drops anything emitted while a capture
//! is already in progress on the same thread.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crashlens_core::domain::{Level, ValueMap, ValueNode};
use crashlens_core::ports::LogSink;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::buffer::TelemetryBuffer;

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

/// Clears the capture flag when dropped, including during unwinding.
struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURING.with(|c| c.set(false));
    }
}

/// Runs `f` unless a capture is already running on this thread.
fn guarded(f: impl FnOnce()) {
    if CAPTURING.with(|c| c.replace(true)) {
        return;
    }
    let _guard = CaptureGuard;
    f();
}

/// Splits an optional `[level]` prefix off a log line.
///
/// Lines without a recognised prefix are `Info`.
pub fn parse_log_line(line: &str) -> (Level, &str) {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some((tag, message)) = rest.split_once(']') {
            if let Ok(level) = tag.trim().parse::<Level>() {
                return (level, message.trim());
            }
        }
    }
    (Level::Info, trimmed)
}

/// Host-facing log entry point feeding the telemetry buffer
#[derive(Clone)]
pub struct LogCapture {
    buffer: Arc<TelemetryBuffer>,
    sink: Arc<dyn LogSink>,
}

impl LogCapture {
    pub fn new(buffer: Arc<TelemetryBuffer>, sink: Arc<dyn LogSink>) -> Self {
        Self { buffer, sink }
    }

    /// Records a formatted message (see [`capture_log!`](crate::capture_log)).
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(message) => self.log_message(level, message),
            None => self.log_message(level, &args.to_string()),
        }
    }

    /// Records `message` when log capture is on, then writes it to the sink.
    pub fn log_message(&self, level: Level, message: &str) {
        guarded(|| {
            if self.buffer.capture_log_enabled() {
                self.buffer.record_log_event(level, message, None);
            }
        });
        self.sink.write(level, message);
    }

    /// Records a raw line, taking the level from a `[level]` prefix.
    pub fn log_line(&self, line: &str) {
        let (level, message) = parse_log_line(line);
        self.log_message(level, message);
    }

    pub fn buffer(&self) -> &Arc<TelemetryBuffer> {
        &self.buffer
    }
}

impl fmt::Debug for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCapture").finish_non_exhaustive()
    }
}

/// Logs through a [`LogCapture`] with `format!` syntax.
///
/// ```ignore
/// capture_log!(capture, Level::Warning, "retrying {} in {}s", url, delay);
/// ```
#[macro_export]
macro_rules! capture_log {
    ($capture:expr, $level:expr, $($arg:tt)+) => {
        $capture.log($level, format_args!($($arg)+))
    };
}

/// `tracing` layer recording events as `log` telemetry
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    buffer: Arc<TelemetryBuffer>,
}

impl CaptureLayer {
    pub fn new(buffer: Arc<TelemetryBuffer>) -> Self {
        Self { buffer }
    }
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

/// Collects the message and structured fields of an event.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: ValueMap,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value.into());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.fields.insert(field.name().to_string(), text.into());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.into());
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with("crashlens") {
            return;
        }
        guarded(|| {
            if !self.buffer.capture_log_enabled() {
                return;
            }
            let mut collector = FieldCollector::default();
            event.record(&mut collector);
            let Some(message) = collector.message.take() else {
                return;
            };
            collector
                .fields
                .insert("target".to_string(), ValueNode::from(metadata.target()));
            self.buffer
                .record_log_event(map_level(metadata.level()), &message, Some(collector.fields));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashlens_core::config::TelemetryOptions;
    use parking_lot::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl LogSink for RecordingSink {
        fn write(&self, level: Level, message: &str) {
            self.lines.lock().push(format!("[{level}] {message}"));
        }
    }

    fn buffer(capture_log: bool) -> Arc<TelemetryBuffer> {
        Arc::new(
            TelemetryBuffer::new(TelemetryOptions {
                enabled: true,
                capture_log,
                ..TelemetryOptions::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_parse_log_line() {
        assert_eq!(parse_log_line("[warn] disk low"), (Level::Warning, "disk low"));
        assert_eq!(parse_log_line("  [ERROR]failed "), (Level::Error, "failed"));
        assert_eq!(parse_log_line("plain"), (Level::Info, "plain"));
        assert_eq!(parse_log_line("[unknown] x"), (Level::Info, "[unknown] x"));
    }

    #[test]
    fn test_capture_records_and_forwards() {
        let sink = Arc::new(RecordingSink::default());
        let capture = LogCapture::new(buffer(true), sink.clone());

        capture.log_line("[error] upload failed");
        crate::capture_log!(capture, Level::Debug, "retry {} of {}", 1, 3);

        let events = capture.buffer().get_all_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::Error);
        assert_eq!(events[1].body.record().get_str("message"), Some("retry 1 of 3"));
        assert_eq!(
            *sink.lines.lock(),
            vec!["[error] upload failed".to_string(), "[debug] retry 1 of 3".to_string()]
        );
    }

    #[test]
    fn test_capture_off_still_forwards() {
        let sink = Arc::new(RecordingSink::default());
        let capture = LogCapture::new(buffer(false), sink.clone());
        capture.log_message(Level::Info, "hello");
        assert!(capture.buffer().is_empty());
        assert_eq!(sink.lines.lock().len(), 1);
    }

    #[test]
    fn test_layer_captures_host_events_only() {
        let buffer = buffer(true);
        let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "host_app::net", attempt = 2, "request timed out");
            tracing::info!(target: "crashlens_telemetry::buffer", "internal");
        });

        let events = buffer.get_all_events();
        assert_eq!(events.len(), 1);
        let body = events[0].body.record();
        assert_eq!(events[0].level, Level::Warning);
        assert_eq!(body.get_str("message"), Some("request timed out"));
        assert_eq!(body.get_str("target"), Some("host_app::net"));
        assert_eq!(body.get_i64("attempt"), Some(2));
    }

    #[test]
    fn test_guard_resets_after_panic() {
        let buffer = buffer(true);
        let capture = LogCapture::new(buffer.clone(), Arc::new(RecordingSink::default()));

        let result = std::panic::catch_unwind(|| guarded(|| panic!("sink failed")));
        assert!(result.is_err());

        capture.log_message(Level::Info, "after panic");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_guard_blocks_reentry() {
        let buffer = buffer(true);
        let capture = LogCapture::new(buffer.clone(), Arc::new(RecordingSink::default()));
        guarded(|| capture.log_message(Level::Info, "nested"));
        assert!(buffer.is_empty());
    }
}
