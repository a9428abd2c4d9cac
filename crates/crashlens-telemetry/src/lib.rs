//! CrashLens Telemetry - Bounded event capture and report assembly
//!
//! Provides:
//! - `TelemetryBuffer`: thread-safe, capacity-bounded queue of telemetry events
//! - `TelemetryEvent` / `TelemetryBody`: typed events with per-type body schemas
//! - `LogCapture` / `CaptureLayer`: log interception feeding the buffer
//! - `Scrubber`: redaction of sensitive view inputs
//! - `ReportBuilder` / `Reporter`: payload assembly and hand-off to the transport
//! - `install_panic_hook`: crash capture into telemetry and session state
//! - `TelemetryMetrics`: Prometheus counters
//! - `init_logging`: tracing subscriber setup

pub mod buffer;
pub mod capture;
pub mod crash_report;
pub mod error;
pub mod event;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod scrub;

pub use buffer::TelemetryBuffer;
pub use capture::{parse_log_line, CaptureLayer, LogCapture};
pub use crash_report::install_panic_hook;
pub use error::TelemetryError;
pub use event::{TelemetryBody, TelemetryEvent};
pub use logging::init_logging;
pub use metrics::TelemetryMetrics;
pub use report::{ReportBuilder, Reporter};
pub use scrub::{Scrubber, SCRUBBED_MARKER};
