//! Log sink port
//!
//! The host's own log output. Log capture records a line as telemetry and
//! then forwards it to a sink; the sink must write directly and never route
//! back through the capture path.

use std::io::Write;

use crate::domain::Level;

/// Port trait for the host's raw log output
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, message: &str);
}

/// Writes `[level] message` lines to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, level: Level, message: &str) {
        // Nothing useful can be done if stderr itself is gone.
        let _ = writeln!(std::io::stderr().lock(), "[{level}] {message}");
    }
}
