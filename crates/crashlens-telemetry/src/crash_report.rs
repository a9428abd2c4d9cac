//! Panic hook
//!
//! On panic, records an `error` telemetry event and marks the continuity
//! record as crashed, so the next run classifies this one as `Crashed`.
//! Both steps wait only briefly for their locks; the previous hook always
//! runs afterwards.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crashlens_core::domain::{Level, Source, ValueMap, ValueNode};
use crashlens_session::SessionMonitor;

use crate::buffer::TelemetryBuffer;
use crate::event::{TelemetryBody, TelemetryEvent};

const LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builds the telemetry event recorded for a panic.
pub fn panic_event(message: &str, location: Option<String>) -> TelemetryEvent {
    let mut extra = ValueMap::new();
    extra.insert("panic".to_string(), ValueNode::Bool(true));
    if let Some(location) = location {
        extra.insert("location".to_string(), ValueNode::from(location));
    }
    let (body, _) = TelemetryBody::error(message).with_extra(extra);
    TelemetryEvent::new(Level::Critical, Source::Client, body)
}

/// Installs a panic hook feeding `buffer` and `monitor`.
///
/// Chains with the existing panic hook so default behavior (stderr output)
/// is preserved.
pub fn install_panic_hook(monitor: Arc<SessionMonitor>, buffer: Arc<TelemetryBuffer>) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = panic_message(panic_info.payload());
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

        buffer.try_record(panic_event(&message, location), LOCK_TIMEOUT);
        monitor.mark_crashed();

        // Call the previous panic hook
        previous_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashlens_core::domain::TelemetryType;

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(s.as_ref()), "static str");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(s.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_panic_event_shape() {
        let event = panic_event("boom", Some("main.rs:10:5".to_string()));
        assert_eq!(event.kind(), TelemetryType::Error);
        assert_eq!(event.level, Level::Critical);
        let body = event.body.record();
        assert_eq!(body.get_str("message"), Some("boom"));
        assert_eq!(body.get_str("location"), Some("main.rs:10:5"));
        assert_eq!(body.get_bool("panic"), Some(true));
    }
}
