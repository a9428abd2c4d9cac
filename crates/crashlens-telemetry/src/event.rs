//! Telemetry events
//!
//! A [`TelemetryEvent`] is immutable once built. Its body is a
//! [`TelemetryBody`], a record whose required fields are fixed by the
//! event's [`TelemetryType`]:
//!
//! | type           | required body fields             |
//! |----------------|----------------------------------|
//! | `log`          | `message`                        |
//! | `dom` (view)   | `element`                        |
//! | `error`        | `message`                        |
//! | `navigation`   | `from`, `to`                     |
//! | `network`      | `method`, `url`, `status_code`   |
//! | `connectivity` | `change`                         |
//! | `manual`       | none                             |
//!
//! Extra caller data is merged into the body but never replaces a required
//! field. Extra values that cannot be represented as JSON are dropped one
//! field at a time.

use chrono::Utc;
use crashlens_core::domain::{
    DtoError, DynamicRecord, FieldKind, FieldSpec, ImmutableRecord, Level, Source, TelemetryType,
    ValueMap, ValueNode,
};

use crate::error::TelemetryError;

const LOG_SCHEMA: &[FieldSpec] = &[FieldSpec::required("message", FieldKind::String)];
const VIEW_SCHEMA: &[FieldSpec] = &[FieldSpec::required("element", FieldKind::String)];
const ERROR_SCHEMA: &[FieldSpec] = &[FieldSpec::required("message", FieldKind::String)];
const NAVIGATION_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("from", FieldKind::String),
    FieldSpec::required("to", FieldKind::String),
];
const NETWORK_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required("method", FieldKind::String),
    FieldSpec::required("url", FieldKind::String),
    FieldSpec::required("status_code", FieldKind::Integer),
];
const CONNECTIVITY_SCHEMA: &[FieldSpec] = &[FieldSpec::required("change", FieldKind::String)];

/// Required body fields for `kind`.
pub fn body_schema(kind: TelemetryType) -> &'static [FieldSpec] {
    match kind {
        TelemetryType::Log => LOG_SCHEMA,
        TelemetryType::View => VIEW_SCHEMA,
        TelemetryType::Error => ERROR_SCHEMA,
        TelemetryType::Navigation => NAVIGATION_SCHEMA,
        TelemetryType::Network => NETWORK_SCHEMA,
        TelemetryType::Connectivity => CONNECTIVITY_SCHEMA,
        TelemetryType::Manual => &[],
    }
}

/// Body of a telemetry event, checked against its type's schema
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryBody {
    kind: TelemetryType,
    record: ImmutableRecord,
}

impl TelemetryBody {
    pub fn log(message: &str) -> Self {
        Self::from_fields(TelemetryType::Log, [("message", message.into())])
    }

    pub fn view(element: &str) -> Self {
        Self::from_fields(TelemetryType::View, [("element", element.into())])
    }

    pub fn error(message: &str) -> Self {
        Self::from_fields(TelemetryType::Error, [("message", message.into())])
    }

    pub fn navigation(from: &str, to: &str) -> Self {
        Self::from_fields(
            TelemetryType::Navigation,
            [("from", from.into()), ("to", to.into())],
        )
    }

    pub fn network(method: &str, url: &str, status_code: i64) -> Self {
        Self::from_fields(
            TelemetryType::Network,
            [
                ("method", method.into()),
                ("url", url.into()),
                ("status_code", status_code.into()),
            ],
        )
    }

    pub fn connectivity(change: &str) -> Self {
        Self::from_fields(TelemetryType::Connectivity, [("change", change.into())])
    }

    /// A manual body holds only caller data.
    pub fn manual(data: ValueMap) -> (Self, Vec<String>) {
        Self::from_fields(TelemetryType::Manual, []).with_extra(data)
    }

    /// Builds a body of `kind` from caller data.
    ///
    /// Non-transferable fields are dropped and returned by name; the
    /// remaining data must satisfy the type's schema.
    pub fn from_data(kind: TelemetryType, data: ValueMap) -> Result<(Self, Vec<String>), DtoError> {
        let (record, dropped) = DynamicRecord::sanitized(data);
        Ok((Self::from_record(kind, record)?, dropped))
    }

    /// Validates an existing record as a body of `kind`.
    pub fn from_record(kind: TelemetryType, record: DynamicRecord) -> Result<Self, DtoError> {
        if !record.is_object() {
            return Err(DtoError::InvalidRoot("array".to_string()));
        }
        body_schema(kind)
            .iter()
            .try_for_each(|spec| spec.check(record.get(spec.name)))?;
        Ok(Self {
            kind,
            record: record.into(),
        })
    }

    /// Merges caller data without replacing fields already present.
    ///
    /// Returns the names of dropped non-transferable fields.
    pub fn with_extra(self, extra: ValueMap) -> (Self, Vec<String>) {
        let (extra, dropped) = DynamicRecord::sanitized(extra);
        let mut record = self.record.into_mutable();
        record.merge_missing(&extra);
        (
            Self {
                kind: self.kind,
                record: record.into(),
            },
            dropped,
        )
    }

    pub fn kind(&self) -> TelemetryType {
        self.kind
    }

    pub fn record(&self) -> &ImmutableRecord {
        &self.record
    }

    /// A mutable copy of the body record.
    pub fn into_record(self) -> DynamicRecord {
        self.record.into_mutable()
    }

    /// Replaces the record after a transformation that keeps the schema
    /// intact (scrubbing only rewrites values of non-required fields).
    pub(crate) fn map_record(self, f: impl FnOnce(DynamicRecord) -> DynamicRecord) -> Self {
        Self {
            kind: self.kind,
            record: f(self.record.into_mutable()).into(),
        }
    }

    fn from_fields<const N: usize>(kind: TelemetryType, fields: [(&str, ValueNode); N]) -> Self {
        let map: ValueMap = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        // Typed constructor arguments are strings and integers only.
        let (record, _) = DynamicRecord::sanitized(map);
        Self {
            kind,
            record: record.into(),
        }
    }
}

/// One timestamped, leveled observation
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub level: Level,
    pub source: Source,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub body: TelemetryBody,
}

impl TelemetryEvent {
    /// Creates an event stamped with the current time.
    pub fn new(level: Level, source: Source, body: TelemetryBody) -> Self {
        Self {
            level,
            source,
            timestamp_ms: Utc::now().timestamp_millis(),
            body,
        }
    }

    pub fn kind(&self) -> TelemetryType {
        self.body.kind()
    }

    /// Wire form: `{"level","type","source","timestamp_ms","body"}`.
    pub fn to_record(&self) -> DynamicRecord {
        let map: ValueMap = [
            ("level", ValueNode::from(self.level.as_str())),
            ("type", ValueNode::from(self.kind().as_str())),
            ("source", ValueNode::from(self.source.as_str())),
            ("timestamp_ms", ValueNode::from(self.timestamp_ms)),
            ("body", ValueNode::from(self.body.record().clone())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let (record, _) = DynamicRecord::sanitized(map);
        record
    }

    /// Parses the wire form back into an event.
    pub fn from_record(record: &DynamicRecord) -> Result<Self, TelemetryError> {
        let text = |name: &str| {
            record.get_str(name).ok_or_else(|| DtoError::WrongKind {
                field: name.to_string(),
                expected: "a string",
            })
        };
        let level = text("level")?.parse()?;
        let kind: TelemetryType = text("type")?.parse()?;
        let source = text("source")?.parse()?;
        let timestamp_ms = record
            .get_i64("timestamp_ms")
            .ok_or_else(|| DtoError::MissingField("timestamp_ms".to_string()))?;
        let body = record
            .get_record("body")
            .ok_or_else(|| DtoError::MissingField("body".to_string()))?;

        Ok(Self {
            level,
            source,
            timestamp_ms,
            body: TelemetryBody::from_record(kind, body)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, ValueNode)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_typed_constructors_satisfy_schema() {
        let bodies = [
            TelemetryBody::log("hello"),
            TelemetryBody::view("button#save"),
            TelemetryBody::error("boom"),
            TelemetryBody::navigation("/a", "/b"),
            TelemetryBody::network("GET", "https://example.com", 200),
            TelemetryBody::connectivity("offline"),
        ];
        for body in bodies {
            let rebuilt = TelemetryBody::from_record(body.kind(), body.record().to_mutable());
            assert!(rebuilt.is_ok(), "{:?}", body.kind());
        }
    }

    #[test]
    fn test_from_data_missing_required_field() {
        let err = TelemetryBody::from_data(
            TelemetryType::Network,
            data(&[("method", "GET".into()), ("url", "/x".into())]),
        )
        .unwrap_err();
        assert_eq!(err, DtoError::MissingField("status_code".to_string()));
    }

    #[test]
    fn test_from_data_wrong_kind() {
        let err = TelemetryBody::from_data(
            TelemetryType::Network,
            data(&[
                ("method", "GET".into()),
                ("url", "/x".into()),
                ("status_code", "two hundred".into()),
            ]),
        )
        .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_from_data_drops_non_transferable_fields() {
        let (body, dropped) = TelemetryBody::from_data(
            TelemetryType::Log,
            data(&[
                ("message", "hi".into()),
                ("ratio", ValueNode::Float(f64::NAN)),
                ("count", 3i64.into()),
            ]),
        )
        .unwrap();
        assert_eq!(dropped, vec!["ratio".to_string()]);
        assert_eq!(body.record().get_i64("count"), Some(3));
        assert!(!body.record().contains("ratio"));
    }

    #[test]
    fn test_extra_never_replaces_required_field() {
        let (body, dropped) = TelemetryBody::log("original")
            .with_extra(data(&[("message", "spoofed".into()), ("thread", "main".into())]));
        assert!(dropped.is_empty());
        assert_eq!(body.record().get_str("message"), Some("original"));
        assert_eq!(body.record().get_str("thread"), Some("main"));
    }

    #[test]
    fn test_manual_body_is_caller_data() {
        let (body, _) = TelemetryBody::manual(data(&[("step", 4i64.into())]));
        assert_eq!(body.kind(), TelemetryType::Manual);
        assert_eq!(body.record().defined_properties(), vec!["step"]);
    }

    #[test]
    fn test_event_wire_form() {
        let event = TelemetryEvent::new(Level::Warning, Source::Client, TelemetryBody::view("input#q"));
        let record = event.to_record();
        assert_eq!(record.get_str("type"), Some("dom"));
        assert_eq!(record.get_str("level"), Some("warning"));
        assert_eq!(record.get_str("source"), Some("client"));
        assert_eq!(record.get_i64("timestamp_ms"), Some(event.timestamp_ms));

        let back = TelemetryEvent::from_record(&record).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_from_record_rejects_mismatched_body() {
        let record = DynamicRecord::from_json_str(
            r#"{"level":"info","type":"network","source":"client","timestamp_ms":1,"body":{"message":"x"}}"#,
        )
        .unwrap();
        assert!(matches!(
            TelemetryEvent::from_record(&record),
            Err(TelemetryError::InvalidEvent(DtoError::MissingField(_)))
        ));
    }

    #[test]
    fn test_body_edits_never_reach_recorded_events() {
        let event = TelemetryEvent::new(Level::Info, Source::Client, TelemetryBody::log("original"));
        let snapshot = event.clone();

        let mut edited = snapshot.body.into_record();
        edited.set("message", "changed").unwrap();

        assert_eq!(event.body.record().get_str("message"), Some("original"));
        assert_eq!(edited.get_str("message"), Some("changed"));
    }
}
