//! Levels, sources, telemetry types and tri-state flags
//!
//! Each enum serializes to the lowercase wire string used in report payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DtoError;

/// Severity of a report or telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = DtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            other => Err(DtoError::WrongKind {
                field: format!("level '{other}'"),
                expected: "one of debug, info, warning, error, critical",
            }),
        }
    }
}

/// Origin of a telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Client,
    Server,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Client => "client",
            Source::Server => "server",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Source::Client),
            "server" => Ok(Source::Server),
            other => Err(DtoError::WrongKind {
                field: format!("source '{other}'"),
                expected: "client or server",
            }),
        }
    }
}

/// Kind of telemetry event; decides which body fields are required
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelemetryType {
    #[serde(rename = "log")]
    Log,
    /// UI element interaction; `"dom"` on the wire
    #[serde(rename = "dom")]
    View,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "navigation")]
    Navigation,
    #[serde(rename = "network")]
    Network,
    #[serde(rename = "connectivity")]
    Connectivity,
    #[serde(rename = "manual")]
    Manual,
}

impl TelemetryType {
    pub const ALL: [TelemetryType; 7] = [
        TelemetryType::Log,
        TelemetryType::View,
        TelemetryType::Error,
        TelemetryType::Navigation,
        TelemetryType::Network,
        TelemetryType::Connectivity,
        TelemetryType::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryType::Log => "log",
            TelemetryType::View => "dom",
            TelemetryType::Error => "error",
            TelemetryType::Navigation => "navigation",
            TelemetryType::Network => "network",
            TelemetryType::Connectivity => "connectivity",
            TelemetryType::Manual => "manual",
        }
    }
}

impl fmt::Display for TelemetryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryType {
    type Err = DtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "view" {
            return Ok(TelemetryType::View);
        }
        TelemetryType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| DtoError::WrongKind {
                field: format!("telemetry type '{s}'"),
                expected: "a known telemetry type",
            })
    }
}

/// An optional switch: unset, on, or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriStateFlag {
    #[default]
    None,
    On,
    Off,
}

impl TriStateFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriStateFlag::None => "none",
            TriStateFlag::On => "on",
            TriStateFlag::Off => "off",
        }
    }

    /// Lenient parse; anything unrecognised is `None`.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("on") | Some("true") | Some("yes") => TriStateFlag::On,
            Some("off") | Some("false") | Some("no") => TriStateFlag::Off,
            _ => TriStateFlag::None,
        }
    }

    /// Resolves the flag against a default used when unset.
    pub fn resolve(self, default: bool) -> bool {
        match self {
            TriStateFlag::None => default,
            TriStateFlag::On => true,
            TriStateFlag::Off => false,
        }
    }
}
