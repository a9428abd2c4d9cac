//! Configuration module for CrashLens.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::TriStateFlag;

/// Largest accepted telemetry `data_limit`.
pub const MAX_DATA_LIMIT: usize = 10_000;

/// Default telemetry capacity.
pub const DEFAULT_DATA_LIMIT: usize = 10;

/// View input names scrubbed when no explicit list is configured.
pub const DEFAULT_VIEW_INPUTS_TO_SCRUB: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "pin",
    "confirm_password",
    "card_number",
];

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for CrashLens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telemetry: TelemetryOptions,
    pub session: SessionOptions,
    pub logging: LoggingConfig,
}

/// Telemetry capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryOptions {
    /// Master switch for telemetry capture.
    pub enabled: bool,
    /// Record intercepted log lines as `log` events.
    pub capture_log: bool,
    /// Record connectivity changes; unset leaves the decision to the host.
    pub capture_connectivity: TriStateFlag,
    /// Maximum number of retained events. `0` captures nothing.
    pub data_limit: usize,
    /// Replace sensitive view inputs with a redaction marker.
    pub scrub_view_inputs: bool,
    /// Field names scrubbed from view event bodies.
    pub view_inputs_to_scrub: BTreeSet<String>,
}

/// Session continuity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Classify unexplained unclean exits as suspected out-of-memory.
    pub oom_monitoring: bool,
    /// Seconds between heartbeat writes of the continuity record.
    pub heartbeat_interval_secs: u64,
    /// Directory holding the continuity record.
    pub store_dir: PathBuf,
    /// Name of the continuity record inside `store_dir`.
    pub record_name: String,
    /// Host application version; a change between runs is never treated as OOM.
    pub app_version: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/crashlens/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("crashlens")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            capture_log: false,
            capture_connectivity: TriStateFlag::None,
            data_limit: DEFAULT_DATA_LIMIT,
            scrub_view_inputs: true,
            view_inputs_to_scrub: DEFAULT_VIEW_INPUTS_TO_SCRUB
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            oom_monitoring: true,
            heartbeat_interval_secs: 5,
            store_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("crashlens"),
            record_name: "session".to_string(),
            app_version: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"telemetry.data_limit"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- telemetry ---
        if self.telemetry.data_limit > MAX_DATA_LIMIT {
            errors.push(ValidationError {
                field: "telemetry.data_limit".into(),
                message: format!("must be at most {MAX_DATA_LIMIT}"),
            });
        }
        if self
            .telemetry
            .view_inputs_to_scrub
            .iter()
            .any(|name| name.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "telemetry.view_inputs_to_scrub".into(),
                message: "must not contain empty names".into(),
            });
        }

        // --- session ---
        if self.session.heartbeat_interval_secs == 0 {
            errors.push(ValidationError {
                field: "session.heartbeat_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        let name = &self.session.record_name;
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            errors.push(ValidationError {
                field: "session.record_name".into(),
                message: format!("must be a plain file name, got '{name}'"),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // -- telemetry --

    pub fn telemetry_enabled(mut self, enabled: bool) -> Self {
        self.config.telemetry.enabled = enabled;
        self
    }

    pub fn telemetry_capture_log(mut self, capture: bool) -> Self {
        self.config.telemetry.capture_log = capture;
        self
    }

    pub fn telemetry_capture_connectivity(mut self, flag: TriStateFlag) -> Self {
        self.config.telemetry.capture_connectivity = flag;
        self
    }

    pub fn telemetry_data_limit(mut self, limit: usize) -> Self {
        self.config.telemetry.data_limit = limit;
        self
    }

    pub fn telemetry_scrub_view_inputs(mut self, scrub: bool) -> Self {
        self.config.telemetry.scrub_view_inputs = scrub;
        self
    }

    pub fn telemetry_view_inputs_to_scrub<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.telemetry.view_inputs_to_scrub = names.into_iter().map(Into::into).collect();
        self
    }

    // -- session --

    pub fn session_oom_monitoring(mut self, enabled: bool) -> Self {
        self.config.session.oom_monitoring = enabled;
        self
    }

    pub fn session_heartbeat_interval_secs(mut self, seconds: u64) -> Self {
        self.config.session.heartbeat_interval_secs = seconds;
        self
    }

    pub fn session_store_dir(mut self, dir: PathBuf) -> Self {
        self.config.session.store_dir = dir;
        self
    }

    pub fn session_record_name(mut self, name: impl Into<String>) -> Self {
        self.config.session.record_name = name.into();
        self
    }

    pub fn session_app_version(mut self, version: impl Into<String>) -> Self {
        self.config.session.app_version = Some(version.into());
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    /// Consume the builder and return the configuration without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, returning the configuration only if it is valid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
