use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Configuration from cascade.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the scheduling service API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undoable operations kept; oldest are evicted first
    #[serde(default = "default_history_cap")]
    pub cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            cap: default_history_cap(),
        }
    }
}

fn default_history_cap() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// How often the graph view refreshes from the service
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Horizontal distance between auto-layout layers
    #[serde(default = "default_column_spacing")]
    pub column_spacing: f64,
    /// Vertical distance between auto-layout rows
    #[serde(default = "default_row_spacing")]
    pub row_spacing: f64,
    /// Theme overrides: name -> "#RRGGBB"
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            poll_interval_ms: default_poll_interval_ms(),
            column_spacing: default_column_spacing(),
            row_spacing: default_row_spacing(),
            colors: BTreeMap::new(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_column_spacing() -> f64 {
    250.0
}

fn default_row_spacing() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to a file (always the case while the TUI owns the terminal)
    #[serde(default)]
    pub file: bool,
    /// Log directory; defaults to `<tmp>/cascade`
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: false,
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
