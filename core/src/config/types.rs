use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub walk: WalkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "jobtree_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Deadline for a whole walk; unset or 0 means no deadline
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Cancel remaining branches as soon as one node fails
    #[serde(default)]
    pub fail_fast: bool,

    /// "text" or "jsonl"
    #[serde(default = "default_stream_format")]
    pub stream_format: String,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,

    /// Timeout for each command node that does not set its own
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_stream_format() -> String {
    "text".to_string()
}

fn default_progress_bar() -> bool {
    true
}

fn default_command_timeout_secs() -> u64 {
    600
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            fail_fast: false,
            stream_format: default_stream_format(),
            verbose: false,
            progress_bar: default_progress_bar(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}
