use std::time::Duration;

use crate::config::WalkConfig;

/// Options for a single walk
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Output stream format: "text" or "jsonl"
    pub stream_format: String,

    /// Verbose output (per-node lines in text mode)
    pub verbose: bool,

    /// Quiet mode (suppress non-essential output)
    pub quiet: bool,

    /// Enable visual progress bars (text output only)
    pub progress_bar: bool,

    /// Deadline for the whole walk; cancels every running branch when hit
    pub timeout: Option<Duration>,

    /// Cancel every other branch as soon as one node fails
    pub fail_fast: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            stream_format: "text".to_string(),
            verbose: false,
            quiet: true,
            progress_bar: false,
            timeout: None,
            fail_fast: false,
        }
    }
}

impl WalkOptions {
    pub fn from_config(cfg: &WalkConfig) -> Self {
        let progress_bar = cfg.progress_bar && cfg.stream_format == "text";

        Self {
            stream_format: cfg.stream_format.clone(),
            verbose: cfg.verbose,
            quiet: false,
            progress_bar,
            timeout: cfg.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            fail_fast: cfg.fail_fast,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn is_jsonl(&self) -> bool {
        self.stream_format == "jsonl"
    }
}
