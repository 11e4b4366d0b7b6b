use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::NodeStatus;

/// Visual progress for a walk: one overall bar plus a spinner per running node
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    node_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_nodes: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                node_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_nodes as u64));
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} nodes {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        overall.set_style(style);
        overall.set_message("walking...");

        Self {
            multi,
            overall,
            node_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn start_node(&mut self, node: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(node.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        self.node_bars.insert(node.to_string(), bar);
    }

    pub fn finish_node(&mut self, node: &str, status: NodeStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        if let Some(bar) = self.node_bars.remove(node) {
            let icon = match status {
                NodeStatus::Failed => "❌",
                NodeStatus::Cancelled => "⛔",
                _ => "✅",
            };
            bar.finish_with_message(format!("{} {} ({}ms)", icon, node, duration_ms));
        }

        self.overall.inc(1);
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ walk complete"
        } else {
            "❌ walk failed"
        };
        self.overall.finish_with_message(msg);
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.node_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
