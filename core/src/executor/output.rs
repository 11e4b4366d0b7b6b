use chrono::Local;
use serde::Serialize;

use super::types::{NodeStatus, WalkOptions, WalkReport};

/// One line of the JSONL run stream
#[derive(Debug, Clone, Serialize)]
pub struct WalkEvent {
    pub v: i32,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl WalkEvent {
    fn new(event_type: &str, run_id: &str) -> Self {
        Self {
            v: 1,
            event_type: event_type.to_string(),
            ts: Local::now().to_rfc3339(),
            run_id: run_id.to_string(),
            node: None,
            status: None,
            error: None,
            metadata: None,
        }
    }
}

fn emit_json(ev: &WalkEvent) {
    if let Ok(line) = serde_json::to_string(ev) {
        println!("{line}");
    }
}

/// Emit walk start event
pub fn emit_walk_start(opts: &WalkOptions, run_id: &str, total_nodes: usize) {
    if opts.is_jsonl() {
        let mut event = WalkEvent::new("walk.start", run_id);
        event.metadata = Some(serde_json::json!({ "total_nodes": total_nodes }));
        emit_json(&event);
    } else if !opts.quiet {
        println!("🚀 Walking task tree: {} nodes", total_nodes);
    }
}

/// Emit node start event
pub fn emit_node_start(opts: &WalkOptions, run_id: &str, node: &str, kind: &str) {
    if opts.is_jsonl() {
        let mut event = WalkEvent::new("node.start", run_id);
        event.node = Some(node.to_string());
        event.metadata = Some(serde_json::json!({ "kind": kind }));
        emit_json(&event);
    } else if opts.verbose && !opts.quiet {
        println!("  ⏳ {}", node);
    }
}

/// Emit node end event, once the node's own work has returned
pub fn emit_node_end(
    opts: &WalkOptions,
    run_id: &str,
    node: &str,
    status: NodeStatus,
    duration_ms: u64,
    error: Option<&str>,
) {
    if opts.is_jsonl() {
        let mut event = WalkEvent::new("node.end", run_id);
        event.node = Some(node.to_string());
        event.status = Some(status);
        event.error = error.map(str::to_string);
        event.metadata = Some(serde_json::json!({ "duration_ms": duration_ms }));
        emit_json(&event);
    } else if !opts.quiet && (opts.verbose || error.is_some()) {
        let icon = match status {
            NodeStatus::Failed => "❌",
            NodeStatus::Cancelled => "⛔",
            _ => "✅",
        };
        match error {
            Some(err) => println!("  {} {}: {}ms ({})", icon, node, duration_ms, err),
            None => println!("  {} {}: {}ms", icon, node, duration_ms),
        }
    }
}

/// Emit walk end event
pub fn emit_walk_end(opts: &WalkOptions, report: &WalkReport) {
    let joined = report.count(NodeStatus::Joined);
    let failed = report.count(NodeStatus::Failed);
    let cancelled = report.count(NodeStatus::Cancelled);
    let pending = report.count(NodeStatus::Pending);

    if opts.is_jsonl() {
        let mut event = WalkEvent::new("walk.end", &report.run_id);
        event.error = report.error.as_ref().map(|e| e.to_string());
        event.metadata = Some(serde_json::json!({
            "total_nodes": report.total_nodes,
            "joined": joined,
            "failed": failed,
            "cancelled": cancelled,
            "pending": pending,
            "duration_ms": report.duration_ms,
        }));
        emit_json(&event);
    } else if !opts.quiet {
        let icon = if report.is_success() { "✅" } else { "❌" };
        println!(
            "\n{} Walk finished: {}/{} nodes joined, {} failed, {} cancelled, {} not reached in {}ms",
            icon, joined, report.total_nodes, failed, cancelled, pending, report.duration_ms
        );
        if let Some(err) = &report.error {
            println!("   first error: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_end_event_serializes_status_in_snake_case() {
        let mut event = WalkEvent::new("node.end", "run-1");
        event.node = Some("findbugs".to_string());
        event.status = Some(NodeStatus::Cancelled);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "node.end");
        assert_eq!(value["status"], "cancelled");
        assert_eq!(value["node"], "findbugs");
        assert!(value.get("error").is_none());
    }
}
