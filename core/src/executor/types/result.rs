use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use serde::Serialize;

use crate::error::ExecutorError;

/// Lifecycle of a single node during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    /// Own work returned; children may still be running
    Succeeded,
    /// Own work and every descendant succeeded
    Joined,
    Failed,
    Cancelled,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Joined => "joined",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node record kept by the walker
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub status: NodeStatus,

    /// When the node's own work started
    pub started: Option<Instant>,

    /// When the node's own work returned (children not included)
    pub finished: Option<Instant>,

    /// Duration of the node's own work in milliseconds
    pub duration_ms: Option<u64>,

    /// Error message, set only on the node whose work failed
    pub error: Option<String>,
}

impl Default for NodeReport {
    fn default() -> Self {
        Self {
            status: NodeStatus::Pending,
            started: None,
            finished: None,
            duration_ms: None,
            error: None,
        }
    }
}

/// Outcome of a whole walk
#[derive(Debug, Clone)]
pub struct WalkReport {
    pub run_id: String,

    /// Number of nodes in the graph, root included
    pub total_nodes: usize,

    /// node name -> report
    pub nodes: HashMap<String, NodeReport>,

    /// Total walk duration in milliseconds
    pub duration_ms: u64,

    /// First error observed anywhere in the walk
    pub error: Option<ExecutorError>,
}

impl WalkReport {
    pub fn status(&self, node: &str) -> Option<NodeStatus> {
        self.nodes.get(node).map(|r| r.status)
    }

    pub fn node(&self, node: &str) -> Option<&NodeReport> {
        self.nodes.get(node)
    }

    /// Names of every node whose work was started
    pub fn visited(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .filter(|(_, r)| r.started.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.values().filter(|r| r.status == status).count()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Turn the report into the first-error-wins result of a walk
    pub fn into_result(self) -> Result<WalkReport, ExecutorError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
