use std::time::Duration;

use thiserror::Error;

/// Errors raised while building or walking a task graph
#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    #[error("No such parent: cannot add '{name}' under '{parent}'")]
    NoSuchParent { name: String, parent: String },

    #[error("Duplicate node name: {0}")]
    DuplicateName(String),

    #[error("Invalid node name: {0:?}")]
    InvalidName(String),

    #[error("Work failed at node '{node}': {source}")]
    WorkFailed {
        node: String,
        #[source]
        source: WorkError,
    },

    #[error("Walk cancelled at node '{node}'")]
    Cancelled { node: String },

    #[error("Plan error: {0}")]
    Plan(String),
}

impl ExecutorError {
    /// True for errors raised while building the graph or reading a plan,
    /// before any work ran
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::NoSuchParent { .. }
                | Self::DuplicateName(_)
                | Self::InvalidName(_)
                | Self::Plan(_)
        )
    }
}

/// Errors returned by a single work item
#[derive(Error, Debug, Clone)]
pub enum WorkError {
    #[error("command exited with code {code:?}: {stderr}")]
    Command { code: Option<i32>, stderr: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    Message(String),
}

impl WorkError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<std::io::Error> for WorkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_errors_are_told_apart_from_walk_errors() {
        assert!(ExecutorError::DuplicateName("a".into()).is_construction());
        assert!(ExecutorError::Plan("bad toml".into()).is_construction());
        assert!(!ExecutorError::Cancelled { node: "a".into() }.is_construction());
        assert!(!ExecutorError::WorkFailed {
            node: "a".into(),
            source: WorkError::msg("boom"),
        }
        .is_construction());
    }
}
