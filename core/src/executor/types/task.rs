use async_trait::async_trait;

use crate::error::WorkError;

use super::context::WorkContext;

/// Unit of execution attached to a graph node.
///
/// The walker only ever calls `execute`; everything else about a work item is
/// opaque to it. The returned context is handed to every child of the node.
#[async_trait]
pub trait Work: Send + Sync {
    /// Short label used in logs and run events
    fn kind(&self) -> &'static str {
        "work"
    }

    async fn execute(&self, ctx: WorkContext) -> Result<WorkContext, WorkError>;
}
