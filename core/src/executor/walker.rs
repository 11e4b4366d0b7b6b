use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ExecutorError;

use super::graph::{TaskGraph, ROOT};
use super::output::{emit_node_end, emit_node_start, emit_walk_end, emit_walk_start};
use super::progress::ProgressMonitor;
use super::types::{NodeReport, NodeStatus, WalkOptions, WalkReport, Work, WorkContext};

/// Concurrent pre-order walker over a [`TaskGraph`].
///
/// A node's work runs to completion before any of its children start; the
/// children then run concurrently, one tokio task per child, and are all joined
/// before the node's visit finishes. Fan-out is unbounded.
pub struct Walker {
    graph: Arc<TaskGraph>,
    opts: WalkOptions,
}

impl Walker {
    pub fn new(graph: TaskGraph) -> Self {
        Self::from_shared(Arc::new(graph))
    }

    pub fn from_shared(graph: Arc<TaskGraph>) -> Self {
        Self {
            graph,
            opts: WalkOptions::default(),
        }
    }

    pub fn with_options(mut self, opts: WalkOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Walk the tree from an empty context; first error wins
    pub async fn walk(&self) -> Result<WalkReport, ExecutorError> {
        self.walk_with_context(WorkContext::new()).await
    }

    /// Walk the tree with `ctx` handed to the root
    pub async fn walk_with_context(&self, ctx: WorkContext) -> Result<WalkReport, ExecutorError> {
        self.walk_detailed(ctx, CancellationToken::new())
            .await
            .into_result()
    }

    /// Walk the tree, stopping every branch once `cancel` fires
    pub async fn walk_with_cancel(
        &self,
        ctx: WorkContext,
        cancel: CancellationToken,
    ) -> Result<WalkReport, ExecutorError> {
        self.walk_detailed(ctx, cancel).await.into_result()
    }

    /// Walk the tree and return the full per-node report, success or not
    #[tracing::instrument(name = "executor.walk", skip_all, fields(nodes = self.graph.len(), tasks = self.graph.task_count()))]
    pub async fn walk_detailed(&self, ctx: WorkContext, cancel: CancellationToken) -> WalkReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        // Deadline and fail-fast cancel this token, never the caller's.
        let cancel = cancel.child_token();
        let total_nodes = self.graph.len() + self.graph.task_count();

        let nodes = self
            .graph
            .unit_names()
            .into_iter()
            .map(|name| (name, NodeReport::default()))
            .collect();

        let state = Arc::new(WalkState {
            graph: self.graph.clone(),
            run_id: run_id.clone(),
            opts: self.opts.clone(),
            cancel: cancel.clone(),
            first_error: OnceLock::new(),
            nodes: Mutex::new(nodes),
            progress: Mutex::new(ProgressMonitor::new(total_nodes, self.opts.progress_bar)),
        });

        tracing::info!(run_id = %run_id, total_nodes, "beginning to walk the tree");
        emit_walk_start(&self.opts, &run_id, total_nodes);

        let deadline = self.opts.timeout.map(|timeout| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!(timeout_ms = timeout.as_millis() as u64, "walk deadline reached, cancelling");
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let root = tokio::spawn(visit(state.clone(), ROOT.to_string(), ctx));
        let outcome = match root.await {
            Ok(outcome) => outcome,
            Err(err) => {
                state.record_panic(ROOT, &err);
                Outcome::Failed
            }
        };

        if let Some(handle) = deadline {
            handle.abort();
        }

        let report = WalkReport {
            run_id,
            total_nodes,
            nodes: state.snapshot(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: state.first_error.get().cloned(),
        };

        if let Ok(monitor) = state.progress.lock() {
            monitor.finish(report.is_success());
        }
        emit_walk_end(&self.opts, &report);
        tracing::info!(
            outcome = ?outcome,
            duration_ms = report.duration_ms,
            "walk finished"
        );

        report
    }
}

/// Shared state of one walk. The graph is read-only; everything else is
/// guarded for concurrent writers.
struct WalkState {
    graph: Arc<TaskGraph>,
    run_id: String,
    opts: WalkOptions,
    cancel: CancellationToken,
    first_error: OnceLock<ExecutorError>,
    nodes: Mutex<HashMap<String, NodeReport>>,
    progress: Mutex<ProgressMonitor>,
}

impl WalkState {
    /// Keep the first error only; later ones are logged and dropped
    fn record_error(&self, err: ExecutorError) {
        if let Err(err) = self.first_error.set(err) {
            tracing::debug!(error = %err, "discarding error, an earlier one was already recorded");
        }
    }

    fn record_panic(&self, node: &str, err: &tokio::task::JoinError) {
        let message = format!("branch panicked: {err}");
        tracing::error!(node = %node, "{}", message);
        self.update(node, |r| {
            r.status = NodeStatus::Failed;
            r.error.get_or_insert_with(|| message.clone());
        });
        self.record_error(ExecutorError::WorkFailed {
            node: node.to_string(),
            source: crate::error::WorkError::Message(message),
        });
    }

    fn update(&self, node: &str, f: impl FnOnce(&mut NodeReport)) {
        if let Ok(mut nodes) = self.nodes.lock() {
            f(nodes.entry(node.to_string()).or_default());
        }
    }

    fn start(&self, node: &str, kind: &str) -> Instant {
        let now = Instant::now();
        self.update(node, |r| {
            r.status = NodeStatus::Running;
            r.started = Some(now);
        });
        if let Ok(mut monitor) = self.progress.lock() {
            monitor.start_node(node);
        }
        emit_node_start(&self.opts, &self.run_id, node, kind);
        now
    }

    /// Record the end of a node's own work
    fn finish(&self, node: &str, started: Instant, status: NodeStatus, error: Option<String>) {
        let now = Instant::now();
        let duration_ms = now.duration_since(started).as_millis() as u64;
        emit_node_end(
            &self.opts,
            &self.run_id,
            node,
            status,
            duration_ms,
            error.as_deref(),
        );
        self.update(node, |r| {
            r.status = status;
            r.finished = Some(now);
            r.duration_ms = Some(duration_ms);
            r.error = error;
        });
        if let Ok(mut monitor) = self.progress.lock() {
            monitor.finish_node(node, status, duration_ms);
        }
    }

    fn set_status(&self, node: &str, status: NodeStatus) {
        self.update(node, |r| r.status = status);
    }

    fn snapshot(&self) -> HashMap<String, NodeReport> {
        self.nodes.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

/// How a branch ended, from the point of view of the node that spawned it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Joined,
    Cancelled,
    Failed,
}

impl Outcome {
    /// Failure dominates cancellation, which dominates success
    fn combine(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Failed, _) | (_, Outcome::Failed) => Outcome::Failed,
            (Outcome::Cancelled, _) | (_, Outcome::Cancelled) => Outcome::Cancelled,
            _ => Outcome::Joined,
        }
    }

    fn status(self) -> NodeStatus {
        match self {
            Outcome::Joined => NodeStatus::Joined,
            Outcome::Cancelled => NodeStatus::Cancelled,
            Outcome::Failed => NodeStatus::Failed,
        }
    }
}

fn visit(state: Arc<WalkState>, name: String, ctx: WorkContext) -> BoxFuture<'static, Outcome> {
    async move {
        let Some(node) = state.graph.node(&name) else {
            // Child lists only ever hold registered names.
            tracing::error!(node = %name, "child missing from graph");
            return Outcome::Failed;
        };
        let work = node.work().clone();
        let tasks = node.tasks().to_vec();
        let children = node.children().to_vec();

        let ctx = match run_unit(&state, &name, &work, ctx).await {
            Ok(ctx) => ctx,
            Err(outcome) => return outcome,
        };

        let ctx = if tasks.is_empty() {
            ctx
        } else {
            match join_tasks(&state, &name, tasks, ctx).await {
                Ok(ctx) => ctx,
                Err(outcome) => {
                    state.set_status(&name, outcome.status());
                    return outcome;
                }
            }
        };

        if children.is_empty() {
            state.set_status(&name, NodeStatus::Joined);
            return Outcome::Joined;
        }

        // Each handle enters the join set in the same step that spawns it.
        let mut branches: FuturesUnordered<_> = FuturesUnordered::new();
        for child in children {
            let handle = tokio::spawn(visit(state.clone(), child.clone(), ctx.clone()));
            branches.push(async move { (child, handle.await) });
        }

        let mut outcome = Outcome::Joined;
        while let Some((child, joined)) = branches.next().await {
            let child_outcome = match joined {
                Ok(o) => o,
                Err(err) => {
                    state.record_panic(&child, &err);
                    Outcome::Failed
                }
            };
            outcome = outcome.combine(child_outcome);
        }

        tracing::debug!(node = %name, outcome = ?outcome, "children joined");
        state.set_status(&name, outcome.status());
        outcome
    }
    .boxed()
}

/// Run one work item under the walk's cancellation token and record how it
/// ended. `Ok` carries the output context, `Err` the terminal outcome.
async fn run_unit(
    state: &WalkState,
    name: &str,
    work: &Arc<dyn Work>,
    ctx: WorkContext,
) -> Result<WorkContext, Outcome> {
    if state.cancel.is_cancelled() {
        state.set_status(name, NodeStatus::Cancelled);
        state.record_error(ExecutorError::Cancelled {
            node: name.to_string(),
        });
        return Err(Outcome::Cancelled);
    }

    tracing::debug!(node = %name, kind = work.kind(), "visiting node");
    let started = state.start(name, work.kind());

    let result = tokio::select! {
        biased;
        _ = state.cancel.cancelled() => None,
        res = work.execute(ctx) => Some(res),
    };

    match result {
        None => {
            tracing::info!(node = %name, "node cancelled");
            state.finish(name, started, NodeStatus::Cancelled, None);
            state.record_error(ExecutorError::Cancelled {
                node: name.to_string(),
            });
            Err(Outcome::Cancelled)
        }
        Some(Err(err)) => {
            tracing::warn!(node = %name, error = %err, "node failed");
            state.finish(name, started, NodeStatus::Failed, Some(err.to_string()));
            state.record_error(ExecutorError::WorkFailed {
                node: name.to_string(),
                source: err,
            });
            if state.opts.fail_fast {
                state.cancel.cancel();
            }
            Err(Outcome::Failed)
        }
        Some(Ok(ctx)) => {
            state.finish(name, started, NodeStatus::Succeeded, None);
            Ok(ctx)
        }
    }
}

/// Run a node's grouped tasks concurrently, one tokio task each, and merge
/// their outputs over `ctx` in registration order.
async fn join_tasks(
    state: &Arc<WalkState>,
    node: &str,
    tasks: Vec<(String, Arc<dyn Work>)>,
    ctx: WorkContext,
) -> Result<WorkContext, Outcome> {
    let mut outputs: Vec<Option<WorkContext>> = vec![None; tasks.len()];
    let mut pending: FuturesUnordered<_> = FuturesUnordered::new();
    for (index, (task, work)) in tasks.into_iter().enumerate() {
        let state = state.clone();
        let task_ctx = ctx.clone();
        let handle = tokio::spawn({
            let task = task.clone();
            async move {
                let res = run_unit(&state, &task, &work, task_ctx).await;
                if res.is_ok() {
                    state.set_status(&task, NodeStatus::Joined);
                }
                res
            }
        });
        pending.push(async move { (index, task, handle.await) });
    }

    let mut outcome = Outcome::Joined;
    while let Some((index, task, joined)) = pending.next().await {
        match joined {
            Ok(Ok(out)) => outputs[index] = Some(out),
            Ok(Err(o)) => outcome = outcome.combine(o),
            Err(err) => {
                state.record_panic(&task, &err);
                outcome = Outcome::Failed;
            }
        }
    }

    tracing::debug!(node = %node, outcome = ?outcome, "grouped tasks joined");
    if outcome != Outcome::Joined {
        return Err(outcome);
    }
    Ok(outputs.iter().flatten().fold(ctx, |acc, out| acc.merge(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkError;
    use crate::executor::work::{work_fn, NoopWork};
    use std::time::Duration;

    #[test]
    fn failure_dominates_when_combining() {
        assert_eq!(
            Outcome::Joined.combine(Outcome::Cancelled),
            Outcome::Cancelled
        );
        assert_eq!(Outcome::Cancelled.combine(Outcome::Failed), Outcome::Failed);
        assert_eq!(Outcome::Joined.combine(Outcome::Joined), Outcome::Joined);
    }

    #[tokio::test]
    async fn root_only_graph_walks_cleanly() {
        let walker = Walker::new(TaskGraph::new());
        let report = walker.walk().await.unwrap();

        assert_eq!(report.total_nodes, 1);
        assert_eq!(report.status(ROOT), Some(NodeStatus::Joined));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn children_receive_the_parent_output_context() {
        let mut graph = TaskGraph::new();
        graph
            .add_node("fetch", ROOT, work_fn(|ctx: WorkContext| async move {
                Ok(ctx.with("archive", "/tmp/repo"))
            }))
            .unwrap();
        graph
            .add_node("lint", "fetch", work_fn(|ctx: WorkContext| async move {
                if ctx.get_str("archive") == Some("/tmp/repo") {
                    Ok(ctx)
                } else {
                    Err(WorkError::msg("archive missing"))
                }
            }))
            .unwrap();

        let report = Walker::new(graph).walk().await.unwrap();
        assert_eq!(report.status("lint"), Some(NodeStatus::Joined));
    }

    #[tokio::test]
    async fn fail_fast_cancels_sibling_branches() {
        let mut graph = TaskGraph::new();
        graph
            .add_node("bad", ROOT, work_fn(|_ctx: WorkContext| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(WorkError::msg("boom"))
            }))
            .unwrap();
        graph
            .add_node("slow", ROOT, work_fn(|ctx: WorkContext| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(ctx)
            }))
            .unwrap();
        graph.add_node("after-slow", "slow", NoopWork).unwrap();

        let walker =
            Walker::new(graph).with_options(WalkOptions::default().with_fail_fast(true));
        let report = walker
            .walk_detailed(WorkContext::new(), CancellationToken::new())
            .await;

        assert!(matches!(
            report.error,
            Some(ExecutorError::WorkFailed { ref node, .. }) if node == "bad"
        ));
        assert_eq!(report.status("bad"), Some(NodeStatus::Failed));
        assert_eq!(report.status("slow"), Some(NodeStatus::Cancelled));
        assert_eq!(report.status("after-slow"), Some(NodeStatus::Pending));
        assert_eq!(report.status(ROOT), Some(NodeStatus::Failed));
    }
}
