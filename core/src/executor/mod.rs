//! Concurrent execution of a rooted task tree
//!
//! # Architecture
//!
//! ```text
//! TaskGraph::new() + add_node(name, parent, work)      StagedSchedule::add_task(phase, ..)
//!   ↓                                                    ↓ build()
//! TaskGraph { "Root" -> children ... }  <───────────────┘
//!   ↓
//! Walker::walk()
//!   visit(Root) → work.execute(ctx) → spawn grouped tasks → join, merge
//!               → spawn visit(child, ctx') per child → join
//!   ↓
//! WalkReport { per-node status, first error }
//! ```
//!
//! Construction errors (`NoSuchParent`, `DuplicateName`) surface immediately.
//! Walk errors are first-error-wins; unrelated branches keep running unless
//! the walk is cancelled, times out, or runs with `fail_fast`.

mod graph;
mod output;
pub mod plan;
mod progress;
mod staged;
mod walker;
pub mod types;
pub mod work;

pub use graph::{Node, TaskGraph, ROOT};
pub use output::{emit_node_end, emit_node_start, emit_walk_end, emit_walk_start, WalkEvent};
pub use plan::Plan;
pub use progress::ProgressMonitor;
pub use staged::{Phase, StagedSchedule};
pub use types::{NodeReport, NodeStatus, WalkOptions, WalkReport, Work, WorkContext};
pub use walker::Walker;
pub use work::{work_fn, CommandWork, FnWork, NoopWork};

pub use tokio_util::sync::CancellationToken;
