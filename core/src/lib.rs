//! Concurrent task-tree execution core for static-analysis jobs.
//!
//! Build a [`TaskGraph`] (or a [`StagedSchedule`]), hand it to a [`Walker`],
//! and walk it once.

pub mod config;
pub mod error;
pub mod executor;

pub use error::{ExecutorError, WorkError};
pub use executor::{
    CancellationToken, NodeStatus, Phase, StagedSchedule, TaskGraph, WalkOptions, WalkReport,
    Walker, Work, WorkContext, ROOT,
};
