use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

use super::graph::{TaskGraph, ROOT};
use super::types::Work;
use super::work::NoopWork;

/// Coarse stage of a staged schedule, in execution order.
///
/// Parses from `pre-action`, `pre_action` or `PreAction`, in plan files too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Phase {
    Root,
    PreAction,
    Action,
    PostAction,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Root,
        Phase::PreAction,
        Phase::Action,
        Phase::PostAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Root => "root",
            Phase::PreAction => "pre-action",
            Phase::Action => "action",
            Phase::PostAction => "post-action",
        }
    }

    /// Name of the graph node that runs this phase
    pub fn node_name(&self) -> &'static str {
        match self {
            Phase::Root => "phase/root",
            Phase::PreAction => "phase/pre-action",
            Phase::Action => "phase/action",
            Phase::PostAction => "phase/post-action",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized || p.as_str().replace('-', "") == normalized)
            .ok_or_else(|| ExecutorError::Plan(format!("unknown phase: {s}")))
    }
}

impl TryFrom<String> for Phase {
    type Error = ExecutorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Four fixed phases of independent tasks.
///
/// Tasks inside a phase run concurrently; a phase starts only after every
/// task of the previous phase finished. `build` lowers the schedule onto a
/// [`TaskGraph`] as the path `Root -> phase/root -> phase/pre-action ->
/// phase/action -> phase/post-action`, with each task attached to its phase
/// node as a grouped task named `phase/<phase>/<task>`.
#[derive(Default)]
pub struct StagedSchedule {
    phases: [Vec<(String, Arc<dyn Work>)>; 4],
    names: HashSet<String>,
}

impl StagedSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to `phase`. Task names are unique across all phases.
    pub fn add_task(
        &mut self,
        phase: Phase,
        name: impl Into<String>,
        work: impl Work + 'static,
    ) -> Result<&mut Self, ExecutorError> {
        self.add_shared(phase, name, Arc::new(work))
    }

    pub fn add_shared(
        &mut self,
        phase: Phase,
        name: impl Into<String>,
        work: Arc<dyn Work>,
    ) -> Result<&mut Self, ExecutorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExecutorError::InvalidName(name));
        }
        if !self.names.insert(name.clone()) {
            return Err(ExecutorError::DuplicateName(name));
        }
        self.phases[phase.index()].push((name, work));
        Ok(self)
    }

    pub fn tasks(&self, phase: Phase) -> Vec<&str> {
        self.phases[phase.index()]
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn build(self) -> Result<TaskGraph, ExecutorError> {
        let mut graph = TaskGraph::new();
        let mut parent = ROOT;
        for (phase, tasks) in Phase::ALL.into_iter().zip(self.phases) {
            graph.add_node(phase.node_name(), parent, NoopWork)?;
            for (name, work) in tasks {
                graph.add_shared_task(name, phase.node_name(), work)?;
            }
            parent = phase.node_name();
        }
        Ok(graph)
    }
}
