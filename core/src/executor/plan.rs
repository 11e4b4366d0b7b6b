//! TOML plan files describing a tree or a staged schedule of shell commands.
//!
//! Tree mode:
//!
//! ```toml
//! [payload]
//! repo = "octo/widgets"
//!
//! [[node]]
//! name = "fetch"
//! command = "curl -sL $URL | tar xz -C /src"
//!
//! [[node]]
//! name = "findbugs"
//! parent = "fetch"
//! command = "java -jar /findbugs.jar -textui /src"
//! timeout_secs = 600
//! ```
//!
//! Staged mode uses `[[task]]` entries with a `phase` instead of a `parent`.
//! A plan holds one mode or the other, never both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ExecutorError;

use super::graph::{TaskGraph, ROOT};
use super::staged::{Phase, StagedSchedule};
use super::types::WorkContext;
use super::work::CommandWork;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Initial context handed to the root
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,

    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeSpec>,

    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub command: String,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub workdir: Option<PathBuf>,

    /// Context key that receives the command's stdout
    #[serde(default)]
    pub capture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,

    #[serde(default = "default_parent")]
    pub parent: String,

    #[serde(flatten)]
    pub command: CommandSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub name: String,

    pub phase: Phase,

    #[serde(flatten)]
    pub command: CommandSpec,
}

fn default_parent() -> String {
    ROOT.to_string()
}

impl CommandSpec {
    fn to_work(&self, default_timeout: Duration) -> CommandWork {
        let timeout = self
            .timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(default_timeout);

        let mut work = CommandWork::new(self.command.clone()).timeout(timeout);
        if let Some(dir) = &self.workdir {
            work = work.workdir(dir.clone());
        }
        if let Some(key) = &self.capture {
            work = work.capture(key.clone());
        }
        work
    }
}

impl Plan {
    pub fn from_toml_str(s: &str) -> Result<Self, ExecutorError> {
        let plan: Plan = toml::from_str(s).map_err(|e| ExecutorError::Plan(e.to_string()))?;
        plan.check_mode()?;
        Ok(plan)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExecutorError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| ExecutorError::Plan(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    pub fn is_staged(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn initial_context(&self) -> WorkContext {
        WorkContext::from_payload(self.payload.clone())
    }

    /// Compile the plan into a task graph.
    ///
    /// Nodes are registered in file order, so a parent must appear before its
    /// children.
    pub fn build_graph(&self, default_timeout: Duration) -> Result<TaskGraph, ExecutorError> {
        if self.is_staged() {
            let mut schedule = StagedSchedule::new();
            for task in &self.tasks {
                schedule.add_task(
                    task.phase,
                    task.name.clone(),
                    task.command.to_work(default_timeout),
                )?;
            }
            return schedule.build();
        }

        let mut graph = TaskGraph::new();
        for node in &self.nodes {
            graph.add_node(
                node.name.clone(),
                &node.parent,
                node.command.to_work(default_timeout),
            )?;
        }
        Ok(graph)
    }

    fn check_mode(&self) -> Result<(), ExecutorError> {
        if !self.nodes.is_empty() && !self.tasks.is_empty() {
            return Err(ExecutorError::Plan(
                "plan mixes [[node]] and [[task]] entries".to_string(),
            ));
        }
        Ok(())
    }
}
