use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ExecutorError;

use super::types::Work;
use super::work::NoopWork;

/// Reserved name of the root node
pub const ROOT: &str = "Root";

/// A named node: the work it runs, its grouped tasks and the names of its
/// children.
///
/// Grouped tasks run concurrently once the node's own work returned, and the
/// children start only after every task joined.
#[derive(Clone)]
pub struct Node {
    work: Arc<dyn Work>,
    tasks: Vec<(String, Arc<dyn Work>)>,
    children: Vec<String>,
}

impl Node {
    fn new(work: Arc<dyn Work>) -> Self {
        Self {
            work,
            tasks: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn work(&self) -> &Arc<dyn Work> {
        &self.work
    }

    /// Grouped tasks keyed by their qualified `node/task` name, in
    /// registration order
    pub fn tasks(&self) -> &[(String, Arc<dyn Work>)] {
        &self.tasks
    }

    /// Child names in registration order
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("work", &self.work.kind())
            .field(
                "tasks",
                &self.tasks.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("children", &self.children)
            .finish()
    }
}

/// Task tree rooted at [`ROOT`].
///
/// Every node except the root has exactly one parent, recorded only in the
/// parent's child list. Names are unique across the whole graph, qualified
/// task names included.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: HashMap<String, Node>,
    tasks: HashSet<String>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    /// Graph holding only the no-op root
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT.to_string(), Node::new(Arc::new(NoopWork)));
        Self {
            nodes,
            tasks: HashSet::new(),
        }
    }

    /// Register `name` as the last child of `parent`.
    ///
    /// Fails without touching the graph if the parent is unknown or the name
    /// is already taken.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: &str,
        work: impl Work + 'static,
    ) -> Result<(), ExecutorError> {
        self.add_shared(name, parent, Arc::new(work))
    }

    /// Same as [`TaskGraph::add_node`] for work that is already shared
    pub fn add_shared(
        &mut self,
        name: impl Into<String>,
        parent: &str,
        work: Arc<dyn Work>,
    ) -> Result<(), ExecutorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExecutorError::InvalidName(name));
        }
        if !self.nodes.contains_key(parent) {
            return Err(ExecutorError::NoSuchParent {
                name,
                parent: parent.to_string(),
            });
        }
        if self.is_taken(&name) {
            return Err(ExecutorError::DuplicateName(name));
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(name.clone());
        }
        self.nodes.insert(name, Node::new(work));
        Ok(())
    }

    /// Attach `name` to `node` as a grouped task and return its qualified
    /// `node/name` key, which is what walk reports and events use.
    pub fn add_task(
        &mut self,
        name: impl Into<String>,
        node: &str,
        work: impl Work + 'static,
    ) -> Result<String, ExecutorError> {
        self.add_shared_task(name, node, Arc::new(work))
    }

    pub fn add_shared_task(
        &mut self,
        name: impl Into<String>,
        node: &str,
        work: Arc<dyn Work>,
    ) -> Result<String, ExecutorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExecutorError::InvalidName(name));
        }
        if !self.nodes.contains_key(node) {
            return Err(ExecutorError::NoSuchParent {
                name,
                parent: node.to_string(),
            });
        }
        let qualified = format!("{node}/{name}");
        if self.tasks.contains(&qualified) || self.nodes.contains_key(&qualified) {
            return Err(ExecutorError::DuplicateName(qualified));
        }

        let owner = self
            .nodes
            .get_mut(node)
            .expect("parent existence checked above");
        owner.tasks.push((qualified.clone(), work));
        self.tasks.insert(qualified.clone());
        Ok(qualified)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.tasks.contains(name)
    }

    pub fn children(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|n| n.children.as_slice())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn root(&self) -> &Node {
        // Only ever inserted by `new`, never removed.
        &self.nodes[ROOT]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of grouped tasks across all nodes
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// True when only the root is registered
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Parent of `name`, found by scanning child lists
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, node)| node.children.iter().any(|c| c == name))
            .map(|(parent, _)| parent.as_str())
    }

    /// Node names in pre-order, children in registration order
    pub fn names(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(name) = stack.pop() {
            out.push(name.to_string());
            if let Some(children) = self.children(name) {
                stack.extend(children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Pre-order node names, each followed by its qualified task names
    pub fn unit_names(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len() + self.tasks.len());
        for name in self.names() {
            let tasks = self.nodes.get(&name).map(|n| n.tasks.as_slice()).unwrap_or_default();
            out.push(name);
            out.extend(tasks.iter().map(|(task, _)| task.clone()));
        }
        out
    }

    /// Indented text rendering of the tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(ROOT, 0, &mut out);
        out
    }

    fn render_into(&self, name: &str, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(name) else {
            return;
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(name);
        out.push_str(" (");
        out.push_str(node.work.kind());
        out.push_str(")\n");
        for (task, work) in &node.tasks {
            out.push_str(&"  ".repeat(depth + 1));
            out.push_str("* ");
            out.push_str(task);
            out.push_str(" (");
            out.push_str(work.kind());
            out.push_str(")\n");
        }
        for child in &node.children {
            self.render_into(child, depth + 1, out);
        }
    }
}
