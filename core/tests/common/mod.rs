#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobtree_core::{TaskGraph, Work, WorkContext, WorkError, ROOT};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn position(entries: &[String], name: &str) -> usize {
    entries
        .iter()
        .position(|e| e == name)
        .unwrap_or_else(|| panic!("{name} was never logged: {entries:?}"))
}

/// Pushes its name onto a shared log, optionally after a delay or with a failure
pub struct Recorder {
    name: String,
    log: Log,
    delay: Option<Duration>,
    fail: bool,
    panic: bool,
}

impl Recorder {
    pub fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            delay: None,
            fail: false,
            panic: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }
}

#[async_trait]
impl Work for Recorder {
    fn kind(&self) -> &'static str {
        "recorder"
    }

    async fn execute(&self, ctx: WorkContext) -> Result<WorkContext, WorkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic {
            panic!("{} blew up", self.name);
        }
        self.log.lock().unwrap().push(self.name.clone());
        if self.fail {
            return Err(WorkError::msg(format!("{} failed", self.name)));
        }
        Ok(ctx.with(self.name.clone(), true))
    }
}

/// Root -> A -> {B, C}, C -> D
pub fn diamond_free_tree(log: &Log) -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph.add_node("A", ROOT, Recorder::new("A", log)).unwrap();
    graph.add_node("B", "A", Recorder::new("B", log)).unwrap();
    graph.add_node("C", "A", Recorder::new("C", log)).unwrap();
    graph.add_node("D", "C", Recorder::new("D", log)).unwrap();
    graph
}
