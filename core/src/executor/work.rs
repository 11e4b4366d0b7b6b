use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::WorkError;

use super::types::{Work, WorkContext};

/// Default per-command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const STDERR_TAIL_BYTES: usize = 2048;

/// Work that passes its context through untouched. Used for the root node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWork;

#[async_trait]
impl Work for NoopWork {
    fn kind(&self) -> &'static str {
        "noop"
    }

    async fn execute(&self, ctx: WorkContext) -> Result<WorkContext, WorkError> {
        Ok(ctx)
    }
}

/// Async closure wrapped as work
pub struct FnWork<F> {
    f: F,
}

impl<F> FnWork<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

/// Shorthand for [`FnWork::new`]
pub fn work_fn<F, Fut>(f: F) -> FnWork<F>
where
    F: Fn(WorkContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WorkContext, WorkError>> + Send + 'static,
{
    FnWork::new(f)
}

#[async_trait]
impl<F, Fut> Work for FnWork<F>
where
    F: Fn(WorkContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WorkContext, WorkError>> + Send + 'static,
{
    fn kind(&self) -> &'static str {
        "fn"
    }

    async fn execute(&self, ctx: WorkContext) -> Result<WorkContext, WorkError> {
        (self.f)(ctx).await
    }
}

/// Shell command run through `bash -c`.
///
/// The child is spawned with `kill_on_drop`, so a cancelled walk (which drops
/// the pending future) or an expired timeout kills the process.
#[derive(Debug, Clone)]
pub struct CommandWork {
    command: String,
    timeout: Duration,
    workdir: Option<PathBuf>,
    capture_key: Option<String>,
}

impl CommandWork {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            workdir: None,
            capture_key: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Store trimmed stdout in the output context under `key`
    pub fn capture(mut self, key: impl Into<String>) -> Self {
        self.capture_key = Some(key.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Work for CommandWork {
    fn kind(&self) -> &'static str {
        "command"
    }

    async fn execute(&self, ctx: WorkContext) -> Result<WorkContext, WorkError> {
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(&self.command)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let child = cmd.spawn()?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res?,
            Err(_) => {
                tracing::warn!(command = %self.command, "command timed out");
                return Err(WorkError::Timeout(self.timeout));
            }
        };

        tracing::debug!(
            command = %self.command,
            code = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );

        if !output.status.success() {
            return Err(WorkError::Command {
                code: output.status.code(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_BYTES),
            });
        }

        match &self.capture_key {
            Some(key) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(ctx.with(key.clone(), stdout.trim().to_string()))
            }
            None => Ok(ctx),
        }
    }
}

fn tail(s: &str, max_bytes: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn noop_passes_context_through() {
        let ctx = WorkContext::new().with("k", "v");
        let out = NoopWork.execute(ctx.clone()).await.unwrap();
        assert_eq!(out, ctx);
    }

    #[tokio::test]
    async fn fn_work_extends_context() {
        let work = work_fn(|ctx: WorkContext| async move { Ok(ctx.with("seen", true)) });
        let out = work.execute(WorkContext::new()).await.unwrap();
        assert_eq!(out.get("seen"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn command_captures_stdout() {
        let work = CommandWork::new("echo hello").capture("greeting");
        let out = work.execute(WorkContext::new()).await.unwrap();
        assert_eq!(out.get_str("greeting"), Some("hello"));
    }

    #[tokio::test]
    async fn command_reports_exit_code() {
        let work = CommandWork::new("echo oops >&2; exit 3");
        let err = work.execute(WorkContext::new()).await.unwrap_err();
        match err {
            WorkError::Command { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_times_out() {
        let work = CommandWork::new("sleep 5").timeout(Duration::from_millis(100));
        let err = work.execute(WorkContext::new()).await.unwrap_err();
        assert!(matches!(err, WorkError::Timeout(d) if d == Duration::from_millis(100)));
        assert_eq!(err.to_string(), "timed out after 100ms");
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc\n", 10), "abc");
    }
}
