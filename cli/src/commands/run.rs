use std::time::Duration;

use jobtree_core::config::{AppConfig, WalkConfig};
use jobtree_core::error::CliError;
use jobtree_core::executor::Plan;
use jobtree_core::{CancellationToken, WalkOptions, Walker};

use super::cli::RunArgs;

/// Layer command-line flags over the loaded `[walk]` section.
pub fn effective_walk_config(base: &WalkConfig, args: &RunArgs) -> WalkConfig {
    let mut walk = base.clone();
    if let Some(secs) = args.timeout_secs {
        walk.timeout_secs = Some(secs);
    }
    if args.fail_fast {
        walk.fail_fast = true;
    }
    if let Some(format) = args.stream_format {
        walk.stream_format = format.as_str().to_string();
    }
    if args.verbose {
        walk.verbose = true;
    }
    if args.no_progress || args.quiet {
        walk.progress_bar = false;
    }
    walk
}

pub async fn run_plan(
    args: RunArgs,
    cfg: &AppConfig,
    cancel: CancellationToken,
) -> Result<i32, CliError> {
    let walk = effective_walk_config(&cfg.walk, &args);
    let mut opts = WalkOptions::from_config(&walk);
    opts.quiet = args.quiet;

    let plan = Plan::load(&args.plan)?;
    let graph = plan.build_graph(Duration::from_secs(walk.command_timeout_secs))?;
    tracing::debug!(
        plan = %args.plan.display(),
        nodes = graph.len(),
        staged = plan.is_staged(),
        "plan loaded"
    );

    let report = Walker::new(graph)
        .with_options(opts)
        .walk_with_cancel(plan.initial_context(), cancel)
        .await?;

    tracing::info!(
        run_id = %report.run_id,
        duration_ms = report.duration_ms,
        "plan finished"
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::StreamFormat;
    use jobtree_core::ExecutorError;
    use std::io::Write;
    use std::path::PathBuf;

    fn args(plan: PathBuf) -> RunArgs {
        RunArgs {
            plan,
            timeout_secs: None,
            fail_fast: false,
            stream_format: None,
            verbose: false,
            quiet: true,
            no_progress: true,
        }
    }

    fn plan_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn flags_override_config() {
        let mut run = args(PathBuf::from("p.toml"));
        run.timeout_secs = Some(5);
        run.fail_fast = true;
        run.stream_format = Some(StreamFormat::Jsonl);

        let walk = effective_walk_config(&WalkConfig::default(), &run);
        assert_eq!(walk.timeout_secs, Some(5));
        assert!(walk.fail_fast);
        assert_eq!(walk.stream_format, "jsonl");
        assert!(!walk.progress_bar);
    }

    #[tokio::test]
    async fn successful_plan_exits_zero() {
        let file = plan_file("[[node]]\nname = \"ok\"\ncommand = \"true\"\n");
        let code = run_plan(args(file.path().to_path_buf()), &AppConfig::default(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn failing_plan_surfaces_the_node() {
        let file = plan_file("[[node]]\nname = \"bad\"\ncommand = \"exit 3\"\n");
        let err = run_plan(args(file.path().to_path_buf()), &AppConfig::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::Executor(ExecutorError::WorkFailed { ref node, .. }) if node == "bad"
        ));
    }
}
