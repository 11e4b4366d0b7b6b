use std::path::Path;

use jobtree_core::error::CliError;
use jobtree_core::executor::Plan;
use jobtree_core::TaskGraph;

/// Parse and assemble a plan without running anything.
pub fn load_graph(path: &Path, command_timeout_secs: u64) -> Result<(Plan, TaskGraph), CliError> {
    let plan = Plan::load(path)?;
    let graph = plan.build_graph(std::time::Duration::from_secs(command_timeout_secs))?;
    Ok((plan, graph))
}

pub fn check_plan(path: &Path, command_timeout_secs: u64) -> Result<i32, CliError> {
    let (plan, graph) = load_graph(path, command_timeout_secs)?;
    let mode = if plan.is_staged() { "staged" } else { "tree" };

    print!("{}", graph.render());
    println!(
        "{} nodes, {} tasks, {mode} plan, ok",
        graph.len(),
        graph.task_count()
    );
    Ok(0)
}
