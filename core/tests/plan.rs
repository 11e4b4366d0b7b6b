use std::io::Write;
use std::time::Duration;

use jobtree_core::executor::Plan;
use jobtree_core::{ExecutorError, NodeStatus, Walker};

fn write_plan(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn command_tree_threads_captured_output_to_children() {
    let file = write_plan(
        r#"
        [payload]
        greeting = "hello"

        [[node]]
        name = "fetch"
        command = "echo /tmp/archive"
        capture = "archive"

        [[node]]
        name = "lint"
        parent = "fetch"
        command = "echo linted"
        capture = "lint"
        "#,
    );

    let plan = Plan::load(file.path()).unwrap();
    let graph = plan.build_graph(Duration::from_secs(10)).unwrap();
    let report = Walker::new(graph)
        .walk_with_context(plan.initial_context())
        .await
        .unwrap();

    assert_eq!(report.status("lint"), Some(NodeStatus::Joined));
    assert_eq!(report.visited().len(), 3);
}

#[tokio::test]
async fn failing_command_is_reported_with_its_node() {
    let file = write_plan(
        r#"
        [[task]]
        name = "findbugs"
        phase = "action"
        command = "exit 7"

        [[task]]
        name = "comment"
        phase = "post-action"
        command = "true"
        "#,
    );

    let plan = Plan::load(file.path()).unwrap();
    let graph = plan.build_graph(Duration::from_secs(10)).unwrap();
    let err = Walker::new(graph).walk().await.unwrap_err();

    match err {
        ExecutorError::WorkFailed { node, source } => {
            assert_eq!(node, "phase/action/findbugs");
            assert!(source.to_string().contains("code Some(7)"), "{source}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_plan_file_is_a_plan_error() {
    let err = Plan::load("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, ExecutorError::Plan(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_plan("[[nodes]]\nname = \"a\"\ncommand = \"true\"\n");
    assert!(matches!(Plan::load(file.path()), Err(ExecutorError::Plan(_))));
}

#[tokio::test]
async fn phase_names_accept_underscores() {
    let file = write_plan(
        r#"
        [[task]]
        name = "comment"
        phase = "post_action"
        command = "true"
        "#,
    );

    let plan = Plan::load(file.path()).unwrap();
    let graph = plan.build_graph(Duration::from_secs(10)).unwrap();
    let report = Walker::new(graph).walk().await.unwrap();

    assert_eq!(report.status("phase/post-action/comment"), Some(NodeStatus::Joined));
}
