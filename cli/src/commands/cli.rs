use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Text,
    Jsonl,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::Text => "text",
            StreamFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "jobtree", version, about = "Walk a tree of analysis jobs concurrently")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Plan file describing the tree (`[[node]]`) or the staged schedule (`[[task]]`).
    pub plan: PathBuf,

    /// Cancel the whole walk after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Cancel every other branch as soon as one node fails.
    #[arg(long)]
    pub fail_fast: bool,

    /// Overrides `walk.stream_format` from the config.
    #[arg(long, value_enum)]
    pub stream_format: Option<StreamFormat>,

    #[arg(long, short)]
    pub verbose: bool,

    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CheckArgs {
    pub plan: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan file
    Run(RunArgs),
    /// Validate a plan file and print its tree without executing it
    Check(CheckArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let args = Args::try_parse_from([
            "jobtree",
            "run",
            "plan.toml",
            "--timeout-secs",
            "30",
            "--fail-fast",
            "--stream-format",
            "jsonl",
        ])
        .unwrap();

        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.plan, PathBuf::from("plan.toml"));
        assert_eq!(run.timeout_secs, Some(30));
        assert!(run.fail_fast);
        assert_eq!(run.stream_format, Some(StreamFormat::Jsonl));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let err = Args::try_parse_from(["jobtree", "run", "p.toml", "-v", "-q"]);
        assert!(err.is_err());
    }
}
