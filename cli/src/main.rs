use clap::Parser;
use jobtree_cli::commands::{check, cli, run};
use jobtree_core::error::{self, ExecutorError};
use jobtree_core::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let cfg =
        jobtree_core::config::load_default().map_err(|e| error::CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(error::CliError::Config)?;

    match args.command {
        cli::Commands::Run(run_args) => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling walk");
                    on_signal.cancel();
                }
            });
            run::run_plan(run_args, &cfg, cancel).await
        }
        cli::Commands::Check(check_args) => {
            check::check_plan(&check_args.plan, cfg.walk.command_timeout_secs)
        }
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 1: a node's work failed
    // 2: walk cancelled (interrupt or deadline)
    // 11: config error
    // 12: plan error (parse or graph construction)
    // 50: internal/uncategorized
    match e {
        error::CliError::Executor(ee) if ee.is_construction() => 12,
        error::CliError::Executor(ExecutorError::WorkFailed { .. }) => 1,
        error::CliError::Executor(ExecutorError::Cancelled { .. }) => 2,
        error::CliError::Executor(_) => 50,
        error::CliError::Config(_) => 11,
    }
}

fn init_tracing(logging: &jobtree_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("jobtree"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("jobtree.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
