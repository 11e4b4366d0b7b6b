use thiserror::Error;

use super::executor::ExecutorError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("walk failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("config error: {0}")]
    Config(String),
}
