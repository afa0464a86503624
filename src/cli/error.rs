//! CLI error types

use thiserror::Error;

use flight_mart::{ConfigError, PipelineError, StoreError};

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Command-line value that cannot be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Result rendering failed
    #[error("Output error: {0}")]
    Output(String),

    /// Async runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl CliError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CliError::Pipeline(e) => e.user_message(),
            CliError::Store(e) => e.user_message(),
            CliError::Config(e) => {
                format!("{e}\n\nHint: Check --config and the MYSQL_* / DUCKDB_* variables.")
            }
            _ => self.to_string(),
        }
    }
}
