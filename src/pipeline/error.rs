//! Error types for ETL runs
//!
//! Each variant wraps the error of the layer that failed, so the CLI can
//! print that layer's hint.

use thiserror::Error;

use crate::error::{ConfigError, SourceError, StoreError};

/// Errors that abort an ETL run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration rejected before extraction
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Extraction from the operational source failed
    #[error("Extract failed: {0}")]
    Source(#[from] SourceError),

    /// Creating or loading the analytical store failed
    #[error("Load failed: {0}")]
    Store(#[from] StoreError),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Name of the stage the error belongs to
    pub fn stage_name(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Source(_) => "extract",
            PipelineError::Store(_) => "load",
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Config(e) => {
                format!("{e}\n\nHint: Check the config file and the MYSQL_* / DUCKDB_* variables.")
            }
            PipelineError::Source(e) => e.user_message(),
            PipelineError::Store(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err: PipelineError = StoreError::NotInitialized.into();
        assert_eq!(err.stage_name(), "load");
        assert!(err.user_message().contains("init"));

        let err: PipelineError = SourceError::unavailable("mysql", "refused").into();
        assert_eq!(err.stage_name(), "extract");
        assert!(err.to_string().contains("refused"));
    }
}
