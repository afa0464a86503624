//! Error types for source extraction, store loading and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the operational source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The operational store could not be reached
    #[error("Source unavailable ({source_kind}): {message}")]
    Unavailable {
        source_kind: String,
        message: String,
    },

    /// An expected column is absent from a source table
    #[error("Missing column '{column}' in source table '{table}'")]
    MissingColumn { table: String, column: String },

    /// A source value could not be converted to the expected type
    #[error("Unexpected value in {table}.{column}: {message}")]
    InvalidValue {
        table: String,
        column: String,
        message: String,
    },

    /// Query error while reading a table
    #[error("Query error reading '{table}': {message}")]
    Query { table: String, message: String },
}

impl SourceError {
    /// Create an `Unavailable` error for the given source kind
    pub fn unavailable(source_kind: impl Into<String>, message: impl ToString) -> Self {
        SourceError::Unavailable {
            source_kind: source_kind.into(),
            message: message.to_string(),
        }
    }

    /// Create a `Query` error for the given table
    pub fn query(table: impl Into<String>, message: impl ToString) -> Self {
        SourceError::Query {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SourceError::Unavailable {
                source_kind,
                message,
            } => {
                format!(
                    "Cannot connect to the {source_kind} source: {message}\n\n\
                    Hint: Check host, port and credentials (MYSQL_* variables or the [source] section)."
                )
            }
            SourceError::MissingColumn { table, column } => {
                format!(
                    "Source table '{table}' has no column '{column}'.\n\n\
                    Hint: The operational schema does not match the expected layout."
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Errors raised by the analytical store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Store schema not created yet
    #[error("Store not initialized. Run 'init' first.")]
    NotInitialized,

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i32, found: i32 },

    /// Inserting into a target table failed
    #[error("Load into '{table}' failed: {message}")]
    Load { table: String, message: String },

    /// IO error
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    /// Create a `Load` error for the given table
    pub fn load(table: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Load {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotInitialized => {
                "Analytical store not initialized.\n\nHint: Run 'flight-mart init' or 'flight-mart etl --init' first."
                    .to_string()
            }
            StoreError::SchemaVersionMismatch { expected, found } => {
                format!(
                    "Schema version mismatch (expected v{expected}, found v{found}).\n\n\
                    Hint: Run 'flight-mart init' to recreate the star schema."
                )
            }
            StoreError::Load { table, message } => {
                format!(
                    "Loading '{table}' failed: {message}\n\n\
                    Hint: In sequential load mode earlier tables of this run are not rolled back."
                )
            }
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Errors raised while assembling configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected layout
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
