//! Flight Mart - star-schema ETL for a flight-booking database
//!
//! Provides:
//! - Snapshot extraction of the eight operational tables (MySQL, PostgreSQL
//!   or a DuckDB file)
//! - Construction of the time, plane, city and user dimensions and the
//!   flight fact table
//! - Full-replace loading into a DuckDB analytical store
//! - The four fixed business questions over the loaded schema

pub mod config;
pub mod error;
pub mod pipeline;
pub mod queries;
pub mod source;
pub mod star;
pub mod store;

pub use config::{MartConfig, SourceConfig, SourceKind, StoreConfig};
pub use error::{ConfigError, SourceError, StoreError};
pub use pipeline::{EtlExecutor, PipelineError, PipelineStage, RunReport};
pub use queries::{BusinessQuestion, QuestionAnswer, QuestionParams, answer_all};
pub use source::{DuckDbSource, SourceReader, SourceSnapshot, open_source};
#[cfg(feature = "postgres-backend")]
pub use source::PostgresSource;
pub use star::{StarSchema, TransformStats};
pub use store::{LoadMode, LoadReport, MartStore};
