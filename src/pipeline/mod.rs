//! ETL pipeline: extract a source snapshot, build the star schema, load it
//!
//! ```text
//! source ──extract──▶ SourceSnapshot ──transform──▶ StarSchema ──load──▶ store
//! ```
//!
//! A run is all-or-nothing at the stage level: the first failing stage stops
//! the run. Tolerated data-quality problems (unmatched lookups, unparseable
//! dates) never fail a stage; they are counted in the run report.

mod error;
mod executor;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{PipelineError, PipelineResult};
pub use executor::{EtlExecutor, RunReport, StageTiming};

/// Stages of one run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Recreate the star schema (only when requested)
    Init,
    /// Read the eight operational tables
    Extract,
    /// Build dimensions and facts in memory
    Transform,
    /// Replace the five target tables and check counts
    Load,
}

impl PipelineStage {
    /// Stage name for logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Init => "init",
            PipelineStage::Extract => "extract",
            PipelineStage::Transform => "transform",
            PipelineStage::Load => "load",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
