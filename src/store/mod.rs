//! Analytical store
//!
//! A DuckDB file holding the star schema. Each load fully replaces the five
//! target tables; nothing is appended or merged.

mod db;
mod schema;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use db::MartStore;
pub use schema::{DELETE_ORDER, MartSchema, SCHEMA_VERSION, TARGET_TABLES};

/// How the five target tables are replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Delete and insert all five tables in a single transaction
    #[default]
    Transactional,
    /// Delete then insert statement by statement; a failure leaves
    /// earlier tables of the run already replaced
    Sequential,
}

impl LoadMode {
    /// Name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            LoadMode::Transactional => "transactional",
            LoadMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transactional" => Ok(LoadMode::Transactional),
            "sequential" => Ok(LoadMode::Sequential),
            other => Err(format!("Unknown load mode: {other}")),
        }
    }
}

/// Expected and stored row count of one target table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    pub expected: usize,
    pub actual: usize,
}

impl TableCount {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Flights per calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub flights: i64,
}

/// Outcome of one load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub mode: LoadMode,
    /// One entry per target table, in load order; `None` when the count
    /// query failed
    pub tables: Option<Vec<TableCount>>,
    /// `None` when the diagnostic query failed
    pub year_distribution: Option<Vec<YearCount>>,
    pub duration_ms: u64,
}

impl LoadReport {
    /// True when every stored count equals the in-memory count.
    /// Unverified counts never match.
    pub fn counts_match(&self) -> bool {
        self.tables
            .as_ref()
            .is_some_and(|tables| tables.iter().all(TableCount::matches))
    }

    /// Stored rows of one table
    pub fn stored(&self, table: &str) -> Option<usize> {
        self.tables
            .as_ref()?
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.actual)
    }
}
