//! Column name resolution for `SELECT *` result sets

use std::collections::HashMap;

use crate::error::SourceError;

/// Maps column names of one source table to result positions.
///
/// Lookups are case-insensitive since MySQL and PostgreSQL disagree on how
/// identifiers are folded.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    table: String,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Build an index from the column names in result order
    pub fn new<I, S>(table: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positions = HashMap::new();
        for (i, name) in names.into_iter().enumerate() {
            positions.entry(name.as_ref().to_lowercase()).or_insert(i);
        }
        Self {
            table: table.to_string(),
            positions,
        }
    }

    /// Table the index belongs to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Position of a column that must exist
    pub fn require(&self, column: &str) -> Result<usize, SourceError> {
        self.optional(column)
            .ok_or_else(|| SourceError::MissingColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
    }

    /// Position of a column that may be absent
    pub fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(&column.to_lowercase()).copied()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the result set has no columns
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
