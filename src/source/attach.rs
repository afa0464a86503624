//! DuckDB-hosted source reader
//!
//! The operational database is attached to an in-memory DuckDB session:
//! MySQL through DuckDB's `mysql` extension, or a DuckDB file directly.

use async_trait::async_trait;
use duckdb::Connection;
use duckdb::types::{TimeUnit, Value};
use tracing::{debug, info};

use super::decode::{date_from_epoch_days, timestamp_from_epoch_micros};
use super::{RawTable, SourceReader, SourceValue};
use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;

/// Alias under which the operational database is attached
const SOURCE_CATALOG: &str = "oltp";

/// Reads source tables through a DuckDB session
pub struct DuckDbSource {
    conn: Connection,
    catalog: Option<String>,
    kind: &'static str,
}

impl DuckDbSource {
    /// Attach the configured source
    pub fn connect(config: &SourceConfig) -> Result<Self, SourceError> {
        let kind = config.kind.name();
        let conn =
            Connection::open_in_memory().map_err(|e| SourceError::unavailable(kind, e))?;

        let attach = match config.kind {
            SourceKind::MySql => {
                if config.install_extension {
                    conn.execute_batch("INSTALL mysql;")
                        .map_err(|e| SourceError::unavailable(kind, e))?;
                }
                conn.execute_batch("LOAD mysql;")
                    .map_err(|e| SourceError::unavailable(kind, e))?;
                format!(
                    "ATTACH '{}' AS {} (TYPE mysql, READ_ONLY)",
                    quote_literal(&config.connection_string()),
                    SOURCE_CATALOG
                )
            }
            SourceKind::DuckDb => {
                let path = config.path.as_ref().ok_or_else(|| {
                    SourceError::unavailable(kind, "no source database path configured")
                })?;
                if !path.exists() {
                    return Err(SourceError::unavailable(
                        kind,
                        format!("{} does not exist", path.display()),
                    ));
                }
                format!(
                    "ATTACH '{}' AS {} (READ_ONLY)",
                    quote_literal(&path.display().to_string()),
                    SOURCE_CATALOG
                )
            }
            SourceKind::Postgres => {
                return Err(SourceError::unavailable(
                    kind,
                    "postgres sources are read with PostgresSource",
                ));
            }
        };

        conn.execute_batch(&attach)
            .map_err(|e| SourceError::unavailable(kind, e))?;
        info!(source = %config.describe(), "Attached operational source");

        Ok(Self {
            conn,
            catalog: Some(SOURCE_CATALOG.to_string()),
            kind,
        })
    }

    /// Read tables from the default catalog of an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            catalog: None,
            kind: "duckdb",
        }
    }

    fn qualified(&self, table: &str) -> String {
        match &self.catalog {
            Some(catalog) => format!("{}.{}", catalog, table),
            None => table.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl SourceReader for DuckDbSource {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn read_table(&self, table: &str) -> Result<RawTable, SourceError> {
        let sql = format!("SELECT * FROM {}", self.qualified(table));
        debug!(sql = %sql, "Reading source table");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| SourceError::query(table, e))?;
        let mut rows = stmt.query([]).map_err(|e| SourceError::query(table, e))?;

        // Column names are only known once the statement has executed
        let column_names: Vec<String> = rows
            .as_ref()
            .map(|stmt| stmt.column_names())
            .unwrap_or_default();

        let mut values = Vec::new();
        while let Some(row) = rows.next().map_err(|e| SourceError::query(table, e))? {
            let mut cells = Vec::with_capacity(column_names.len());
            for i in 0..column_names.len() {
                let value: Value = row.get(i).map_err(|e| SourceError::query(table, e))?;
                cells.push(to_source_value(value));
            }
            values.push(cells);
        }

        Ok(RawTable::new(table, &column_names, values))
    }
}

fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

pub(crate) fn to_source_value(value: Value) -> SourceValue {
    match value {
        Value::Null => SourceValue::Null,
        Value::Boolean(b) => SourceValue::Int(i64::from(b)),
        Value::TinyInt(n) => SourceValue::Int(n.into()),
        Value::SmallInt(n) => SourceValue::Int(n.into()),
        Value::Int(n) => SourceValue::Int(n.into()),
        Value::BigInt(n) => SourceValue::Int(n),
        Value::UTinyInt(n) => SourceValue::Int(n.into()),
        Value::USmallInt(n) => SourceValue::Int(n.into()),
        Value::UInt(n) => SourceValue::Int(n.into()),
        Value::UBigInt(n) => i64::try_from(n)
            .map(SourceValue::Int)
            .unwrap_or_else(|_| SourceValue::Other(n.to_string())),
        Value::HugeInt(n) => i64::try_from(n)
            .map(SourceValue::Int)
            .unwrap_or_else(|_| SourceValue::Other(n.to_string())),
        Value::Float(f) => SourceValue::Float(f64::from(f)),
        Value::Double(f) => SourceValue::Float(f),
        Value::Decimal(d) => SourceValue::Text(d.to_string()),
        Value::Text(s) => SourceValue::Text(s),
        Value::Enum(s) => SourceValue::Text(s),
        Value::Date32(days) => date_from_epoch_days(days)
            .map(SourceValue::Date)
            .unwrap_or_else(|| SourceValue::Other(days.to_string())),
        Value::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.checked_mul(1_000_000),
                TimeUnit::Millisecond => raw.checked_mul(1_000),
                TimeUnit::Microsecond => Some(raw),
                TimeUnit::Nanosecond => Some(raw / 1_000),
            };
            micros
                .and_then(timestamp_from_epoch_micros)
                .map(SourceValue::Timestamp)
                .unwrap_or_else(|| SourceValue::Other(raw.to_string()))
        }
        other => SourceValue::Other(format!("{:?}", other)),
    }
}
