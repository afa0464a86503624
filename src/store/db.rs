//! DuckDB-backed analytical store

use std::path::{Path, PathBuf};
use std::time::Instant;

use duckdb::{AccessMode, Config, Connection, ToSql, params};
use tracing::{debug, info, info_span, warn};

use super::schema::{DELETE_ORDER, MartSchema, SCHEMA_VERSION, TARGET_TABLES};
use super::{LoadMode, LoadReport, TableCount, YearCount};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::source::{SourceValue, to_source_value};
use crate::star::{CityDimRow, FlightFactRow, PlaneDimRow, StarSchema, TimeDimRow, UserDimRow};

/// Star-schema store on a single DuckDB connection
pub struct MartStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MartStore {
    /// Open or create a store file, creating its parent directory
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing store file without write access
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(path, config)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Open the configured store and apply its thread setting
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = Self::open(&config.path)?;
        store.set_threads(config.threads)?;
        Ok(store)
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the number of DuckDB worker threads
    pub fn set_threads(&self, threads: usize) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("SET threads TO {}", threads.max(1)))?;
        Ok(())
    }

    /// Drop and recreate the five star-schema tables and their indexes
    pub fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(MartSchema::create_tables())?;
        self.conn.execute(
            MartSchema::upsert_schema_version(),
            [SCHEMA_VERSION.to_string()],
        )?;
        info!(version = SCHEMA_VERSION, "Star schema created");
        Ok(())
    }

    /// Check whether all five target tables exist
    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        let count: i64 = self
            .conn
            .query_row(MartSchema::count_target_tables(), [], |row| row.get(0))?;
        Ok(count == TARGET_TABLES.len() as i64)
    }

    /// Get the schema version
    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let version: String =
            self.conn
                .query_row(MartSchema::select_schema_version(), [], |row| row.get(0))?;
        version
            .parse()
            .map_err(|_| StoreError::Database("Invalid schema version".to_string()))
    }

    /// Fail unless the schema exists at the current version
    pub fn ensure_ready(&self) -> Result<(), StoreError> {
        if !self.is_initialized()? {
            return Err(StoreError::NotInitialized);
        }
        let found = self.schema_version()?;
        if found != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        Ok(())
    }

    /// Replace the contents of all five target tables.
    ///
    /// Rows are deleted fact first, then inserted dimensions first. After the
    /// inserts, stored row counts are compared against the in-memory tables
    /// and the per-year flight distribution is computed; neither check can
    /// fail the load.
    pub fn load(&mut self, schema: &StarSchema, mode: LoadMode) -> Result<LoadReport, StoreError> {
        self.load_checked(schema, mode, MartSchema::select_year_distribution())
    }

    fn load_checked(
        &mut self,
        schema: &StarSchema,
        mode: LoadMode,
        distribution_sql: &str,
    ) -> Result<LoadReport, StoreError> {
        self.ensure_ready()?;
        let start = Instant::now();
        let span = info_span!("load", mode = %mode);
        let _enter = span.enter();

        match mode {
            LoadMode::Transactional => {
                let tx = self.conn.transaction()?;
                delete_all(&tx)?;
                for table in TARGET_TABLES {
                    insert_table(&tx, table, schema)?;
                }
                tx.commit()?;
            }
            LoadMode::Sequential => {
                delete_all(&self.conn)?;
                for table in TARGET_TABLES {
                    // Each table commits on its own; a later failure keeps it
                    let tx = self.conn.transaction()?;
                    insert_table(&tx, table, schema)?;
                    tx.commit()?;
                }
            }
        }

        let (tables, year_distribution) = self.sanity_checks(schema, distribution_sql);
        let report = LoadReport {
            mode,
            tables,
            year_distribution,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(duration_ms = report.duration_ms, "Load complete");
        Ok(report)
    }

    /// Post-load row counts and year distribution. Failures are logged and
    /// reported as `None`.
    fn sanity_checks(
        &self,
        schema: &StarSchema,
        distribution_sql: &str,
    ) -> (Option<Vec<TableCount>>, Option<Vec<YearCount>>) {
        let tables = match self.verify_counts(schema) {
            Ok(tables) => Some(tables),
            Err(e) => {
                warn!(error = %e, "Could not verify stored row counts");
                None
            }
        };
        let year_distribution = match self.query_year_distribution(distribution_sql) {
            Ok(years) => {
                for year in &years {
                    info!(year = year.year, flights = year.flights, "Flights per year");
                }
                Some(years)
            }
            Err(e) => {
                warn!(error = %e, "Could not compute year distribution");
                None
            }
        };
        (tables, year_distribution)
    }

    fn verify_counts(&self, schema: &StarSchema) -> Result<Vec<TableCount>, StoreError> {
        let stored = self.row_counts()?;
        let tables: Vec<TableCount> = schema
            .row_counts()
            .into_iter()
            .map(|(table, expected)| {
                let actual = stored
                    .iter()
                    .find(|(name, _)| name == table)
                    .map(|(_, count)| *count)
                    .unwrap_or(0);
                TableCount {
                    table: table.to_string(),
                    expected,
                    actual,
                }
            })
            .collect();

        for count in &tables {
            if count.matches() {
                info!(table = %count.table, rows = count.actual, "Table loaded");
            } else {
                warn!(
                    table = %count.table,
                    expected = count.expected,
                    actual = count.actual,
                    "Stored row count differs from built rows"
                );
            }
        }
        Ok(tables)
    }

    /// Current row count of each target table, in load order
    pub fn row_counts(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut counts = Vec::with_capacity(TARGET_TABLES.len());
        for table in TARGET_TABLES {
            let count: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            counts.push((table.to_string(), count.max(0) as usize));
        }
        Ok(counts)
    }

    /// Flights per year, for facts that have a time key
    pub fn year_distribution(&self) -> Result<Vec<YearCount>, StoreError> {
        self.query_year_distribution(MartSchema::select_year_distribution())
    }

    fn query_year_distribution(&self, sql: &str) -> Result<Vec<YearCount>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(YearCount {
                year: row.get(0)?,
                flights: row.get(1)?,
            })
        })?;

        let mut years = Vec::new();
        for row in rows {
            years.push(row?);
        }
        Ok(years)
    }

    /// Execute a query and return results as JSON
    pub fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        self.query_with(sql, &[])
    }

    /// Execute a parameterized query and return results as JSON objects
    pub fn query_with(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let mut rows = stmt
            .query(params)
            .map_err(|e| StoreError::Query(e.to_string()))?;

        // Column names are only known after execution
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut obj = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: duckdb::types::Value = row.get(i)?;
                obj.insert(name.clone(), json_value(value));
            }
            results.push(serde_json::Value::Object(obj));
        }

        Ok(results)
    }
}

/// Convert a DuckDB value to JSON
fn json_value(value: duckdb::types::Value) -> serde_json::Value {
    if let duckdb::types::Value::Boolean(b) = value {
        return serde_json::Value::Bool(b);
    }
    match to_source_value(value) {
        SourceValue::Null => serde_json::Value::Null,
        SourceValue::Int(n) => serde_json::Value::Number(n.into()),
        SourceValue::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        SourceValue::Text(s) | SourceValue::Other(s) => serde_json::Value::String(s),
        SourceValue::Timestamp(ts) => {
            serde_json::Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        SourceValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
    }
}

fn delete_all(conn: &Connection) -> Result<(), StoreError> {
    for table in DELETE_ORDER {
        let deleted = conn
            .execute(&format!("DELETE FROM {table}"), [])
            .map_err(|e| StoreError::load(table, e))?;
        debug!(table, deleted, "Cleared table");
    }
    Ok(())
}

fn insert_table(conn: &Connection, table: &str, schema: &StarSchema) -> Result<(), StoreError> {
    let inserted = match table {
        "dim_tiempo" => insert_time(conn, &schema.time),
        "dim_avion" => insert_planes(conn, &schema.planes),
        "dim_ciudad" => insert_cities(conn, &schema.cities),
        "dim_usuario" => insert_users(conn, &schema.users),
        "hecho_vuelos" => insert_facts(conn, &schema.facts),
        other => return Err(StoreError::load(other, "not a target table")),
    }
    .map_err(|e| StoreError::load(table, e))?;
    debug!(table, inserted, "Inserted rows");
    Ok(())
}

fn insert_time(conn: &Connection, rows: &[TimeDimRow]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare(MartSchema::insert_time())?;
    for row in rows {
        stmt.execute(params![
            row.id,
            row.timestamp(),
            row.year,
            row.month,
            row.half_year
        ])?;
    }
    Ok(rows.len())
}

fn insert_planes(conn: &Connection, rows: &[PlaneDimRow]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare(MartSchema::insert_plane())?;
    for row in rows {
        stmt.execute(params![
            row.id,
            row.name,
            row.airline_name,
            row.model_name
        ])?;
    }
    Ok(rows.len())
}

fn insert_cities(conn: &Connection, rows: &[CityDimRow]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare(MartSchema::insert_city())?;
    for row in rows {
        stmt.execute(params![row.id, row.name])?;
    }
    Ok(rows.len())
}

fn insert_users(conn: &Connection, rows: &[UserDimRow]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare(MartSchema::insert_user())?;
    for row in rows {
        stmt.execute(params![
            row.id,
            row.full_name,
            row.email,
            row.residence_city_name
        ])?;
    }
    Ok(rows.len())
}

fn insert_facts(conn: &Connection, rows: &[FlightFactRow]) -> duckdb::Result<usize> {
    let mut stmt = conn.prepare(MartSchema::insert_fact())?;
    for row in rows {
        stmt.execute(params![
            row.time_id,
            row.plane_id,
            row.user_id,
            row.origin_city_id,
            row.destination_city_id,
            row.cost,
            row.flight_count
        ])?;
    }
    Ok(rows.len())
}
