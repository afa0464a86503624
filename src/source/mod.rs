//! Source reader: full snapshots of the operational flight-booking tables
//!
//! A [`SourceReader`] only has to return each table as a [`RawTable`]; the
//! conversion into typed records is shared by every backend and is where
//! missing columns are detected.
//!
//! Backends:
//! - [`DuckDbSource`]: attaches a MySQL server (DuckDB `mysql` extension) or a
//!   DuckDB snapshot file to an in-memory session
//! - `PostgresSource` (feature `postgres-backend`): tokio-postgres

mod attach;
mod columns;
mod decode;
#[cfg(feature = "postgres-backend")]
mod postgres;
mod records;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;

pub use self::columns::ColumnIndex;
pub use self::attach::DuckDbSource;
pub(crate) use self::attach::to_source_value;
#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresSource;
pub use self::records::{
    Airline, Airport, City, Flight, Itinerary, Model, Plane, RawTimestamp, SourceSnapshot, User,
};

/// Source table names, in extraction order
pub const SOURCE_TABLES: [&str; 8] = [
    "aerolineas",
    "ciudades",
    "aeropuertos",
    "modelos",
    "aviones",
    "itinerarios",
    "usuarios",
    "vuelos",
];

/// One cell as delivered by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Other(String),
}

/// A full table read with `SELECT *`
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: ColumnIndex,
    pub rows: Vec<Vec<SourceValue>>,
}

impl RawTable {
    /// Create a table from column names and rows
    pub fn new<S: AsRef<str>>(table: &str, columns: &[S], rows: Vec<Vec<SourceValue>>) -> Self {
        Self {
            columns: ColumnIndex::new(table, columns),
            rows,
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.columns.table()
    }
}

/// Reads full snapshots of the operational store
#[async_trait(?Send)]
pub trait SourceReader {
    /// Short backend name for logs
    fn kind(&self) -> &'static str;

    /// Read every row of one table
    async fn read_table(&self, table: &str) -> Result<RawTable, SourceError>;

    /// Read all eight tables into typed records
    async fn read_snapshot(&self) -> Result<SourceSnapshot, SourceError> {
        let airlines = decode::airlines(&self.read_table("aerolineas").await?)?;
        let cities = decode::cities(&self.read_table("ciudades").await?)?;
        let airports = decode::airports(&self.read_table("aeropuertos").await?)?;
        let models = decode::models(&self.read_table("modelos").await?)?;
        let planes = decode::planes(&self.read_table("aviones").await?)?;
        let itineraries = decode::itineraries(&self.read_table("itinerarios").await?)?;
        let users = decode::users(&self.read_table("usuarios").await?)?;
        let flights = decode::flights(&self.read_table("vuelos").await?)?;

        let rows_without_key = airlines.without_key
            + cities.without_key
            + airports.without_key
            + models.without_key
            + planes.without_key
            + itineraries.without_key
            + users.without_key;
        if rows_without_key > 0 {
            warn!(rows = rows_without_key, "Source rows without key were skipped");
        }

        let snapshot = SourceSnapshot {
            airlines: airlines.rows,
            cities: cities.rows,
            airports: airports.rows,
            models: models.rows,
            planes: planes.rows,
            itineraries: itineraries.rows,
            users: users.rows,
            flights,
            rows_without_key,
        };

        for (table, count) in snapshot.table_counts() {
            debug!(table, rows = count, "Source table read");
        }
        info!(
            source = self.kind(),
            flights = snapshot.flights.len(),
            itineraries = snapshot.itineraries.len(),
            "Source snapshot extracted"
        );

        Ok(snapshot)
    }
}

/// Open the reader matching the configured source kind
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn SourceReader>, SourceError> {
    match config.kind {
        SourceKind::MySql | SourceKind::DuckDb => Ok(Box::new(DuckDbSource::connect(config)?)),
        #[cfg(feature = "postgres-backend")]
        SourceKind::Postgres => Ok(Box::new(PostgresSource::connect(config).await?)),
        #[cfg(not(feature = "postgres-backend"))]
        SourceKind::Postgres => Err(SourceError::unavailable(
            "postgres",
            "PostgreSQL support not enabled. Build with --features postgres-backend",
        )),
    }
}
