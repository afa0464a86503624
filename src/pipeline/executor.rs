//! Executor for one full ETL run

use std::time::Instant;

use serde::Serialize;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use super::PipelineStage;
use super::error::{PipelineError, PipelineResult};
use crate::config::MartConfig;
use crate::source::{SourceReader, open_source};
use crate::star::{StarSchema, TransformStats};
use crate::store::{LoadReport, MartStore};

/// Wall time of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub duration_ms: u64,
}

/// Runs extract, transform and load against a configured source and store
pub struct EtlExecutor {
    config: MartConfig,
    init_store: bool,
}

impl EtlExecutor {
    /// Create an executor; the configuration is validated here
    pub fn new(config: MartConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            init_store: false,
        })
    }

    /// Recreate the star schema before loading
    pub fn with_init(mut self, init_store: bool) -> Self {
        self.init_store = init_store;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &MartConfig {
        &self.config
    }

    /// Connect to the configured source and store, then run
    pub async fn run(&self) -> PipelineResult<RunReport> {
        let source = open_source(&self.config.source).await?;
        let mut store = MartStore::from_config(&self.config.store)?;
        self.run_with(source.as_ref(), &mut store).await
    }

    /// Run against an already opened source and store
    pub async fn run_with(
        &self,
        source: &dyn SourceReader,
        store: &mut MartStore,
    ) -> PipelineResult<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("etl_run", run_id = %run_id, mode = %self.config.load_mode);

        let result = self
            .run_stages(run_id.clone(), source, store)
            .instrument(span)
            .await;
        if let Err(e) = &result {
            error!(run_id = %run_id, stage = e.stage_name(), error = %e, "ETL run failed");
        }
        result
    }

    async fn run_stages(
        &self,
        run_id: String,
        source: &dyn SourceReader,
        store: &mut MartStore,
    ) -> PipelineResult<RunReport> {
        let start = Instant::now();
        let mut stages = Vec::new();

        info!(
            source = source.kind(),
            store = %self.config.store.path.display(),
            "Starting ETL run"
        );

        if self.init_store {
            let stage_start = Instant::now();
            store.init()?;
            stages.push(finish(PipelineStage::Init, stage_start));
        }

        let stage_start = Instant::now();
        let snapshot = source.read_snapshot().await?;
        let source_counts = snapshot
            .table_counts()
            .into_iter()
            .map(|(table, rows)| (table.to_string(), rows))
            .collect();
        stages.push(finish(PipelineStage::Extract, stage_start));

        let stage_start = Instant::now();
        let (schema, transform) = StarSchema::build(&snapshot);
        let fingerprint = schema.fingerprint();
        stages.push(finish(PipelineStage::Transform, stage_start));

        let stage_start = Instant::now();
        let load = store.load(&schema, self.config.load_mode)?;
        stages.push(finish(PipelineStage::Load, stage_start));

        let report = RunReport {
            run_id,
            source_kind: source.kind().to_string(),
            stages,
            source_counts,
            rows_without_key: snapshot.rows_without_key,
            transform,
            load,
            fingerprint,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            duration = %report.duration_formatted(),
            fingerprint = %report.fingerprint,
            "ETL run complete"
        );
        Ok(report)
    }
}

fn finish(stage: PipelineStage, started: Instant) -> StageTiming {
    let duration_ms = started.elapsed().as_millis() as u64;
    info!(stage = stage.name(), duration_ms, "Stage completed");
    StageTiming { stage, duration_ms }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run ID
    pub run_id: String,
    /// Backend the snapshot came from
    pub source_kind: String,
    /// Completed stages with timings
    pub stages: Vec<StageTiming>,
    /// Rows read per source table
    pub source_counts: Vec<(String, usize)>,
    /// Catalog rows skipped for a NULL key
    pub rows_without_key: usize,
    /// Tolerated data-quality problems
    pub transform: TransformStats,
    /// Stored counts and year distribution
    pub load: LoadReport,
    /// SHA-256 of the built star schema
    pub fingerprint: String,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// True when counts match and no key, lookup or date problem was seen
    pub fn is_clean(&self) -> bool {
        self.rows_without_key == 0 && self.transform.is_clean() && self.load.counts_match()
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", self.duration_ms)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("ETL run {} ({})", self.run_id, self.load.mode);
        eprintln!("Source: {}", self.source_kind);
        eprintln!("Duration: {}", self.duration_formatted());
        for timing in &self.stages {
            eprintln!("  - {}: {}ms", timing.stage, timing.duration_ms);
        }

        match &self.load.tables {
            Some(tables) => {
                eprintln!("Tables:");
                for table in tables {
                    let status = if table.matches() { "ok" } else { "MISMATCH" };
                    eprintln!(
                        "  - {}: {} rows ({})",
                        table.table, table.actual, status
                    );
                }
            }
            None => eprintln!("Tables: row counts unavailable"),
        }

        match &self.load.year_distribution {
            Some(years) => {
                eprintln!("Flights per year:");
                for year in years {
                    eprintln!("  - {}: {}", year.year, year.flights);
                }
            }
            None => eprintln!("Flights per year: unavailable"),
        }

        if self.rows_without_key > 0 || !self.transform.is_clean() {
            let t = &self.transform;
            eprintln!("Data quality:");
            eprintln!("  - source rows without key: {}", self.rows_without_key);
            eprintln!(
                "  - departures: {} unparseable, {} missing",
                t.unparseable_departures, t.missing_departures
            );
            eprintln!(
                "  - planes without airline/model: {}/{}",
                t.planes_without_airline, t.planes_without_model
            );
            eprintln!("  - users without city: {}", t.users_without_city);
            eprintln!(
                "  - flights without itinerary/time/origin/destination: {}/{}/{}/{}",
                t.flights_without_itinerary,
                t.flights_without_time,
                t.flights_without_origin_city,
                t.flights_without_destination_city
            );
        }
        eprintln!("Fingerprint: {}", self.fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::error::{SourceError, StoreError};
    use crate::source::DuckDbSource;
    use crate::store::LoadMode;
    use duckdb::Connection;

    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE aerolineas (id_aerolinea INTEGER, nombre VARCHAR);
CREATE TABLE ciudades (id_ciudad INTEGER, nombre VARCHAR);
CREATE TABLE aeropuertos (id_aeropuerto INTEGER, id_ciudad INTEGER);
CREATE TABLE modelos (id_modelo INTEGER, nombre VARCHAR);
CREATE TABLE aviones (id_avion INTEGER, nombre VARCHAR, id_aerolinea INTEGER, id_modelo INTEGER);
CREATE TABLE itinerarios (
    id_itinerario INTEGER,
    id_aeropuerto_origen INTEGER,
    id_aeropuerto_destino INTEGER,
    fecha_salida TIMESTAMP
);
CREATE TABLE usuarios (cedula BIGINT, nombre VARCHAR, apellido VARCHAR, email VARCHAR, id_ciudad INTEGER);
CREATE TABLE vuelos (id_itinerario INTEGER, id_avion INTEGER, id_usuario BIGINT, costo DECIMAL(12, 2));

INSERT INTO aerolineas VALUES (1, 'Alitalia');
INSERT INTO ciudades VALUES (1, 'Bogotá'), (2, 'Roma');
INSERT INTO aeropuertos VALUES (10, 1), (20, 2);
INSERT INTO modelos VALUES (1, 'A320');
INSERT INTO aviones VALUES (1, 'I-ABCD', 1, 1);
INSERT INTO itinerarios VALUES
    (100, 10, 20, TIMESTAMP '2019-06-30 23:10:00'),
    (101, 20, 10, TIMESTAMP '2020-07-01 06:00:00');
INSERT INTO usuarios VALUES (1001, 'Ana', 'Gómez', 'ana@example.com', 1);
INSERT INTO vuelos VALUES (100, 1, 1001, 450.00), (101, 1, 1001, 380.50), (100, 1, 1001, 450.00);
"#,
        )
        .unwrap();
        conn
    }

    fn seeded_source() -> DuckDbSource {
        DuckDbSource::from_connection(seeded_connection())
    }

    #[tokio::test]
    async fn test_run_with_init() {
        let executor = EtlExecutor::new(MartConfig::new()).unwrap().with_init(true);
        let mut store = MartStore::memory().unwrap();

        let report = executor
            .run_with(&seeded_source(), &mut store)
            .await
            .unwrap();

        assert!(report.is_clean(), "{:?}", report.transform);
        assert_eq!(report.load.stored("hecho_vuelos"), Some(3));
        assert_eq!(report.load.stored("dim_tiempo"), Some(2));
        assert_eq!(report.source_counts.len(), 8);
        assert_eq!(report.stages.len(), 4);
        assert_eq!(report.stages[0].stage, PipelineStage::Init);
        assert_eq!(report.fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn test_rows_without_key_are_skipped() {
        let conn = seeded_connection();
        conn.execute_batch(
            "INSERT INTO itinerarios VALUES (NULL, 10, 20, TIMESTAMP '2021-01-01 10:00:00');
             INSERT INTO ciudades VALUES (NULL, 'Lima');",
        )
        .unwrap();
        let source = DuckDbSource::from_connection(conn);
        let executor = EtlExecutor::new(MartConfig::new()).unwrap().with_init(true);
        let mut store = MartStore::memory().unwrap();

        let report = executor.run_with(&source, &mut store).await.unwrap();

        assert_eq!(report.rows_without_key, 2);
        assert!(!report.is_clean());
        assert_eq!(report.load.stored("dim_ciudad"), Some(2));
        assert_eq!(report.load.stored("dim_tiempo"), Some(2));
        assert_eq!(report.load.stored("hecho_vuelos"), Some(3));
    }

    #[tokio::test]
    async fn test_run_without_init_fails() {
        let executor = EtlExecutor::new(MartConfig::new()).unwrap();
        let mut store = MartStore::memory().unwrap();

        let result = executor.run_with(&seeded_source(), &mut store).await;
        assert!(matches!(
            result,
            Err(PipelineError::Store(StoreError::NotInitialized))
        ));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let executor = EtlExecutor::new(MartConfig::new().with_load_mode(LoadMode::Sequential))
            .unwrap()
            .with_init(true);
        let mut store = MartStore::memory().unwrap();
        let source = seeded_source();

        let first = executor.run_with(&source, &mut store).await.unwrap();
        let second = executor.run_with(&source, &mut store).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.load.tables, second.load.tables);
        assert_eq!(first.load.year_distribution, second.load.year_distribution);
    }

    #[tokio::test]
    async fn test_missing_source_table_fails_extract() {
        let executor = EtlExecutor::new(MartConfig::new()).unwrap().with_init(true);
        let mut store = MartStore::memory().unwrap();
        let empty = DuckDbSource::from_connection(Connection::open_in_memory().unwrap());

        let result = executor.run_with(&empty, &mut store).await;
        match result {
            Err(e @ PipelineError::Source(SourceError::Query { .. })) => {
                assert_eq!(e.stage_name(), "extract")
            }
            other => panic!("expected extract failure, got {:?}", other.map(|r| r.run_id)),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MartConfig {
            source: SourceConfig {
                kind: crate::config::SourceKind::DuckDb,
                path: None,
                ..SourceConfig::default()
            },
            ..MartConfig::default()
        };
        assert!(matches!(
            EtlExecutor::new(config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_duration_formatted() {
        let report = RunReport {
            run_id: "r".to_string(),
            source_kind: "duckdb".to_string(),
            stages: Vec::new(),
            source_counts: Vec::new(),
            rows_without_key: 0,
            transform: TransformStats::default(),
            load: LoadReport {
                mode: LoadMode::Transactional,
                tables: None,
                year_distribution: None,
                duration_ms: 0,
            },
            fingerprint: String::new(),
            duration_ms: 125_000,
        };
        assert_eq!(report.duration_formatted(), "2m 5s");

        let quick = RunReport {
            duration_ms: 42,
            ..report
        };
        assert_eq!(quick.duration_formatted(), "42ms");
    }
}
