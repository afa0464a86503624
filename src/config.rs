//! Run configuration: source connection, analytical store and load options
//!
//! Configuration is an explicit value handed to the source reader and the
//! store. It can be read from a TOML file and overlaid with the environment
//! variables of the existing deployment (`MYSQL_*`, `DUCKDB_PATH`).
//!
//! ```toml
//! [source]
//! kind = "mysql"
//! host = "127.0.0.1"
//! port = 3306
//! user = "etl"
//! password = "secret"
//! database = "iata"
//!
//! [store]
//! path = "data/iata_star.duckdb"
//! threads = 4
//!
//! load_mode = "transactional"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::queries::QuestionParams;
use crate::store::LoadMode;

/// Default location of the analytical store
pub const DEFAULT_STORE_PATH: &str = "data/iata_star.duckdb";

/// Kind of operational source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// MySQL server, attached through DuckDB's mysql extension
    #[default]
    MySql,
    /// PostgreSQL server, read with tokio-postgres
    Postgres,
    /// DuckDB database file holding the operational tables
    DuckDb,
}

impl SourceKind {
    /// Name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::MySql => "mysql",
            SourceKind::Postgres => "postgres",
            SourceKind::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(SourceKind::MySql),
            "postgres" | "postgresql" => Ok(SourceKind::Postgres),
            "duckdb" => Ok(SourceKind::DuckDb),
            _ => Err(format!(
                "Invalid source kind: {}. Expected: mysql, postgres, duckdb",
                s
            )),
        }
    }
}

/// Connection settings for the operational source
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Which kind of source to read
    pub kind: SourceKind,
    /// Server host (mysql, postgres)
    pub host: String,
    /// Server port (mysql, postgres)
    pub port: u16,
    /// User name (mysql, postgres)
    pub user: String,
    /// Password (mysql, postgres)
    pub password: String,
    /// Database / schema name (mysql, postgres)
    pub database: String,
    /// Database file (duckdb)
    pub path: Option<PathBuf>,
    /// Run `INSTALL mysql` before attaching (needs network on first use)
    pub install_extension: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::MySql,
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "iata".to_string(),
            path: None,
            install_extension: true,
        }
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("path", &self.path)
            .field("install_extension", &self.install_extension)
            .finish()
    }
}

impl SourceConfig {
    /// A DuckDB file source
    pub fn duckdb(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::DuckDb,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// libpq-style `key=value` connection string.
    ///
    /// DuckDB's mysql extension and tokio-postgres both accept this form; they
    /// only differ in the database key.
    pub fn connection_string(&self) -> String {
        let db_key = match self.kind {
            SourceKind::Postgres => "dbname",
            _ => "database",
        };
        let mut parts = vec![
            connection_pair("host", &self.host),
            connection_pair("port", &self.port.to_string()),
            connection_pair("user", &self.user),
        ];
        if !self.password.is_empty() {
            parts.push(connection_pair("password", &self.password));
        }
        parts.push(connection_pair(db_key, &self.database));
        parts.join(" ")
    }

    /// Short description without credentials
    pub fn describe(&self) -> String {
        match self.kind {
            SourceKind::DuckDb => format!(
                "duckdb:{}",
                self.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            kind => format!(
                "{}://{}@{}:{}/{}",
                kind, self.user, self.host, self.port, self.database
            ),
        }
    }
}

/// One `key=value` pair; values that are empty or contain whitespace,
/// quotes or backslashes are single-quoted with `\\` and `\'` escapes.
fn connection_pair(key: &str, value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return format!("{key}={value}");
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{key}='{escaped}'")
}

/// Settings for the analytical store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the DuckDB file
    pub path: PathBuf,
    /// DuckDB worker threads
    pub threads: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            threads: 4,
        }
    }
}

/// Complete configuration for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MartConfig {
    /// Operational source
    pub source: SourceConfig,
    /// Analytical store
    pub store: StoreConfig,
    /// How the five tables are replaced
    pub load_mode: LoadMode,
    /// Parameters of the business questions
    pub questions: QuestionParams,
}

impl MartConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Overlay values from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("FLIGHT_MART_SOURCE") {
            self.source.kind = kind.parse().map_err(ConfigError::Invalid)?;
        }

        let kind = self.source.kind;
        let prefix = match kind {
            SourceKind::Postgres => "PG",
            _ => "MYSQL_",
        };
        let key = |name: &str| format!("{prefix}{name}");

        if let Some(host) = lookup(&key("HOST")) {
            self.source.host = host;
        }
        if let Some(port) = lookup(&key("PORT")) {
            self.source.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{} is not a port: {port}", key("PORT"))))?;
        }
        if let Some(user) = lookup(&key("USER")) {
            self.source.user = user;
        }
        if let Some(password) = lookup(&key("PASSWORD")) {
            self.source.password = password;
        }
        let db_var = match kind {
            SourceKind::Postgres => "PGDATABASE".to_string(),
            _ => key("DB"),
        };
        if let Some(database) = lookup(&db_var) {
            self.source.database = database;
        }
        if let Some(path) = lookup("SOURCE_DUCKDB_PATH") {
            self.source.path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("DUCKDB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(threads) = lookup("DUCKDB_THREADS") {
            self.store.threads = threads.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("DUCKDB_THREADS is not a number: {threads}"))
            })?;
        }

        Ok(self)
    }

    /// Set the source
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Set the store path
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = path.into();
        self
    }

    /// Set the DuckDB worker thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.store.threads = threads;
        self
    }

    /// Set the load mode
    pub fn with_load_mode(mut self, mode: LoadMode) -> Self {
        self.load_mode = mode;
        self
    }

    /// Set the business question parameters
    pub fn with_questions(mut self, questions: QuestionParams) -> Self {
        self.questions = questions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.kind == SourceKind::DuckDb && self.source.path.is_none() {
            return Err(ConfigError::Invalid(
                "source.path is required for a duckdb source".to_string(),
            ));
        }
        if self.store.threads == 0 {
            return Err(ConfigError::Invalid(
                "store.threads must be at least 1".to_string(),
            ));
        }
        if self.questions.years.is_empty() {
            return Err(ConfigError::Invalid(
                "questions.years must list at least one year".to_string(),
            ));
        }
        if !(1..=2).contains(&self.questions.half_year) {
            return Err(ConfigError::Invalid(format!(
                "questions.half_year must be 1 or 2, got {}",
                self.questions.half_year
            )));
        }
        Ok(())
    }
}
