//! PostgreSQL source reader (async)

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error, info};

use super::{RawTable, SourceReader, SourceValue};
use crate::config::SourceConfig;
use crate::error::SourceError;

/// Reads source tables from PostgreSQL.
///
/// Uses the simple query protocol so every column arrives as text; numeric,
/// decimal and timestamp columns are parsed by the shared decoders.
pub struct PostgresSource {
    client: Client,
}

impl PostgresSource {
    /// Connect to a PostgreSQL database
    pub async fn connect(config: &SourceConfig) -> Result<Self, SourceError> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| SourceError::unavailable("postgres", e))?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        info!(source = %config.describe(), "Connected to operational source");
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl SourceReader for PostgresSource {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn read_table(&self, table: &str) -> Result<RawTable, SourceError> {
        let sql = format!("SELECT * FROM {}", table);
        debug!(sql = %sql, "Reading source table");

        let messages = self
            .client
            .simple_query(&sql)
            .await
            .map_err(|e| SourceError::query(table, e))?;

        let mut column_names: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    column_names = columns.iter().map(|c| c.name().to_string()).collect();
                }
                SimpleQueryMessage::Row(row) => {
                    if column_names.is_empty() {
                        column_names = row.columns().iter().map(|c| c.name().to_string()).collect();
                    }
                    let cells = (0..row.len())
                        .map(|i| match row.get(i) {
                            Some(text) => SourceValue::Text(text.to_string()),
                            None => SourceValue::Null,
                        })
                        .collect();
                    rows.push(cells);
                }
                _ => {}
            }
        }

        Ok(RawTable::new(table, &column_names, rows))
    }
}
