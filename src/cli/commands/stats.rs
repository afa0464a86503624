//! `stats` command

use flight_mart::MartConfig;
use serde_json::json;

use super::open_existing;
use crate::error::CliError;
use crate::output::{OutputFormat, to_json};

/// Handle the `stats` command: row counts and flights per year
pub fn handle_stats(config: &MartConfig, format: OutputFormat) -> Result<(), CliError> {
    let store = open_existing(config)?;
    let counts = store.row_counts()?;
    let years = store.year_distribution()?;

    if format == OutputFormat::Json {
        let tables: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(table, rows)| (table.clone(), json!(rows)))
            .collect();
        let value = json!({
            "database": config.store.path.display().to_string(),
            "schema_version": store.schema_version()?,
            "tables": tables,
            "flights_per_year": years,
        });
        println!("{}", to_json(&value)?);
        return Ok(());
    }

    println!("Star Schema Statistics");
    println!("======================");
    println!("Database: {}", config.store.path.display());
    println!("Schema version: {}", store.schema_version()?);
    println!();

    println!("Rows by table:");
    for (table, rows) in &counts {
        println!("  {}: {}", table, rows);
    }
    println!();

    if years.is_empty() {
        println!("No flights with a time key.");
    } else {
        println!("Flights per year:");
        for year in &years {
            println!("  {}: {}", year.year, year.flights);
        }
    }

    Ok(())
}
