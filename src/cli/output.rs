//! Output formatting for query results

use clap::ValueEnum;

use crate::error::CliError;

/// How result rows are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated table with a header
    #[default]
    Table,
    /// Pretty-printed JSON array
    Json,
}

/// Render rows as a tab-separated table
pub fn format_table(results: &[serde_json::Value]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    // Get column names from first row
    let columns: Vec<&str> = results[0]
        .as_object()
        .map(|obj| obj.keys().map(|k| k.as_str()).collect())
        .unwrap_or_default();

    let mut output = String::new();
    output.push_str(&columns.join("\t"));
    output.push('\n');
    output.push_str(
        &columns
            .iter()
            .map(|_| "---")
            .collect::<Vec<_>>()
            .join("\t"),
    );
    output.push('\n');

    for row in results {
        let values: Vec<String> = columns
            .iter()
            .map(|col| row.get(*col).map(cell_text).unwrap_or_default())
            .collect();
        output.push_str(&values.join("\t"));
        output.push('\n');
    }

    output.push_str(&format!("\n{} row(s)\n", results.len()));
    output
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

/// Serialize any value as pretty JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))
}

/// Print rows in the requested format
pub fn print_rows(results: &[serde_json::Value], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", to_json(&results)?),
        OutputFormat::Table => print!("{}", format_table(results)),
    }
    Ok(())
}
