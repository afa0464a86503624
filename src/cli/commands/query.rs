//! `query` and `report` commands

use flight_mart::{BusinessQuestion, MartConfig, answer_all};

use super::open_existing;
use crate::error::CliError;
use crate::output::{OutputFormat, format_table, print_rows, to_json};

/// Handle the `query` command: answer one business question
pub fn handle_query(config: &MartConfig, number: u8, format: OutputFormat) -> Result<(), CliError> {
    let question = BusinessQuestion::from_number(number).ok_or_else(|| {
        CliError::InvalidArgument(format!("question must be 1 to 4, got {number}"))
    })?;

    let store = open_existing(config)?;
    let rows = question.run(&store, &config.questions)?;

    if format == OutputFormat::Table {
        println!("=== {} ===", question.title(&config.questions));
    }
    print_rows(&rows, format)
}

/// Handle the `report` command: answer all four questions
pub fn handle_report(config: &MartConfig, format: OutputFormat) -> Result<(), CliError> {
    let store = open_existing(config)?;
    let answers = answer_all(&store, &config.questions);

    match format {
        OutputFormat::Json => println!("{}", to_json(&answers)?),
        OutputFormat::Table => {
            for answer in &answers {
                println!();
                println!("=== Question {}: {} ===", answer.number, answer.title);
                match &answer.error {
                    Some(error) => println!("Error: {}", error),
                    None => print!("{}", format_table(&answer.rows)),
                }
            }
        }
    }
    Ok(())
}
