//! flight-mart: star-schema ETL and business questions

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flight_mart::{LoadMode, MartConfig};

use crate::commands::EtlArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "flight-mart", version, about = "Flight booking star-schema ETL")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Analytical store file (overrides config and DUCKDB_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drop and recreate the star schema
    Init,
    /// Extract, transform and load one full snapshot
    Etl {
        /// Recreate the star schema before loading
        #[arg(long, default_value_t = false)]
        init: bool,

        /// Replace tables one by one instead of in one transaction
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Answer one business question (1-4)
    Query {
        /// Question number
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        number: u8,

        #[command(flatten)]
        params: QuestionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Answer all four business questions
    Report {
        #[command(flatten)]
        params: QuestionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show row counts and flights per year
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Overrides for the business-question parameters
#[derive(clap::Args, Debug, Default)]
struct QuestionArgs {
    /// Destination city for question 1
    #[arg(long)]
    city: Option<String>,

    /// Half-year (1 or 2) for question 2
    #[arg(long)]
    half_year: Option<u8>,

    /// Year for question 2 (repeatable)
    #[arg(long = "year")]
    years: Vec<i32>,
}

impl QuestionArgs {
    fn apply(&self, config: &mut MartConfig) {
        if let Some(city) = &self.city {
            config.questions.destination_city = city.clone();
        }
        if let Some(half_year) = self.half_year {
            config.questions.half_year = half_year;
        }
        if !self.years.is_empty() {
            config.questions.years = self.years.clone();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<MartConfig, CliError> {
    let config = match &cli.config {
        Some(path) => MartConfig::from_file(path)?,
        None => MartConfig::new(),
    };
    let mut config = config.apply_env()?;
    if let Some(database) = &cli.database {
        config = config.with_store_path(database);
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Init => commands::handle_init(&config),
        Commands::Etl {
            init,
            sequential,
            format,
        } => {
            if sequential {
                config = config.with_load_mode(LoadMode::Sequential);
            }
            commands::handle_etl(config, &EtlArgs { init, format })
        }
        Commands::Query {
            number,
            params,
            format,
        } => {
            params.apply(&mut config);
            config.validate()?;
            commands::handle_query(&config, number, format)
        }
        Commands::Report { params, format } => {
            params.apply(&mut config);
            config.validate()?;
            commands::handle_report(&config, format)
        }
        Commands::Stats { format } => commands::handle_stats(&config, format),
    }
}

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
