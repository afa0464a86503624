//! `etl` command

use flight_mart::{EtlExecutor, MartConfig};

use crate::error::CliError;
use crate::output::{OutputFormat, to_json};

/// Arguments for the `etl` command
pub struct EtlArgs {
    /// Recreate the star schema first
    pub init: bool,
    /// Report format
    pub format: OutputFormat,
}

/// Handle the `etl` command
pub fn handle_etl(config: MartConfig, args: &EtlArgs) -> Result<(), CliError> {
    eprintln!("Source: {}", config.source.describe());
    eprintln!("Store: {}", config.store.path.display());
    eprintln!("Load mode: {}", config.load_mode);

    let executor = EtlExecutor::new(config)?.with_init(args.init);

    // The source drivers are async; everything else runs on this thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(executor.run())?;

    match args.format {
        OutputFormat::Json => println!("{}", to_json(&report)?),
        OutputFormat::Table => report.print_summary(),
    }
    Ok(())
}
