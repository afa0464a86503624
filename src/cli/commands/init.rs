//! `init` command

use flight_mart::{MartConfig, MartStore};

use crate::error::CliError;

/// Handle the `init` command: drop and recreate the star schema
pub fn handle_init(config: &MartConfig) -> Result<(), CliError> {
    let store = MartStore::from_config(&config.store)?;
    let db_path = config.store.path.display().to_string();

    if store.is_initialized()? {
        println!("Dropping existing star schema at: {}", db_path);
    }
    store.init()?;

    println!("Star schema created at: {}", db_path);
    println!("Schema version: {}", store.schema_version()?);
    Ok(())
}
