//! CLI command handlers

pub mod etl;
pub mod init;
pub mod query;
pub mod stats;

pub use etl::{EtlArgs, handle_etl};
pub use init::handle_init;
pub use query::{handle_query, handle_report};
pub use stats::handle_stats;

use flight_mart::{MartConfig, MartStore, StoreError};

/// Open the configured store read-only; a missing file means no schema yet
pub(crate) fn open_existing(config: &MartConfig) -> Result<MartStore, StoreError> {
    if !config.store.path.exists() {
        return Err(StoreError::NotInitialized);
    }
    let store = MartStore::open_read_only(&config.store.path)?;
    store.set_threads(config.store.threads)?;
    store.ensure_ready()?;
    Ok(store)
}
