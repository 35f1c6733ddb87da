//! SQLite-backed clause tree: transactional replace of a bill's clause set,
//! read accessors and manual edits.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::ClauseResult;

mod bills;
mod edit;
mod read;
mod replace;
mod schema;

pub use bills::StoreSummary;
pub use edit::{DeleteOutcome, OrphanPolicy};
pub use schema::DB_SCHEMA_VERSION;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub struct ClauseStore {
    connection: Connection,
}

impl ClauseStore {
    pub fn open(path: &Path, config: &StoreConfig) -> ClauseResult<Self> {
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened clause store");
        Self::from_connection(connection, config)
    }

    pub fn open_in_memory() -> ClauseResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, &StoreConfig::default())
    }

    pub fn from_connection(connection: Connection, config: &StoreConfig) -> ClauseResult<Self> {
        schema::configure_connection(&connection, config)?;
        schema::ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}
