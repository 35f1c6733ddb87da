use rusqlite::{Connection, params};
use tracing::debug;

use super::StoreConfig;
use crate::error::{ClauseError, ClauseResult, FieldError};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.2.0";

pub(super) fn configure_connection(connection: &Connection, config: &StoreConfig) -> ClauseResult<()> {
    // In-memory databases answer "memory" here.
    let journal_mode: String =
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %journal_mode, "configured clause store");
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(config.busy_timeout)?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> ClauseResult<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bills (
          bill_id TEXT PRIMARY KEY,
          title TEXT,
          pdf_path TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS clauses (
          clause_id INTEGER PRIMARY KEY AUTOINCREMENT,
          bill_id TEXT NOT NULL,
          parent_clause_id INTEGER,
          number TEXT NOT NULL,
          clause_type TEXT NOT NULL
            CHECK (clause_type IN ('section', 'subsection', 'paragraph', 'subparagraph')),
          title TEXT,
          content TEXT NOT NULL DEFAULT '',
          display_order INTEGER NOT NULL,
          metadata TEXT NOT NULL DEFAULT '{}',
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          UNIQUE (bill_id, display_order),
          FOREIGN KEY(bill_id) REFERENCES bills(bill_id),
          FOREIGN KEY(parent_clause_id) REFERENCES clauses(clause_id)
        );

        CREATE TABLE IF NOT EXISTS clause_analytics (
          clause_id INTEGER PRIMARY KEY,
          comment_count INTEGER NOT NULL DEFAULT 0,
          support_count INTEGER NOT NULL DEFAULT 0,
          oppose_count INTEGER NOT NULL DEFAULT 0,
          neutral_count INTEGER NOT NULL DEFAULT 0,
          updated_at TEXT NOT NULL,
          FOREIGN KEY(clause_id) REFERENCES clauses(clause_id) ON DELETE CASCADE
        );
        ",
    )?;

    // Columns added after the first schema release.
    ensure_column_exists(connection, "bills", "pdf_sha256 TEXT")?;
    ensure_column_exists(connection, "bills", "source_hash TEXT")?;
    ensure_column_exists(connection, "bills", "parsed_at TEXT")?;

    connection.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_clauses_bill_order ON clauses(bill_id, display_order);
        CREATE INDEX IF NOT EXISTS idx_clauses_parent ON clauses(parent_clause_id);
        ",
    )?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![now_utc_string()],
    )?;

    Ok(())
}

fn ensure_column_exists(
    connection: &Connection,
    table_name: &str,
    column_definition: &str,
) -> ClauseResult<()> {
    let Some(column_name) = column_definition.split_whitespace().next() else {
        return Err(ClauseError::Validation(vec![FieldError::new(
            "column_definition",
            format!("invalid column definition: {column_definition}"),
        )]));
    };

    let mut statement = connection.prepare(&format!("PRAGMA table_info({table_name})"))?;
    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        let existing_name: String = row.get(1)?;
        if existing_name == column_name {
            return Ok(());
        }
    }

    connection.execute(
        &format!("ALTER TABLE {table_name} ADD COLUMN {column_definition}"),
        [],
    )?;

    Ok(())
}

pub(super) fn schema_version(connection: &Connection) -> ClauseResult<Option<String>> {
    let mut statement =
        connection.prepare("SELECT value FROM metadata WHERE key = 'db_schema_version'")?;
    let mut rows = statement.query([])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}
