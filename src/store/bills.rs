use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use super::ClauseStore;
use super::schema::schema_version;
use crate::error::{ClauseError, ClauseResult};
use crate::model::Bill;
use crate::util::{now_utc_string, sha256_file};

const BILL_COLUMNS: &str =
    "bill_id, title, pdf_path, pdf_sha256, source_hash, parsed_at, created_at, updated_at";

pub(super) fn fetch_bill(connection: &Connection, bill_id: &str) -> ClauseResult<Option<Bill>> {
    let bill = connection
        .query_row(
            &format!("SELECT {BILL_COLUMNS} FROM bills WHERE bill_id = ?1"),
            params![bill_id],
            |row| {
                Ok(Bill {
                    bill_id: row.get(0)?,
                    title: row.get(1)?,
                    pdf_path: row.get(2)?,
                    pdf_sha256: row.get(3)?,
                    source_hash: row.get(4)?,
                    parsed_at: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(bill)
}

pub(super) fn require_bill(connection: &Connection, bill_id: &str) -> ClauseResult<Bill> {
    fetch_bill(connection, bill_id)?.ok_or_else(|| ClauseError::BillNotFound {
        bill_id: bill_id.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub schema_version: Option<String>,
    pub bills: i64,
    pub parsed_bills: i64,
    pub clauses: i64,
}

impl ClauseStore {
    /// Creates the bill or updates it in place. A `None` title or path keeps
    /// the stored value.
    pub fn register_bill(
        &mut self,
        bill_id: &str,
        title: Option<&str>,
        pdf_path: Option<&Path>,
    ) -> ClauseResult<Bill> {
        let pdf_sha256 = pdf_path.and_then(|path| match sha256_file(path) {
            Ok(digest) => Some(digest),
            Err(error) => {
                warn!(bill_id, path = %path.display(), error = %error, "could not hash source document");
                None
            }
        });
        let pdf_path = pdf_path.map(|path| path.display().to_string());
        let now = now_utc_string();

        self.connection.execute(
            "
            INSERT INTO bills(bill_id, title, pdf_path, pdf_sha256, created_at, updated_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(bill_id) DO UPDATE SET
              title=COALESCE(excluded.title, bills.title),
              pdf_path=COALESCE(excluded.pdf_path, bills.pdf_path),
              pdf_sha256=CASE
                WHEN excluded.pdf_path IS NULL THEN bills.pdf_sha256
                ELSE excluded.pdf_sha256
              END,
              updated_at=excluded.updated_at
            ",
            params![bill_id, title, pdf_path, pdf_sha256, now],
        )?;

        let bill = require_bill(&self.connection, bill_id)?;
        info!(
            bill_id,
            pdf_path = %bill.pdf_path.as_deref().unwrap_or_default(),
            "registered bill"
        );
        Ok(bill)
    }

    pub fn bill(&self, bill_id: &str) -> ClauseResult<Option<Bill>> {
        fetch_bill(&self.connection, bill_id)
    }

    pub fn summary(&self) -> ClauseResult<StoreSummary> {
        let count = |sql: &str| -> ClauseResult<i64> {
            Ok(self.connection.query_row(sql, [], |row| row.get(0))?)
        };

        Ok(StoreSummary {
            schema_version: schema_version(&self.connection)?,
            bills: count("SELECT COUNT(*) FROM bills")?,
            parsed_bills: count("SELECT COUNT(*) FROM bills WHERE parsed_at IS NOT NULL")?,
            clauses: count("SELECT COUNT(*) FROM clauses")?,
        })
    }
}
