use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::ClauseStore;
use crate::error::{ClauseError, ClauseResult};
use crate::model::{Clause, ClauseAnalytics, ClauseDetail};

pub(super) const CLAUSE_COLUMNS: &str = "clause_id, bill_id, parent_clause_id, number, clause_type, title, content, display_order, metadata, created_at, updated_at";

/// Guards against cycles introduced outside this crate.
const MAX_PATH_DEPTH: i64 = 16;

pub(super) fn clause_from_row(row: &Row<'_>) -> rusqlite::Result<Clause> {
    let clause_type: String = row.get(4)?;
    let metadata: String = row.get(8)?;

    Ok(Clause {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        parent_id: row.get(2)?,
        number: row.get(3)?,
        clause_type: clause_type
            .parse()
            .map_err(|message: String| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, message.into()))?,
        title: row.get(5)?,
        content: row.get(6)?,
        display_order: row.get(7)?,
        metadata: serde_json::from_str(&metadata)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(error)))?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(super) fn fetch_clause(connection: &Connection, clause_id: i64) -> ClauseResult<Option<Clause>> {
    let clause = connection
        .query_row(
            &format!("SELECT {CLAUSE_COLUMNS} FROM clauses WHERE clause_id = ?1"),
            params![clause_id],
            clause_from_row,
        )
        .optional()?;
    Ok(clause)
}

/// Resolves a clause addressed through a bill. A clause that exists under a
/// different bill is an addressing error, not a plain miss.
pub(super) fn clause_in_bill(
    connection: &Connection,
    bill_id: &str,
    clause_id: i64,
) -> ClauseResult<Clause> {
    let Some(clause) = fetch_clause(connection, clause_id)? else {
        return Err(ClauseError::ClauseNotFound { clause_id });
    };

    if clause.bill_id != bill_id {
        return Err(ClauseError::ClauseNotFoundInBill {
            clause_id,
            bill_id: bill_id.to_string(),
        });
    }

    Ok(clause)
}

fn query_clauses(
    connection: &Connection,
    filter: &str,
    value: &dyn rusqlite::ToSql,
) -> ClauseResult<Vec<Clause>> {
    let mut statement = connection.prepare(&format!(
        "SELECT {CLAUSE_COLUMNS} FROM clauses WHERE {filter} ORDER BY display_order, clause_id"
    ))?;
    let clauses = statement
        .query_map(params![value], clause_from_row)?
        .collect::<rusqlite::Result<Vec<Clause>>>()?;
    Ok(clauses)
}

pub(super) fn clauses_for_bill(connection: &Connection, bill_id: &str) -> ClauseResult<Vec<Clause>> {
    query_clauses(connection, "bill_id = ?1", &bill_id)
}

pub(super) fn top_level_clauses(connection: &Connection, bill_id: &str) -> ClauseResult<Vec<Clause>> {
    query_clauses(
        connection,
        "bill_id = ?1 AND parent_clause_id IS NULL",
        &bill_id,
    )
}

pub(super) fn children_of(connection: &Connection, clause_id: i64) -> ClauseResult<Vec<Clause>> {
    query_clauses(connection, "parent_clause_id = ?1", &clause_id)
}

pub(super) fn analytics_for(
    connection: &Connection,
    clause_id: i64,
) -> ClauseResult<Option<ClauseAnalytics>> {
    let analytics = connection
        .query_row(
            "
            SELECT comment_count, support_count, oppose_count, neutral_count, updated_at
            FROM clause_analytics
            WHERE clause_id = ?1
            ",
            params![clause_id],
            |row| {
                Ok(ClauseAnalytics {
                    comment_count: row.get(0)?,
                    support_count: row.get(1)?,
                    oppose_count: row.get(2)?,
                    neutral_count: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(analytics)
}

/// Root-to-self chain of clauses, following `parent_clause_id` links.
pub(super) fn clause_path(connection: &Connection, clause_id: i64) -> ClauseResult<Vec<Clause>> {
    let mut statement = connection.prepare(&format!(
        "
        WITH RECURSIVE ancestors(clause_id, parent_clause_id, depth) AS (
          SELECT c.clause_id, c.parent_clause_id, 0
          FROM clauses c
          WHERE c.clause_id = ?1

          UNION ALL

          SELECT p.clause_id, p.parent_clause_id, a.depth + 1
          FROM clauses p
          JOIN ancestors a ON p.clause_id = a.parent_clause_id
          WHERE a.depth < ?2
        )
        SELECT {columns}
        FROM ancestors a
        JOIN clauses c ON c.clause_id = a.clause_id
        ORDER BY a.depth DESC
        ",
        columns = CLAUSE_COLUMNS
            .split(", ")
            .map(|column| format!("c.{column}"))
            .collect::<Vec<String>>()
            .join(", ")
    ))?;

    let path = statement
        .query_map(params![clause_id, MAX_PATH_DEPTH], clause_from_row)?
        .collect::<rusqlite::Result<Vec<Clause>>>()?;

    if path.is_empty() {
        return Err(ClauseError::ClauseNotFound { clause_id });
    }

    Ok(path)
}

pub(super) fn join_numbers(path: &[Clause]) -> String {
    path.iter()
        .map(|clause| clause.number.as_str())
        .collect::<Vec<&str>>()
        .join(".")
}

impl ClauseStore {
    pub fn clause(&self, clause_id: i64) -> ClauseResult<Option<Clause>> {
        fetch_clause(&self.connection, clause_id)
    }

    /// Every clause of the bill, flattened in display order.
    pub fn clauses_for_bill(&self, bill_id: &str) -> ClauseResult<Vec<Clause>> {
        clauses_for_bill(&self.connection, bill_id)
    }

    pub fn top_level_clauses(&self, bill_id: &str) -> ClauseResult<Vec<Clause>> {
        top_level_clauses(&self.connection, bill_id)
    }

    pub fn clause_detail(&self, bill_id: &str, clause_id: i64) -> ClauseResult<ClauseDetail> {
        let clause = clause_in_bill(&self.connection, bill_id, clause_id)?;
        let full_number = join_numbers(&clause_path(&self.connection, clause_id)?);
        let children = children_of(&self.connection, clause_id)?;
        let analytics = analytics_for(&self.connection, clause_id)?;

        Ok(ClauseDetail {
            clause,
            full_number,
            children,
            analytics,
        })
    }

    pub fn clause_path(&self, clause_id: i64) -> ClauseResult<Vec<Clause>> {
        clause_path(&self.connection, clause_id)
    }

    /// Dot-joined numbers from the root section down to the clause, e.g. `5.2.a`.
    pub fn full_number(&self, clause_id: i64) -> ClauseResult<String> {
        Ok(join_numbers(&clause_path(&self.connection, clause_id)?))
    }
}
