use clap::ValueEnum;
use rusqlite::{Connection, TransactionBehavior, params};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::ClauseStore;
use super::bills::require_bill;
use super::read::{children_of, clause_in_bill, clause_path, fetch_clause};
use crate::error::{ClauseError, ClauseResult, FieldError};
use crate::model::{Clause, ClauseAnalytics, ClausePatch, ClauseType, NewClause};
use crate::util::now_utc_string;

/// What happens to the children of a deleted clause.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OrphanPolicy {
    /// Refuse to delete a clause that still has children.
    #[default]
    Block,
    /// Delete the whole subtree.
    #[value(name = "cascade")]
    CascadeDelete,
    /// Move children up to the deleted clause's parent.
    #[value(name = "reparent")]
    ReparentToGrandparent,
}

impl OrphanPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::CascadeDelete => "cascade",
            Self::ReparentToGrandparent => "reparent",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub deleted: Vec<i64>,
    pub reparented: Vec<i64>,
}

#[derive(Debug)]
struct Placement {
    clause_type: Option<ClauseType>,
    parent_id: Option<i64>,
}

impl ClauseStore {
    /// Appends a clause after the bill's current highest display order. Other
    /// clauses are left untouched.
    pub fn add_clause(&mut self, bill_id: &str, payload: NewClause) -> ClauseResult<Clause> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_bill(&tx, bill_id)?;

        let mut errors = Vec::<FieldError>::new();
        let number = payload.number.trim().to_string();
        if number.is_empty() {
            errors.push(FieldError::new("number", "must not be empty"));
        }
        let clause_type = parse_clause_type(&payload.clause_type, &mut errors);
        if payload.content.is_none() {
            errors.push(FieldError::new("content", "is required"));
        }
        let metadata = payload.metadata.unwrap_or_else(|| json!({}));
        check_metadata(&metadata, &mut errors);
        check_placement(
            &tx,
            bill_id,
            None,
            &Placement {
                clause_type,
                parent_id: payload.parent_id,
            },
            &mut errors,
        )?;

        if !errors.is_empty() {
            return Err(ClauseError::Validation(errors));
        }
        let (Some(clause_type), Some(content)) = (clause_type, payload.content) else {
            return Err(ClauseError::Validation(errors));
        };

        let display_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(display_order), -1) + 1 FROM clauses WHERE bill_id = ?1",
            params![bill_id],
            |row| row.get(0),
        )?;
        let now = now_utc_string();
        let clause_id = tx.execute(
            "
            INSERT INTO clauses(
              bill_id, parent_clause_id, number, clause_type, title, content,
              display_order, metadata, created_at, updated_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ",
            params![
                bill_id,
                payload.parent_id,
                number,
                clause_type.as_str(),
                payload.title,
                content,
                display_order,
                serde_json::to_string(&metadata)?,
                now
            ],
        )
        .map(|_| tx.last_insert_rowid())?;

        let clause = fetch_clause(&tx, clause_id)?.ok_or(ClauseError::ClauseNotFound { clause_id })?;
        tx.commit()?;

        info!(bill_id, clause_id, display_order, "added clause");
        Ok(clause)
    }

    /// Applies only the fields present in `patch`; `bill_id` and
    /// `display_order` never change.
    pub fn update_clause(
        &mut self,
        bill_id: &str,
        clause_id: i64,
        patch: ClausePatch,
    ) -> ClauseResult<Clause> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = clause_in_bill(&tx, bill_id, clause_id)?;

        let mut errors = Vec::<FieldError>::new();
        let number = match patch.number {
            Some(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    errors.push(FieldError::new("number", "must not be empty"));
                }
                trimmed
            }
            None => existing.number.clone(),
        };
        let clause_type = match patch.clause_type.as_deref() {
            Some(value) => parse_clause_type(value, &mut errors),
            None => Some(existing.clause_type),
        };
        let parent_id = patch.parent_id.unwrap_or(existing.parent_id);
        let title = patch.title.unwrap_or(existing.title);
        let content = patch.content.unwrap_or(existing.content);
        let metadata = patch.metadata.unwrap_or(existing.metadata);
        check_metadata(&metadata, &mut errors);
        check_placement(
            &tx,
            bill_id,
            Some(clause_id),
            &Placement {
                clause_type,
                parent_id,
            },
            &mut errors,
        )?;

        if let Some(clause_type) = clause_type {
            for child in children_of(&tx, clause_id)? {
                if child.clause_type.level() <= clause_type.level() {
                    errors.push(FieldError::new(
                        "type",
                        format!(
                            "child clause {} ({}) would no longer nest under a {}",
                            child.id, child.clause_type, clause_type
                        ),
                    ));
                }
            }
        }

        let Some(clause_type) = clause_type.filter(|_| errors.is_empty()) else {
            return Err(ClauseError::Validation(errors));
        };

        tx.execute(
            "
            UPDATE clauses SET
              number = ?2,
              clause_type = ?3,
              parent_clause_id = ?4,
              title = ?5,
              content = ?6,
              metadata = ?7,
              updated_at = ?8
            WHERE clause_id = ?1
            ",
            params![
                clause_id,
                number,
                clause_type.as_str(),
                parent_id,
                title,
                content,
                serde_json::to_string(&metadata)?,
                now_utc_string()
            ],
        )?;

        let clause = fetch_clause(&tx, clause_id)?.ok_or(ClauseError::ClauseNotFound { clause_id })?;
        tx.commit()?;

        info!(bill_id, clause_id, "updated clause");
        Ok(clause)
    }

    pub fn delete_clause(
        &mut self,
        bill_id: &str,
        clause_id: i64,
        policy: OrphanPolicy,
    ) -> ClauseResult<DeleteOutcome> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = clause_in_bill(&tx, bill_id, clause_id)?;
        let children = children_of(&tx, clause_id)?;
        let blocked = || ClauseError::ClauseHasChildren {
            clause_id,
            child_count: children.len() as i64,
        };

        let outcome = match policy {
            _ if children.is_empty() => {
                tx.execute("DELETE FROM clauses WHERE clause_id = ?1", params![clause_id])?;
                DeleteOutcome {
                    deleted: vec![clause_id],
                    reparented: Vec::new(),
                }
            }
            OrphanPolicy::Block => return Err(blocked()),
            OrphanPolicy::ReparentToGrandparent => {
                let Some(grandparent_id) = existing.parent_id else {
                    return Err(blocked());
                };
                tx.execute(
                    "UPDATE clauses SET parent_clause_id = ?2, updated_at = ?3 WHERE parent_clause_id = ?1",
                    params![clause_id, grandparent_id, now_utc_string()],
                )?;
                tx.execute("DELETE FROM clauses WHERE clause_id = ?1", params![clause_id])?;
                DeleteOutcome {
                    deleted: vec![clause_id],
                    reparented: children.iter().map(|child| child.id).collect(),
                }
            }
            OrphanPolicy::CascadeDelete => {
                let deleted = subtree_ids(&tx, clause_id)?;
                tx.execute(
                    "
                    WITH RECURSIVE subtree(clause_id) AS (
                      SELECT ?1
                      UNION ALL
                      SELECT c.clause_id
                      FROM clauses c
                      JOIN subtree s ON c.parent_clause_id = s.clause_id
                    )
                    DELETE FROM clauses WHERE clause_id IN (SELECT clause_id FROM subtree)
                    ",
                    params![clause_id],
                )?;
                DeleteOutcome {
                    deleted,
                    reparented: Vec::new(),
                }
            }
        };

        tx.commit()?;

        info!(
            bill_id,
            clause_id,
            policy = policy.as_str(),
            deleted = outcome.deleted.len(),
            reparented = outcome.reparented.len(),
            "deleted clause"
        );
        Ok(outcome)
    }

    /// Attaches the engagement aggregate maintained by the surrounding
    /// application.
    pub fn upsert_analytics(
        &mut self,
        bill_id: &str,
        clause_id: i64,
        analytics: &ClauseAnalytics,
    ) -> ClauseResult<()> {
        clause_in_bill(&self.connection, bill_id, clause_id)?;
        self.connection.execute(
            "
            INSERT INTO clause_analytics(
              clause_id, comment_count, support_count, oppose_count, neutral_count, updated_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(clause_id) DO UPDATE SET
              comment_count=excluded.comment_count,
              support_count=excluded.support_count,
              oppose_count=excluded.oppose_count,
              neutral_count=excluded.neutral_count,
              updated_at=excluded.updated_at
            ",
            params![
                clause_id,
                analytics.comment_count,
                analytics.support_count,
                analytics.oppose_count,
                analytics.neutral_count,
                analytics.updated_at.clone().unwrap_or_else(now_utc_string)
            ],
        )?;
        Ok(())
    }
}

fn parse_clause_type(value: &str, errors: &mut Vec<FieldError>) -> Option<ClauseType> {
    match value.parse::<ClauseType>() {
        Ok(clause_type) => Some(clause_type),
        Err(message) => {
            errors.push(FieldError::new("type", message));
            None
        }
    }
}

fn check_metadata(metadata: &Value, errors: &mut Vec<FieldError>) {
    if !metadata.is_object() {
        errors.push(FieldError::new("metadata", "must be a JSON object"));
    }
}

/// Sections are roots; everything else hangs off a shallower clause of the
/// same bill, and never off itself or one of its own descendants.
fn check_placement(
    connection: &Connection,
    bill_id: &str,
    self_id: Option<i64>,
    placement: &Placement,
    errors: &mut Vec<FieldError>,
) -> ClauseResult<()> {
    let Some(parent_id) = placement.parent_id else {
        if let Some(clause_type) = placement.clause_type {
            if clause_type != ClauseType::Section {
                errors.push(FieldError::new(
                    "parent_id",
                    format!("{clause_type} clauses require a parent"),
                ));
            }
        }
        return Ok(());
    };

    if placement.clause_type == Some(ClauseType::Section) {
        errors.push(FieldError::new(
            "parent_id",
            "section clauses cannot have a parent",
        ));
    }

    let Some(parent) = fetch_clause(connection, parent_id)? else {
        errors.push(FieldError::new(
            "parent_id",
            format!("clause {parent_id} does not exist"),
        ));
        return Ok(());
    };

    if parent.bill_id != bill_id {
        errors.push(FieldError::new(
            "parent_id",
            format!("clause {parent_id} belongs to bill {}", parent.bill_id),
        ));
        return Ok(());
    }

    if let Some(clause_type) = placement.clause_type {
        if clause_type != ClauseType::Section && parent.clause_type.level() >= clause_type.level() {
            errors.push(FieldError::new(
                "parent_id",
                format!("a {clause_type} cannot nest under a {}", parent.clause_type),
            ));
        }
    }

    if let Some(self_id) = self_id {
        let ancestry = clause_path(connection, parent_id)?;
        if ancestry.iter().any(|ancestor| ancestor.id == self_id) {
            errors.push(FieldError::new(
                "parent_id",
                "a clause cannot be its own ancestor",
            ));
        }
    }

    Ok(())
}

fn subtree_ids(connection: &Connection, clause_id: i64) -> ClauseResult<Vec<i64>> {
    let mut statement = connection.prepare(
        "
        WITH RECURSIVE subtree(clause_id, depth) AS (
          SELECT ?1, 0
          UNION ALL
          SELECT c.clause_id, s.depth + 1
          FROM clauses c
          JOIN subtree s ON c.parent_clause_id = s.clause_id
        )
        SELECT clause_id FROM subtree ORDER BY depth, clause_id
        ",
    )?;
    let ids = statement
        .query_map(params![clause_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}
