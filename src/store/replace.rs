use rusqlite::{TransactionBehavior, params};
use tracing::info;

use super::ClauseStore;
use super::bills::require_bill;
use super::read::clauses_for_bill;
use crate::error::{ClauseError, ClauseResult, FieldError};
use crate::model::{Clause, ClauseForest};
use crate::util::now_utc_string;

impl ClauseStore {
    /// Atomically swaps the bill's clause set for `forest`.
    ///
    /// Runs inside an immediate transaction, so the SQLite write lock is held
    /// from `BEGIN` and concurrent replaces of the same bill serialize. Any
    /// failure rolls everything back and the previous clause set stays visible.
    /// Display orders are re-derived from forest order.
    pub fn replace_clauses(&mut self, bill_id: &str, forest: &ClauseForest) -> ClauseResult<Vec<Clause>> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_bill(&tx, bill_id)?;

        let now = now_utc_string();
        let removed = tx.execute("DELETE FROM clauses WHERE bill_id = ?1", params![bill_id])?;

        {
            let mut statement = tx.prepare(
                "
                INSERT INTO clauses(
                  bill_id, parent_clause_id, number, clause_type, title, content,
                  display_order, metadata, created_at, updated_at
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                ",
            )?;

            let mut persisted_ids = Vec::<i64>::with_capacity(forest.len());
            for (position, draft) in forest.drafts.iter().enumerate() {
                let parent_id = match draft.parent_index {
                    None => None,
                    Some(parent) => Some(
                        persisted_ids
                            .get(parent)
                            .copied()
                            .filter(|_| parent < position)
                            .ok_or_else(|| {
                                ClauseError::Validation(vec![FieldError::new(
                                    "parent_index",
                                    format!(
                                        "draft {position} references parent {parent}, which does not precede it"
                                    ),
                                )])
                            })?,
                    ),
                };
                let metadata = serde_json::to_string(&draft.metadata)?;

                let clause_id = statement.insert(params![
                    bill_id,
                    parent_id,
                    &draft.number,
                    draft.clause_type.as_str(),
                    &draft.title,
                    &draft.content,
                    position as i64,
                    metadata,
                    now
                ])?;
                persisted_ids.push(clause_id);
            }
        }

        tx.execute(
            "UPDATE bills SET source_hash = ?2, parsed_at = ?3, updated_at = ?3 WHERE bill_id = ?1",
            params![bill_id, &forest.source_hash, now],
        )?;

        let clauses = clauses_for_bill(&tx, bill_id)?;
        tx.commit()?;

        info!(
            bill_id,
            removed,
            inserted = clauses.len(),
            "replaced clause set"
        );

        Ok(clauses)
    }
}
