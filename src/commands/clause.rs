use std::io::{self, Write};

use anyhow::{Context, Result};
use billclause::model::{Clause, ClauseDetail, ClausePatch, NewClause};
use serde::Serialize;
use tracing::info;

use super::{open_store, write_json_stdout};
use crate::cli::{AddArgs, DeleteArgs, ListArgs, ShowArgs, UpdateArgs};

#[derive(Debug, Serialize)]
struct ListedClause {
    full_number: String,
    #[serde(flatten)]
    clause: Clause,
}

pub fn list(args: ListArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let clauses = if args.all {
        store.clauses_for_bill(&args.bill_id)
    } else {
        store.top_level_clauses(&args.bill_id)
    }
    .with_context(|| format!("failed to list clauses of bill {}", args.bill_id))?;

    let listed = clauses
        .into_iter()
        .map(|clause| {
            Ok(ListedClause {
                full_number: store.full_number(clause.id)?,
                clause,
            })
        })
        .collect::<Result<Vec<ListedClause>>>()?;

    if args.json {
        return write_json_stdout(&listed);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Bill {}: {} clauses", args.bill_id, listed.len())?;
    for entry in &listed {
        writeln!(
            output,
            "  #{} [{}] {:<10} {:<12} {}",
            entry.clause.id,
            entry.clause.display_order,
            entry.full_number,
            entry.clause.clause_type,
            entry.clause.title.as_deref().unwrap_or_default(),
        )?;
    }
    output.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ShownClause {
    #[serde(flatten)]
    detail: ClauseDetail,
    path: Vec<String>,
}

pub fn show(args: ShowArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    let detail = store
        .clause_detail(&args.bill_id, args.clause_id)
        .with_context(|| format!("failed to load clause {}", args.clause_id))?;
    let path = store
        .clause_path(args.clause_id)?
        .into_iter()
        .map(|clause| clause.number)
        .collect::<Vec<String>>();
    let shown = ShownClause { detail, path };

    if args.json {
        return write_json_stdout(&shown);
    }

    let clause = &shown.detail.clause;
    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "{} {} (#{}, {})",
        shown.detail.full_number,
        clause.title.as_deref().unwrap_or_default(),
        clause.id,
        clause.clause_type,
    )?;
    writeln!(output, "Path: {}", shown.path.join(" > "))?;
    if !clause.content.is_empty() {
        writeln!(output)?;
        writeln!(output, "{}", clause.content)?;
    }
    if !shown.detail.children.is_empty() {
        writeln!(output)?;
        writeln!(output, "Children:")?;
        for child in &shown.detail.children {
            writeln!(output, "  #{} {} ({})", child.id, child.number, child.clause_type)?;
        }
    }
    if let Some(analytics) = &shown.detail.analytics {
        writeln!(
            output,
            "Analytics: comments={} support={} oppose={} neutral={}",
            analytics.comment_count,
            analytics.support_count,
            analytics.oppose_count,
            analytics.neutral_count,
        )?;
    }
    output.flush()?;
    Ok(())
}

pub fn add(args: AddArgs) -> Result<()> {
    let payload: NewClause =
        serde_json::from_str(&args.payload).context("failed to parse clause payload")?;
    let mut store = open_store(&args.store)?;
    let clause = store
        .add_clause(&args.bill_id, payload)
        .with_context(|| format!("failed to add clause to bill {}", args.bill_id))?;

    info!(bill_id = %args.bill_id, clause_id = clause.id, "clause added");
    write_json_stdout(&clause)
}

pub fn update(args: UpdateArgs) -> Result<()> {
    let patch: ClausePatch =
        serde_json::from_str(&args.payload).context("failed to parse clause patch")?;
    let mut store = open_store(&args.store)?;
    let clause = store
        .update_clause(&args.bill_id, args.clause_id, patch)
        .with_context(|| format!("failed to update clause {}", args.clause_id))?;

    info!(bill_id = %args.bill_id, clause_id = clause.id, "clause updated");
    write_json_stdout(&clause)
}

pub fn delete(args: DeleteArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let outcome = store
        .delete_clause(&args.bill_id, args.clause_id, args.orphan_policy)
        .with_context(|| {
            format!(
                "failed to delete clause {} (orphan policy {})",
                args.clause_id,
                args.orphan_policy.as_str()
            )
        })?;

    write_json_stdout(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use billclause::model::ClauseType;
    use serde_json::json;

    #[test]
    fn listed_clause_flattens_stored_fields() {
        let listed = ListedClause {
            full_number: "5.2".to_string(),
            clause: Clause {
                id: 7,
                bill_id: "bill-1".to_string(),
                number: "2".to_string(),
                clause_type: ClauseType::Subsection,
                parent_id: Some(3),
                title: None,
                content: "text".to_string(),
                metadata: json!({ "marker": "(2)" }),
                display_order: 4,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                updated_at: "2026-01-01T00:00:00Z".to_string(),
            },
        };

        let value = serde_json::to_value(&listed).expect("listing should serialize");
        assert_eq!(value["full_number"], "5.2");
        assert_eq!(value["type"], "subsection");
        assert_eq!(value["parent_id"], 3);
        assert_eq!(value["metadata"]["marker"], "(2)");
    }
}
