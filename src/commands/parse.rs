use std::io::{self, Write};

use anyhow::{Context, Result};
use billclause::extract::{FileTextExtractor, PdftotextExtractor};
use billclause::model::{Clause, ClauseType, ParseRunManifest};
use billclause::pipeline::{ParseOptions, parse_bill_clauses};
use billclause::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};
use chrono::Utc;
use tracing::{info, warn};

use super::open_store;
use crate::cli::ParseArgs;

pub fn run(args: ParseArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("parse-{}", utc_compact_string(started_ts));

    let manifest_dir = args.store.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("parse_run_{}.json", utc_compact_string(started_ts)))
    });
    let db_path = args.store.resolved_db_path();

    let mut store = open_store(&args.store)?;
    let extractor = FileTextExtractor {
        pdf: PdftotextExtractor {
            max_pages: args.max_pages,
        },
    };
    let options = ParseOptions {
        nested: args.nested,
    };

    info!(bill_id = %args.bill_id, run_id = %run_id, nested = args.nested, "starting parse");
    let outcome = parse_bill_clauses(&mut store, &extractor, &args.bill_id, options);

    let clauses = outcome.as_deref().unwrap_or_default();
    let source_hash = match &outcome {
        Ok(_) => store
            .bill(&args.bill_id)
            .with_context(|| format!("failed to reload bill {}", args.bill_id))?
            .and_then(|bill| bill.source_hash),
        Err(_) => None,
    };
    let manifest = ParseRunManifest {
        manifest_version: 1,
        run_id,
        bill_id: args.bill_id.clone(),
        status: if outcome.is_ok() { "completed" } else { "failed" }.to_string(),
        started_at,
        completed_at: now_utc_string(),
        nested: args.nested,
        source_hash,
        clause_count: clauses.len(),
        section_count: clauses
            .iter()
            .filter(|clause| clause.clause_type == ClauseType::Section)
            .count(),
        fallback_used: clauses
            .iter()
            .any(|clause| clause.metadata["autoGenerated"] == true),
        db_path: db_path.display().to_string(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    let clauses = match outcome {
        Ok(clauses) => clauses,
        Err(error) => {
            warn!(
                bill_id = %args.bill_id,
                retryable = error.is_retryable(),
                manifest = %manifest_path.display(),
                "parse failed"
            );
            return Err(error).with_context(|| format!("failed to parse bill {}", args.bill_id));
        }
    };

    write_summary(&manifest, &clauses)?;
    info!(
        bill_id = %args.bill_id,
        clauses = manifest.clause_count,
        manifest = %manifest_path.display(),
        "parse completed"
    );
    Ok(())
}

fn write_summary(manifest: &ParseRunManifest, clauses: &[Clause]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "Bill {}: {} clauses ({} sections) nested={} fallback_used={}",
        manifest.bill_id,
        manifest.clause_count,
        manifest.section_count,
        manifest.nested,
        manifest.fallback_used,
    )?;
    for clause in clauses.iter().filter(|clause| clause.parent_id.is_none()) {
        writeln!(
            output,
            "  [{}] {} {}",
            clause.display_order,
            clause.number,
            clause.title.as_deref().unwrap_or_default(),
        )?;
    }
    output.flush()?;
    Ok(())
}
