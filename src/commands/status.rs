use anyhow::{Context, Result};
use tracing::{info, warn};

use super::open_store;
use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    let manifest_dir = args.store.cache_root.join("manifests");

    info!(cache_root = %args.store.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let store = open_store(&args.store)?;
    let summary = store
        .summary()
        .with_context(|| format!("failed to summarize {}", db_path.display()))?;
    info!(
        path = %db_path.display(),
        schema_version = %summary.schema_version.unwrap_or_default(),
        bills = summary.bills,
        parsed_bills = summary.parsed_bills,
        clauses = summary.clauses,
        "database status"
    );

    let latest_manifest = std::fs::read_dir(&manifest_dir)
        .ok()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("parse_run_") && name.ends_with(".json"))
        })
        .max();
    match latest_manifest {
        Some(path) => info!(path = %path.display(), "latest parse manifest"),
        None => warn!(path = %manifest_dir.display(), "no parse manifests found"),
    }

    Ok(())
}
