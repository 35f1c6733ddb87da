pub mod bill;
pub mod clause;
pub mod parse;
pub mod status;

use std::io::{self, Write};

use anyhow::{Context, Result};
use billclause::store::{ClauseStore, StoreConfig};
use billclause::util::ensure_directory;
use serde::Serialize;

use crate::cli::StoreArgs;

fn open_store(args: &StoreArgs) -> Result<ClauseStore> {
    let db_path = args.resolved_db_path();
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    ClauseStore::open(&db_path, &StoreConfig::default())
        .with_context(|| format!("failed to open clause store {}", db_path.display()))
}

fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
