use anyhow::{Context, Result};
use tracing::info;

use super::open_store;
use crate::cli::BillArgs;

pub fn run(args: BillArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let bill = store
        .register_bill(&args.bill_id, args.title.as_deref(), args.pdf.as_deref())
        .with_context(|| format!("failed to register bill {}", args.bill_id))?;

    info!(
        bill_id = %bill.bill_id,
        title = %bill.title.as_deref().unwrap_or_default(),
        pdf_sha256 = %bill.pdf_sha256.as_deref().unwrap_or_default(),
        "bill ready"
    );
    Ok(())
}
