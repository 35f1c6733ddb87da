use std::path::PathBuf;

use billclause::store::OrphanPolicy;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "billclause",
    version,
    about = "Structure legislative bill text into a clause tree"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a bill or update its title and source document.
    Bill(BillArgs),
    /// Extract the bill's document and replace its clauses.
    Parse(ParseArgs),
    /// List a bill's clauses in display order.
    List(ListArgs),
    /// Show one clause with its children, analytics and path.
    Show(ShowArgs),
    Add(AddArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/billclause")]
    pub cache_root: PathBuf,

    /// Defaults to `<cache-root>/billclause.sqlite`.
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("billclause.sqlite"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct BillArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub pdf: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    /// Also detect `(a)` and `5.2` style markers inside each section.
    #[arg(long, default_value_t = false)]
    pub nested: bool,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    /// Include nested clauses, not only sections.
    #[arg(long, default_value_t = false)]
    pub all: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    #[arg(long)]
    pub clause_id: i64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    /// JSON object with `number`, `type`, `content` and optional `parent_id`,
    /// `title`, `metadata`.
    #[arg(long)]
    pub payload: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    #[arg(long)]
    pub clause_id: i64,

    /// JSON object with the fields to change; `null` clears `title` or `parent_id`.
    #[arg(long)]
    pub payload: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub bill_id: String,

    #[arg(long)]
    pub clause_id: i64,

    #[arg(long, value_enum, default_value_t = OrphanPolicy::Block)]
    pub orphan_policy: OrphanPolicy,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
