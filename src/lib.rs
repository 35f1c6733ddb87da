//! Reconstructs the clause hierarchy of legislative bills from extracted text
//! and keeps it in a SQLite-backed clause tree.

pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod structure;
pub mod util;
