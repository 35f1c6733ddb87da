//! Text-to-clause-tree engine: normalization, line classification and the
//! single-pass builder. Everything here is pure; persistence lives in `store`.

mod builder;
mod matcher;
mod normalize;
#[cfg(test)]
mod tests;

pub use builder::{
    BuildOptions, ClauseBuilder, FALLBACK_NUMBER, FALLBACK_TITLE, PREAMBLE_NUMBER, PREAMBLE_TITLE,
};
pub use matcher::{ClauseMatcher, LineClass, LineMatch, RuleKind};
pub use normalize::normalize;
