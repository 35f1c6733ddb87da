use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("source document not found: {0}")]
    FileNotFound(String),
    #[error("source document is encrypted: {0}")]
    EncryptedPdf(String),
    #[error("text extraction tool failed for {path}: {reason}")]
    ToolFailed { path: String, reason: String },
    #[error("no extractable text in {0}")]
    NoExtractableText(String),
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single offending field in a manual-edit payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ClauseError {
    #[error("bill {bill_id} has no source PDF attached")]
    NoPdfAttached { bill_id: String },
    #[error("bill {bill_id} not found")]
    BillNotFound { bill_id: String },
    #[error("clause {clause_id} not found")]
    ClauseNotFound { clause_id: i64 },
    #[error("clause {clause_id} does not belong to bill {bill_id}")]
    ClauseNotFoundInBill { clause_id: i64, bill_id: String },
    #[error("clause {clause_id} still has {child_count} child clause(s)")]
    ClauseHasChildren { clause_id: i64, child_count: i64 },
    #[error("invalid clause payload: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("clause storage failed")]
    Persistence(#[from] rusqlite::Error),
    #[error("clause metadata is not valid JSON")]
    Metadata(#[from] serde_json::Error),
    #[error("failed to compile clause pattern")]
    Pattern(#[from] regex::Error),
}

impl ClauseError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Extraction(_) | Self::Persistence(_))
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join("; ")
}

pub type ClauseResult<T> = Result<T, ClauseError>;
