//! End-to-end parse of one bill: extract, normalize, build, replace.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ClauseError, ClauseResult};
use crate::extract::TextExtractor;
use crate::model::Clause;
use crate::store::ClauseStore;
use crate::structure::{BuildOptions, ClauseBuilder, normalize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub nested: bool,
}

impl From<ParseOptions> for BuildOptions {
    fn from(options: ParseOptions) -> Self {
        BuildOptions {
            nested: options.nested,
        }
    }
}

/// Re-parses the bill's attached document and swaps in the new clause set.
///
/// Nothing is written unless extraction succeeds; a failed replace leaves the
/// previous clauses in place.
pub fn parse_bill_clauses(
    store: &mut ClauseStore,
    extractor: &dyn TextExtractor,
    bill_id: &str,
    options: ParseOptions,
) -> ClauseResult<Vec<Clause>> {
    let bill = store
        .bill(bill_id)?
        .ok_or_else(|| ClauseError::BillNotFound {
            bill_id: bill_id.to_string(),
        })?;
    let Some(pdf_path) = bill.pdf_path.as_deref() else {
        return Err(ClauseError::NoPdfAttached {
            bill_id: bill_id.to_string(),
        });
    };

    info!(bill_id, path = %pdf_path, nested = options.nested, "parsing bill");
    let raw = extractor
        .extract_text(Path::new(pdf_path))
        .inspect_err(|error| warn!(bill_id, path = %pdf_path, error = %error, "extraction failed"))?;

    let normalized = normalize(&raw);
    let forest = ClauseBuilder::new(options.into())?.build(&normalized);
    if forest.drafts.iter().any(|draft| draft.metadata["autoGenerated"] == true) {
        warn!(bill_id, "no section headers found, stored full text as one clause");
    }

    let clauses = store.replace_clauses(bill_id, &forest)?;
    info!(bill_id, clauses = clauses.len(), "parsed bill");
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;
    use crate::error::ExtractionError;
    use crate::model::ClauseType;

    /// Returns canned text, or reports an encrypted document when `text` is
    /// `None`.
    struct StubExtractor {
        text: Option<String>,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl StubExtractor {
        fn returning(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn encrypted() -> Self {
            Self {
                text: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextExtractor for StubExtractor {
        fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
            self.calls.borrow_mut().push(path.to_path_buf());
            self.text
                .clone()
                .ok_or_else(|| ExtractionError::EncryptedPdf(path.display().to_string()))
        }
    }

    fn store_with_document(bill_id: &str) -> ClauseStore {
        let mut store = ClauseStore::open_in_memory().expect("in-memory store should open");
        store
            .register_bill(bill_id, Some("Finance Bill"), Some(Path::new("bills/finance.pdf")))
            .expect("bill should register");
        store
    }

    #[test]
    fn parses_two_sections_from_extracted_text() {
        let mut store = store_with_document("bill-1");
        let extractor = StubExtractor::returning(
            "Section 1. Definitions\r\nIn this Act...\r\n\r\n\r\nSection 2. Commencement\r\nThis Act comes into force...",
        );

        let clauses = parse_bill_clauses(&mut store, &extractor, "bill-1", ParseOptions::default())
            .expect("parse should succeed");

        assert_eq!(extractor.calls.borrow().as_slice(), [PathBuf::from("bills/finance.pdf")]);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title.as_deref(), Some("Definitions"));
        assert_eq!(clauses[0].content, "In this Act...");
        assert_eq!(clauses[1].number, "2");
        assert!(
            store
                .bill("bill-1")
                .expect("bill should load")
                .and_then(|bill| bill.parsed_at)
                .is_some()
        );
    }

    #[test]
    fn reparse_replaces_previous_clause_set() {
        let mut store = store_with_document("bill-1");
        let first = StubExtractor::returning("Section 1. A\na\nSection 2. B\nb\nSection 3. C\nc");
        parse_bill_clauses(&mut store, &first, "bill-1", ParseOptions::default())
            .expect("first parse should succeed");

        let second = StubExtractor::returning("Section 1. A\nrevised");
        let clauses = parse_bill_clauses(&mut store, &second, "bill-1", ParseOptions::default())
            .expect("second parse should succeed");

        assert_eq!(clauses.len(), 1);
        assert_eq!(
            store
                .clauses_for_bill("bill-1")
                .expect("clauses should load")
                .len(),
            1
        );
    }

    #[test]
    fn nested_option_builds_subsections() {
        let mut store = store_with_document("bill-1");
        let extractor = StubExtractor::returning("Section 5. Offences\n(1) A person\n(a) who sells");

        let clauses = parse_bill_clauses(
            &mut store,
            &extractor,
            "bill-1",
            ParseOptions { nested: true },
        )
        .expect("parse should succeed");

        let types = clauses
            .iter()
            .map(|clause| clause.clause_type)
            .collect::<Vec<ClauseType>>();
        assert_eq!(
            types,
            vec![ClauseType::Section, ClauseType::Subsection, ClauseType::Paragraph]
        );
        assert_eq!(
            store
                .full_number(clauses[2].id)
                .expect("number should compute"),
            "5.1.a"
        );
    }

    #[test]
    fn header_less_text_is_stored_as_fallback_clause() {
        let mut store = store_with_document("bill-1");
        let extractor = StubExtractor::returning("An Act to amend things.\nNo headers here.");

        let clauses = parse_bill_clauses(&mut store, &extractor, "bill-1", ParseOptions::default())
            .expect("parse should succeed");

        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].title.as_deref(), Some("Full Bill Text"));
        assert_eq!(clauses[0].metadata["autoGenerated"], true);
    }

    #[test]
    fn bill_without_document_is_rejected() {
        let mut store = ClauseStore::open_in_memory().expect("in-memory store should open");
        store
            .register_bill("bill-1", Some("Draft"), None)
            .expect("bill should register");
        let extractor = StubExtractor::returning("Section 1. A");

        let error = parse_bill_clauses(&mut store, &extractor, "bill-1", ParseOptions::default())
            .expect_err("parse should fail");

        assert!(matches!(error, ClauseError::NoPdfAttached { .. }));
        assert!(extractor.calls.borrow().is_empty());
    }

    #[test]
    fn unknown_bill_is_rejected() {
        let mut store = ClauseStore::open_in_memory().expect("in-memory store should open");
        let extractor = StubExtractor::returning("Section 1. A");

        let error = parse_bill_clauses(&mut store, &extractor, "missing", ParseOptions::default())
            .expect_err("parse should fail");

        assert!(matches!(error, ClauseError::BillNotFound { .. }));
    }

    #[test]
    fn extraction_failure_keeps_existing_clauses() {
        let mut store = store_with_document("bill-1");
        let ok = StubExtractor::returning("Section 1. A\na\nSection 2. B\nb");
        let before = parse_bill_clauses(&mut store, &ok, "bill-1", ParseOptions::default())
            .expect("first parse should succeed");

        let failing = StubExtractor::encrypted();
        let error = parse_bill_clauses(&mut store, &failing, "bill-1", ParseOptions::default())
            .expect_err("parse should fail");

        assert!(matches!(
            error,
            ClauseError::Extraction(ExtractionError::EncryptedPdf(_))
        ));
        assert_eq!(
            store.clauses_for_bill("bill-1").expect("clauses should load"),
            before
        );
    }
}
