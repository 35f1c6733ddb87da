use serde_json::json;

use super::*;
use crate::model::{ClauseForest, ClauseType};

fn build_flat(text: &str) -> ClauseForest {
    let builder = ClauseBuilder::new(BuildOptions::default()).expect("builder should compile");
    builder.build(&normalize(text))
}

fn build_nested(text: &str) -> ClauseForest {
    let builder =
        ClauseBuilder::new(BuildOptions { nested: true }).expect("builder should compile");
    builder.build(&normalize(text))
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(ToString::to_string).collect()
}

#[test]
fn normalize_unifies_line_endings_and_collapses_whitespace() {
    let raw = "  Section 1.\t\tDefinitions\r\nIn   this Act\rmore\n\n\n\n\nSection 2  ";
    assert_eq!(
        normalize(raw),
        "Section 1. Definitions\nIn this Act\nmore\n\nSection 2"
    );
}

#[test]
fn normalize_is_total_and_idempotent() {
    let samples = [
        "",
        "   \t \n\n ",
        "\r\r\n\r\n\n\nx",
        "a \n \n \n b",
        "1. First\nBody A\n\n\n\n2. Second\nBody B",
        "Section 1 -  Short title\u{a0}\n\n\n\t(a) item\r\n",
    ];

    for sample in samples {
        let once = normalize(sample);
        assert_eq!(normalize(&once), once, "normalize not idempotent for {sample:?}");
    }
    assert_eq!(normalize(""), "");
}

#[test]
fn matcher_applies_rules_in_priority_order() {
    let matcher = ClauseMatcher::full().expect("matcher should compile");
    assert_eq!(
        matcher.kinds(),
        vec![
            RuleKind::SectionHeader,
            RuleKind::ParenSubsection,
            RuleKind::DottedSubsection
        ]
    );

    assert_eq!(
        matcher.classify("Section 12 - Commencement"),
        LineClass::SectionHeader(LineMatch {
            number: "12".to_string(),
            heading: "Commencement".to_string(),
        })
    );
    assert_eq!(
        matcher.classify("section 3"),
        LineClass::SectionHeader(LineMatch {
            number: "3".to_string(),
            heading: String::new(),
        })
    );
    assert_eq!(
        matcher.classify("(b) the Minister may"),
        LineClass::ParenSubsection(LineMatch {
            number: "b".to_string(),
            heading: "the Minister may".to_string(),
        })
    );
    // The section rule claims dotted numbers first when both are active.
    assert!(matches!(
        matcher.classify("5.2 Offences"),
        LineClass::SectionHeader(_)
    ));
    assert_eq!(matcher.classify("In this Act..."), LineClass::NoMatch);
    assert_eq!(matcher.classify("   "), LineClass::NoMatch);
}

#[test]
fn matcher_treats_unparseable_section_tokens_as_content() {
    let matcher = ClauseMatcher::top_level(false).expect("matcher should compile");
    assert_eq!(
        matcher.classify("99999999999999999999 pieces of text"),
        LineClass::NoMatch
    );
}

#[test]
fn subsection_matcher_recognizes_dotted_numbers() {
    let matcher = ClauseMatcher::subsections().expect("matcher should compile");
    assert_eq!(
        matcher.classify("5.2.1 Penalties apply"),
        LineClass::DottedSubsection(LineMatch {
            number: "5.2.1".to_string(),
            heading: "Penalties apply".to_string(),
        })
    );
    assert_eq!(matcher.classify("(a)"), LineClass::NoMatch);
}

#[test]
fn builds_two_sections_with_titles_and_content() {
    let forest = build_flat(
        "Section 1. Definitions\nIn this Act...\nSection 2. Commencement\nThis Act comes into force...",
    );

    assert_eq!(forest.len(), 2);
    let first = &forest.drafts[0];
    assert_eq!(first.number, "1");
    assert_eq!(first.title.as_deref(), Some("Definitions"));
    assert_eq!(first.content, "In this Act...");
    assert_eq!(first.display_order, 0);
    assert_eq!(first.metadata, json!({ "lineStart": 1 }));

    let second = &forest.drafts[1];
    assert_eq!(second.number, "2");
    assert_eq!(second.title.as_deref(), Some("Commencement"));
    assert_eq!(second.content, "This Act comes into force...");
    assert_eq!(second.display_order, 1);
    assert_eq!(second.metadata, json!({ "lineStart": 3 }));

    assert!(
        forest
            .drafts
            .iter()
            .all(|draft| draft.clause_type == ClauseType::Section && draft.parent_index.is_none())
    );
}

#[test]
fn empty_input_yields_fallback_clause() {
    let forest = build_flat("");
    assert_eq!(forest.len(), 1);

    let fallback = &forest.drafts[0];
    assert_eq!(fallback.number, FALLBACK_NUMBER);
    assert_eq!(fallback.clause_type, ClauseType::Section);
    assert_eq!(fallback.title.as_deref(), Some(FALLBACK_TITLE));
    assert_eq!(fallback.content, "");
    assert_eq!(fallback.metadata["autoGenerated"], json!(true));
    assert_eq!(fallback.display_order, 0);
}

#[test]
fn header_less_text_yields_single_fallback_with_whole_text() {
    let forest = build_flat("Just some plain text with no structure.");
    assert_eq!(forest.len(), 1);
    assert_eq!(
        forest.drafts[0].content,
        "Just some plain text with no structure."
    );

    let whitespace = build_flat(" \t\r\n\n ");
    assert_eq!(whitespace.len(), 1);
    assert_eq!(whitespace.drafts[0].content, "");
}

#[test]
fn blank_line_runs_do_not_leak_into_content() {
    let forest = build_flat("1. First\nBody A\n\n\n\n2. Second\nBody B");
    assert_eq!(forest.len(), 2);
    assert_eq!(forest.drafts[0].content, "Body A");
    assert_eq!(forest.drafts[1].content, "Body B");
    assert!(forest.drafts.iter().all(|draft| !draft.content.contains("\n\n\n")));
}

#[test]
fn display_orders_are_dense_and_follow_document_order() {
    let forest = build_flat("Section 4. D\nd\nSection 1. A\na\nSection 9. Z\nz\nSection 2. B");
    let orders = forest
        .drafts
        .iter()
        .map(|draft| draft.display_order)
        .collect::<Vec<i64>>();
    assert_eq!(orders, vec![0, 1, 2, 3]);

    let numbers = forest
        .drafts
        .iter()
        .map(|draft| draft.number.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(numbers, vec!["4", "1", "9", "2"]);
}

#[test]
fn content_and_headers_partition_the_normalized_input() {
    let raw = "Preliminary recital line\nSection 1. Short title\nThis Act may be cited.\n\nIt binds the Crown.\nSection 2 - Interpretation\n(a) word means thing\nnested looking line 2.1\nSection 3";
    let normalized = normalize(raw);
    let forest = build_flat(raw);

    let headers = ["Section 1. Short title", "Section 2 - Interpretation", "Section 3"];
    let mut reconstructed = Vec::<String>::new();
    for (draft, header) in forest.drafts.iter().skip(1).zip(headers) {
        reconstructed.extend(words(header));
        reconstructed.extend(words(&draft.content));
    }

    let preamble = &forest.drafts[0];
    assert_eq!(preamble.number, PREAMBLE_NUMBER);
    assert_eq!(preamble.metadata["preamble"], json!(true));

    let mut expected = words(&preamble.content);
    expected.extend(reconstructed);
    assert_eq!(expected, words(&normalized));
}

#[test]
fn default_build_stays_flat_even_with_subsection_markers() {
    let forest = build_flat("Section 1. Powers\n(1) The Minister may\n(a) appoint officers");
    assert_eq!(forest.len(), 1);
    assert_eq!(
        forest.drafts[0].content,
        "(1) The Minister may\n(a) appoint officers"
    );
}

#[test]
fn nested_build_links_subsections_paragraphs_and_subparagraphs() {
    let forest = build_nested(
        "Section 5. Offences\nA person commits an offence if\n(1) the person\n(a) sells goods\n(i) knowingly\n(ii) recklessly\n(b) supplies goods\ncontinuation of b\n(2) A second subsection\nSection 6. Penalties\nFine applies",
    );

    let summary = forest
        .drafts
        .iter()
        .map(|draft| {
            (
                forest.full_number(draft.index).unwrap_or_default(),
                draft.clause_type,
                draft.content.clone(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        summary,
        vec![
            (
                "5".to_string(),
                ClauseType::Section,
                "A person commits an offence if".to_string()
            ),
            ("5.1".to_string(), ClauseType::Subsection, "the person".to_string()),
            ("5.1.a".to_string(), ClauseType::Paragraph, "sells goods".to_string()),
            ("5.1.a.i".to_string(), ClauseType::Subparagraph, "knowingly".to_string()),
            ("5.1.a.ii".to_string(), ClauseType::Subparagraph, "recklessly".to_string()),
            (
                "5.1.b".to_string(),
                ClauseType::Paragraph,
                "supplies goods\ncontinuation of b".to_string()
            ),
            ("5.2".to_string(), ClauseType::Subsection, "A second subsection".to_string()),
            ("6".to_string(), ClauseType::Section, "Fine applies".to_string()),
        ]
    );

    for draft in &forest.drafts {
        if let Some(parent) = draft.parent_index {
            assert!(parent < draft.index, "parent must precede child");
        }
        assert_eq!(draft.display_order, draft.index as i64);
    }
    assert_eq!(forest.drafts[2].metadata["marker"], json!("(a)"));
    assert_eq!(forest.drafts[2].metadata["lineStart"], json!(4));
}

#[test]
fn nested_build_keeps_dotted_subsections_inside_their_section() {
    let forest = build_nested("Section 5. General\n5.1 Scope of the Act\n5.1.1 Exclusions listed\nmore text\n5.2 Application");

    assert_eq!(forest.roots().count(), 1);
    assert_eq!(forest.children_of(0).count(), 2);
    assert_eq!(forest.full_number(2).as_deref(), Some("5.1.1"));
    assert_eq!(forest.drafts[2].clause_type, ClauseType::Paragraph);
    assert_eq!(forest.drafts[2].content, "Exclusions listed\nmore text");
    assert_eq!(forest.drafts[3].number, "2");
    assert_eq!(forest.drafts[3].metadata["marker"], json!("5.2"));
}

#[test]
fn nested_build_reads_i_after_h_as_paragraph() {
    let forest = build_nested("Section 1. List\n(a) Start\n(h) eighth\n(i) ninth\n(ii) sub of ninth");

    let types = forest
        .drafts
        .iter()
        .map(|draft| draft.clause_type)
        .collect::<Vec<ClauseType>>();
    assert_eq!(
        types,
        vec![
            ClauseType::Section,
            ClauseType::Paragraph,
            ClauseType::Paragraph,
            ClauseType::Paragraph,
            ClauseType::Subparagraph,
        ]
    );
    assert_eq!(forest.drafts[4].parent_index, Some(3));
}

#[test]
fn forest_records_source_hash_of_normalized_text() {
    let forest = build_flat("Section 1. A\r\nbody");
    assert_eq!(
        forest.source_hash,
        crate::util::sha256_text("Section 1. A\nbody")
    );
}
