use serde_json::json;
use tracing::debug;

use crate::error::ClauseResult;
use crate::model::{ClauseDraft, ClauseForest, ClauseType};
use crate::structure::matcher::{ClauseMatcher, LineClass, LineMatch};
use crate::structure::normalize::numbered_lines;
use crate::util::sha256_text;

pub const FALLBACK_NUMBER: &str = "1";
pub const FALLBACK_TITLE: &str = "Full Bill Text";
pub const PREAMBLE_NUMBER: &str = "0";
pub const PREAMBLE_TITLE: &str = "Preamble";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Re-scan each section body for `(a)` / `5.2` style markers and nest them.
    pub nested: bool,
}

#[derive(Debug)]
pub struct ClauseBuilder {
    options: BuildOptions,
    top_level: ClauseMatcher,
    subsections: ClauseMatcher,
}

#[derive(Debug)]
struct OpenSection {
    index: usize,
    body: Vec<(usize, String)>,
}

#[derive(Debug)]
struct OpenNode {
    index: usize,
    clause_type: ClauseType,
    body: Vec<String>,
}

impl ClauseBuilder {
    pub fn new(options: BuildOptions) -> ClauseResult<Self> {
        Ok(Self {
            options,
            top_level: ClauseMatcher::top_level(options.nested)?,
            subsections: ClauseMatcher::subsections()?,
        })
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Builds the clause forest for already-normalized text. Never fails: text
    /// without any section header yields a single fallback clause.
    pub fn build(&self, normalized: &str) -> ClauseForest {
        let mut drafts = Vec::<ClauseDraft>::new();
        let mut preamble = Vec::<(usize, String)>::new();
        let mut current: Option<OpenSection> = None;

        for (line_number, line) in numbered_lines(normalized) {
            match self.top_level.classify(line) {
                LineClass::SectionHeader(found) => {
                    if let Some(section) = current.take() {
                        self.close_section(section, &mut drafts);
                    } else if !preamble.is_empty() {
                        push_preamble(std::mem::take(&mut preamble), &mut drafts);
                    }

                    current = Some(open_section(found, line_number, &mut drafts));
                }
                LineClass::ParenSubsection(_)
                | LineClass::DottedSubsection(_)
                | LineClass::NoMatch => match current.as_mut() {
                    Some(section) => section.body.push((line_number, line.to_string())),
                    None => preamble.push((line_number, line.to_string())),
                },
            }
        }

        if let Some(section) = current.take() {
            self.close_section(section, &mut drafts);
        }

        if drafts.is_empty() {
            drafts.push(fallback_draft(normalized));
        }

        debug!(
            clauses = drafts.len(),
            nested = self.options.nested,
            "built clause forest"
        );

        ClauseForest {
            drafts,
            source_hash: sha256_text(normalized),
        }
    }

    fn close_section(&self, section: OpenSection, drafts: &mut Vec<ClauseDraft>) {
        if !self.options.nested {
            drafts[section.index].content = join_body(section.body.iter().map(|(_, line)| line));
            return;
        }

        let mut section_body = Vec::<String>::new();
        let mut stack = Vec::<OpenNode>::new();

        for (line_number, line) in section.body {
            let opened = match self.subsections.classify(&line) {
                LineClass::ParenSubsection(found) => {
                    let clause_type = paren_clause_type(&found.number, &stack, drafts.as_slice());
                    let marker = format!("({})", found.number);
                    Some((clause_type, found, marker))
                }
                LineClass::DottedSubsection(found) => {
                    let segments = found.number.split('.').count();
                    let clause_type = if segments > 2 {
                        ClauseType::Paragraph
                    } else {
                        ClauseType::Subsection
                    };
                    let marker = found.number.clone();
                    let own_number = found
                        .number
                        .rsplit('.')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    Some((
                        clause_type,
                        LineMatch {
                            number: own_number,
                            heading: found.heading,
                        },
                        marker,
                    ))
                }
                LineClass::SectionHeader(_) | LineClass::NoMatch => None,
            };

            let Some((clause_type, found, marker)) = opened else {
                match stack.last_mut() {
                    Some(node) => node.body.push(line),
                    None => section_body.push(line),
                }
                continue;
            };

            while stack
                .last()
                .is_some_and(|node| node.clause_type.level() >= clause_type.level())
            {
                if let Some(node) = stack.pop() {
                    close_node(node, drafts);
                }
            }

            let parent_index = stack
                .last()
                .map(|node| node.index)
                .unwrap_or(section.index);
            let index = drafts.len();
            drafts.push(ClauseDraft {
                index,
                parent_index: Some(parent_index),
                number: found.number,
                clause_type,
                title: None,
                content: String::new(),
                metadata: json!({ "lineStart": line_number, "marker": marker }),
                display_order: index as i64,
            });
            stack.push(OpenNode {
                index,
                clause_type,
                body: vec![found.heading],
            });
        }

        while let Some(node) = stack.pop() {
            close_node(node, drafts);
        }

        drafts[section.index].content = join_body(section_body.iter());
    }
}

fn open_section(found: LineMatch, line_number: usize, drafts: &mut Vec<ClauseDraft>) -> OpenSection {
    let index = drafts.len();
    let title = Some(found.heading).filter(|heading| !heading.is_empty());
    drafts.push(ClauseDraft {
        index,
        parent_index: None,
        number: found.number,
        clause_type: ClauseType::Section,
        title,
        content: String::new(),
        metadata: json!({ "lineStart": line_number }),
        display_order: index as i64,
    });

    OpenSection {
        index,
        body: Vec::new(),
    }
}

fn push_preamble(lines: Vec<(usize, String)>, drafts: &mut Vec<ClauseDraft>) {
    let line_start = lines.first().map(|(line_number, _)| *line_number).unwrap_or(1);
    let index = drafts.len();
    drafts.push(ClauseDraft {
        index,
        parent_index: None,
        number: PREAMBLE_NUMBER.to_string(),
        clause_type: ClauseType::Section,
        title: Some(PREAMBLE_TITLE.to_string()),
        content: join_body(lines.iter().map(|(_, line)| line)),
        metadata: json!({ "lineStart": line_start, "preamble": true }),
        display_order: index as i64,
    });
}

fn fallback_draft(normalized: &str) -> ClauseDraft {
    ClauseDraft {
        index: 0,
        parent_index: None,
        number: FALLBACK_NUMBER.to_string(),
        clause_type: ClauseType::Section,
        title: Some(FALLBACK_TITLE.to_string()),
        content: normalized.to_string(),
        metadata: json!({ "autoGenerated": true }),
        display_order: 0,
    }
}

fn close_node(node: OpenNode, drafts: &mut [ClauseDraft]) {
    drafts[node.index].content = join_body(node.body.iter());
}

fn join_body<'a>(lines: impl Iterator<Item = &'a String>) -> String {
    lines
        .map(String::as_str)
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Bracketed markers are ambiguous between levels: digits are subsections,
/// roman numerals under an open paragraph are subparagraphs, other letters are
/// paragraphs. `(i)` directly after `(h)` stays a paragraph.
fn paren_clause_type(token: &str, stack: &[OpenNode], drafts: &[ClauseDraft]) -> ClauseType {
    let token = token.to_ascii_lowercase();
    if token.chars().next().is_some_and(|ch| ch.is_ascii_digit()) {
        return ClauseType::Subsection;
    }

    let open_paragraph = stack
        .iter()
        .rev()
        .find(|node| node.clause_type == ClauseType::Paragraph)
        .and_then(|node| drafts.get(node.index));

    if let Some(paragraph) = open_paragraph {
        if is_roman_numeral(&token) && !follows_letter(&paragraph.number, &token) {
            return ClauseType::Subparagraph;
        }
    }

    ClauseType::Paragraph
}

fn is_roman_numeral(token: &str) -> bool {
    !token.is_empty() && token.len() <= 6 && token.chars().all(|ch| matches!(ch, 'i' | 'v' | 'x' | 'l'))
}

fn follows_letter(previous: &str, token: &str) -> bool {
    let mut previous_chars = previous.chars();
    let mut token_chars = token.chars();
    match (
        previous_chars.next(),
        previous_chars.next(),
        token_chars.next(),
        token_chars.next(),
    ) {
        (Some(prev), None, Some(next), None) => {
            let prev = prev.to_ascii_lowercase();
            prev.is_ascii_lowercase() && (prev as u8).checked_add(1) == Some(next as u8)
        }
        _ => false,
    }
}
