use regex::Regex;

use crate::error::ClauseResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    SectionHeader,
    ParenSubsection,
    DottedSubsection,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::SectionHeader => "section_header",
            RuleKind::ParenSubsection => "paren_subsection",
            RuleKind::DottedSubsection => "dotted_subsection",
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            RuleKind::SectionHeader => r"(?i)^(?:Section\s+)?(\d+)\.?\s*-?\s*(.*)$",
            RuleKind::ParenSubsection => r"(?i)^\(([a-z0-9]+)\)\s+(.+)$",
            RuleKind::DottedSubsection => r"^(\d+\.\d+(?:\.\d+)?)\s+(.+)$",
        }
    }

    fn accepts_token(self, token: &str) -> bool {
        match self {
            RuleKind::SectionHeader => token.parse::<u32>().is_ok(),
            RuleKind::ParenSubsection => !token.is_empty(),
            RuleKind::DottedSubsection => token.split('.').all(|part| part.parse::<u32>().is_ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub number: String,
    pub heading: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    SectionHeader(LineMatch),
    ParenSubsection(LineMatch),
    DottedSubsection(LineMatch),
    NoMatch,
}

impl LineClass {
    pub fn rule(&self) -> Option<RuleKind> {
        match self {
            LineClass::SectionHeader(_) => Some(RuleKind::SectionHeader),
            LineClass::ParenSubsection(_) => Some(RuleKind::ParenSubsection),
            LineClass::DottedSubsection(_) => Some(RuleKind::DottedSubsection),
            LineClass::NoMatch => None,
        }
    }
}

#[derive(Debug)]
struct MatchRule {
    kind: RuleKind,
    regex: Regex,
}

/// Ordered list of clause-opening rules; the first rule that matches wins.
#[derive(Debug)]
pub struct ClauseMatcher {
    rules: Vec<MatchRule>,
}

impl ClauseMatcher {
    pub fn new(kinds: &[RuleKind]) -> ClauseResult<Self> {
        let rules = kinds
            .iter()
            .map(|&kind| {
                Ok(MatchRule {
                    kind,
                    regex: Regex::new(kind.pattern())?,
                })
            })
            .collect::<ClauseResult<Vec<MatchRule>>>()?;

        Ok(Self { rules })
    }

    /// Every rule in its fixed priority order.
    pub fn full() -> ClauseResult<Self> {
        Self::new(&[
            RuleKind::SectionHeader,
            RuleKind::ParenSubsection,
            RuleKind::DottedSubsection,
        ])
    }

    /// Rules consulted by the top-level pass. The dotted rule runs first in
    /// nested mode so that `5.2 ...` stays inside section 5.
    pub fn top_level(nested: bool) -> ClauseResult<Self> {
        if nested {
            Self::new(&[RuleKind::DottedSubsection, RuleKind::SectionHeader])
        } else {
            Self::new(&[RuleKind::SectionHeader])
        }
    }

    pub fn subsections() -> ClauseResult<Self> {
        Self::new(&[RuleKind::ParenSubsection, RuleKind::DottedSubsection])
    }

    pub fn kinds(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|rule| rule.kind).collect()
    }

    pub fn classify(&self, line: &str) -> LineClass {
        let line = line.trim();
        if line.is_empty() {
            return LineClass::NoMatch;
        }

        for rule in &self.rules {
            let Some(captures) = rule.regex.captures(line) else {
                continue;
            };

            let number = captures
                .get(1)
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();
            if !rule.kind.accepts_token(&number) {
                continue;
            }

            let heading = captures
                .get(2)
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();
            let found = LineMatch { number, heading };

            return match rule.kind {
                RuleKind::SectionHeader => LineClass::SectionHeader(found),
                RuleKind::ParenSubsection => LineClass::ParenSubsection(found),
                RuleKind::DottedSubsection => LineClass::DottedSubsection(found),
            };
        }

        LineClass::NoMatch
    }
}
