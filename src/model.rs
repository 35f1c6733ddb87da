use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseType {
    Section,
    Subsection,
    Paragraph,
    Subparagraph,
}

impl ClauseType {
    pub const ALL: [ClauseType; 4] = [
        ClauseType::Section,
        ClauseType::Subsection,
        ClauseType::Paragraph,
        ClauseType::Subparagraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClauseType::Section => "section",
            ClauseType::Subsection => "subsection",
            ClauseType::Paragraph => "paragraph",
            ClauseType::Subparagraph => "subparagraph",
        }
    }

    /// Nesting depth, with sections at 0.
    pub fn level(self) -> usize {
        match self {
            ClauseType::Section => 0,
            ClauseType::Subsection => 1,
            ClauseType::Paragraph => 2,
            ClauseType::Subparagraph => 3,
        }
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ClauseType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ClauseType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown clause type '{value}', expected one of section, subsection, paragraph, subparagraph"
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub id: i64,
    pub bill_id: String,
    pub number: String,
    #[serde(rename = "type")]
    pub clause_type: ClauseType,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
    pub metadata: Value,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub title: Option<String>,
    pub pdf_path: Option<String>,
    pub pdf_sha256: Option<String>,
    pub source_hash: Option<String>,
    pub parsed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseAnalytics {
    pub comment_count: i64,
    pub support_count: i64,
    pub oppose_count: i64,
    pub neutral_count: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseDetail {
    pub clause: Clause,
    pub full_number: String,
    pub children: Vec<Clause>,
    pub analytics: Option<ClauseAnalytics>,
}

/// Payload for a manually added clause. `clause_type` stays a string so that an
/// unknown value is reported as a field error instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClause {
    #[serde(default)]
    pub number: String,
    #[serde(rename = "type", default)]
    pub clause_type: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Partial update. Outer `None` leaves the field untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClausePatch {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(rename = "type", default)]
    pub clause_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A clause produced by the builder before it has a persisted id. `index` is
/// the draft's position in its forest and doubles as its display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseDraft {
    pub index: usize,
    pub parent_index: Option<usize>,
    pub number: String,
    #[serde(rename = "type")]
    pub clause_type: ClauseType,
    pub title: Option<String>,
    pub content: String,
    pub metadata: Value,
    pub display_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClauseForest {
    pub drafts: Vec<ClauseDraft>,
    pub source_hash: String,
}

impl ClauseForest {
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ClauseDraft> {
        self.drafts
            .iter()
            .filter(|draft| draft.parent_index.is_none())
    }

    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &ClauseDraft> {
        self.drafts
            .iter()
            .filter(move |draft| draft.parent_index == Some(index))
    }

    pub fn full_number(&self, index: usize) -> Option<String> {
        let mut parts = Vec::new();
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            let draft = self.drafts.get(current)?;
            parts.push(draft.number.as_str());
            cursor = draft.parent_index;
            if parts.len() > self.drafts.len() {
                return None;
            }
        }
        parts.reverse();
        Some(parts.join("."))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub bill_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub nested: bool,
    pub source_hash: Option<String>,
    pub clause_count: usize,
    pub section_count: usize,
    pub fallback_used: bool,
    pub db_path: String,
}
