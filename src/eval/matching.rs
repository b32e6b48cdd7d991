//! Answer matching policies.
//!
//! All comparisons run on normalized text: lowercased, curly apostrophes
//! folded to `'`, whitespace collapsed, and trailing sentence punctuation
//! removed.

use super::fixture::{FixtureKind, FixtureRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Non-answer phrasings accepted by the default don't-know policy.
pub const DEFAULT_DONT_KNOW_PHRASES: &[&str] = &[
    "i don't know",
    "i do not know",
    "i'm not sure",
    "i am not sure",
    "i'm not certain",
    "i am not certain",
    "i don't have an answer",
    "i do not have an answer",
    "i don't have that information",
    "i cannot answer",
    "i can't answer",
    "not in my sources",
    "not in the provided context",
    "no information",
];

/// How a generated answer is compared with a fixture record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Normalized answer equals the expected answer or a paraphrase.
    Exact,
    /// Normalized answer contains the expected answer or a paraphrase.
    Contains,
    /// Normalized answer contains any of `phrases`; the record's expected
    /// text is not consulted.
    DontKnow { phrases: Vec<String> },
}

impl MatchPolicy {
    /// Don't-know policy with the built-in allow-list.
    pub fn dont_know() -> Self {
        Self::dont_know_with(DEFAULT_DONT_KNOW_PHRASES.iter().map(|p| p.to_string()).collect())
    }

    /// Don't-know policy with a custom allow-list.
    pub fn dont_know_with(phrases: Vec<String>) -> Self {
        MatchPolicy::DontKnow {
            phrases: phrases
                .iter()
                .map(|p| normalize(p))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Default policy for a fixture kind.
    pub fn for_kind(kind: FixtureKind) -> Self {
        match kind {
            FixtureKind::Answer => MatchPolicy::Contains,
            FixtureKind::DontKnow => MatchPolicy::dont_know(),
        }
    }

    /// Load a don't-know allow-list from a JSON array of strings.
    pub fn load_phrases(path: &Path) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read phrases file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Phrases file {:?} must be a JSON array of strings", path))
    }

    /// Short label used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::Contains => "contains",
            MatchPolicy::DontKnow { .. } => "dont_know",
        }
    }

    /// Whether `answer` satisfies `record` under this policy.
    pub fn matches(&self, answer: &str, record: &FixtureRecord) -> bool {
        let answer = normalize(answer);
        match self {
            MatchPolicy::Exact => record
                .accepted_answers()
                .map(normalize)
                .any(|expected| answer == expected),
            MatchPolicy::Contains => record
                .accepted_answers()
                .map(normalize)
                .filter(|expected| !expected.is_empty())
                .any(|expected| answer.contains(&expected)),
            MatchPolicy::DontKnow { phrases } => {
                phrases.iter().any(|phrase| answer.contains(phrase.as_str()))
            }
        }
    }
}

/// Normalize text for comparison.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim_end()
        .to_string()
}
