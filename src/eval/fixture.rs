//! Evaluation fixtures: ordered question / expected-answer records.
//!
//! A fixture file is a JSON array:
//! ```json
//! [
//!   {"question": "What is the capital of France?", "expected": "Paris"},
//!   {"question": "...", "ground_truth": "...", "paraphrases": ["..."]}
//! ]
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a fixture expects the chatbot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    /// General question / answer pairs.
    Answer,
    /// Out-of-scope questions the chatbot should decline.
    DontKnow,
}

impl FixtureKind {
    /// Guess the kind from a fixture file name.
    pub fn infer(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let squashed: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
        if squashed.contains("dontknow") {
            FixtureKind::DontKnow
        } else {
            FixtureKind::Answer
        }
    }
}

/// One fixture record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    /// The question to ask.
    pub question: String,
    /// Expected answer, or the expected kind of non-answer.
    #[serde(alias = "ground_truth")]
    pub expected: String,
    /// Other acceptable answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paraphrases: Vec<String>,
}

impl FixtureRecord {
    pub fn new(question: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            expected: expected.into(),
            paraphrases: Vec::new(),
        }
    }

    /// The expected answer followed by its paraphrases.
    pub fn accepted_answers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.expected.as_str()).chain(self.paraphrases.iter().map(String::as_str))
    }
}

/// An immutable, ordered set of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Fixture name (the file stem when loaded from disk).
    pub name: String,
    pub kind: FixtureKind,
    pub records: Vec<FixtureRecord>,
}

impl Fixture {
    pub fn new(name: &str, kind: FixtureKind, records: Vec<FixtureRecord>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load from a JSON file. `kind` defaults to a guess from the file name.
    pub fn load(path: &Path, kind: Option<FixtureKind>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {:?}", path))?;
        let records: Vec<FixtureRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture JSON: {:?}", path))?;

        for (idx, record) in records.iter().enumerate() {
            if record.question.trim().is_empty() {
                bail!("Fixture record {} in {:?} has an empty question", idx + 1, path);
            }
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fixture".to_string());
        let kind = kind.unwrap_or_else(|| FixtureKind::infer(path));

        Ok(Self::new(&name, kind, records))
    }
}
