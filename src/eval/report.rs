//! Evaluation results and their console / JSON rendering.

use super::fixture::FixtureKind;
use super::judge::{Judgement, Metric};
use crate::error::ChatErrorKind;
use crate::retrieval::Passage;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// What happened to one fixture record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Pass,
    Fail,
    /// The chat call failed; the record was not scored.
    Error { kind: ChatErrorKind, reason: String },
}

impl RecordOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, RecordOutcome::Pass)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RecordOutcome::Error { .. })
    }
}

/// Result for a single fixture record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    /// Zero-based position in the fixture.
    pub index: usize,
    pub question: String,
    pub expected: String,
    /// Generated answer, absent when the chat call failed.
    pub answer: Option<String>,
    pub outcome: RecordOutcome,
    /// Passages the answer was grounded on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Passage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub judgements: Vec<Judgement>,
    /// Why judging failed, if it did. Does not affect the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_error: Option<String>,
}

/// Aggregated evaluation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Fixture name.
    pub fixture: String,
    pub kind: FixtureKind,
    /// Matching policy label.
    pub policy: String,
    /// Records evaluated.
    pub total: usize,
    pub passed: usize,
    /// Records that did not pass, errored ones included.
    pub failed: usize,
    /// Records whose chat call failed.
    pub errored: usize,
    /// `passed / total`, 0.0 for an empty run.
    pub pass_rate: f64,
    /// Mean stars per judged metric.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub average_stars: BTreeMap<Metric, f64>,
    /// Per-record results in fixture order.
    pub records: Vec<RecordResult>,
    /// Wall-clock time of the run (seconds).
    pub total_time_secs: f64,
}

impl EvaluationReport {
    /// Create empty results.
    pub fn new(fixture: &str, kind: FixtureKind, policy: &str) -> Self {
        Self {
            fixture: fixture.to_string(),
            kind,
            policy: policy.to_string(),
            total: 0,
            passed: 0,
            failed: 0,
            errored: 0,
            pass_rate: 0.0,
            average_stars: BTreeMap::new(),
            records: Vec::new(),
            total_time_secs: 0.0,
        }
    }

    /// Recompute summary statistics from the record list.
    pub fn calculate_summary(&mut self) {
        self.total = self.records.len();
        self.passed = self.records.iter().filter(|r| r.outcome.is_pass()).count();
        self.errored = self.records.iter().filter(|r| r.outcome.is_error()).count();
        self.failed = self.total - self.passed;
        self.pass_rate = if self.total > 0 {
            self.passed as f64 / self.total as f64
        } else {
            0.0
        };

        let mut sums: BTreeMap<Metric, (u32, u32)> = BTreeMap::new();
        for judgement in self.records.iter().flat_map(|r| &r.judgements) {
            if let Some(stars) = judgement.stars {
                let entry = sums.entry(judgement.metric).or_default();
                entry.0 += stars as u32;
                entry.1 += 1;
            }
        }
        self.average_stars = sums
            .into_iter()
            .map(|(metric, (sum, count))| (metric, sum as f64 / count as f64))
            .collect();
    }

    /// Per-record pass flags, in fixture order.
    pub fn verdicts(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.outcome.is_pass()).collect()
    }

    /// Print one record in detail.
    pub fn print_record(record: &RecordResult) {
        println!("\n{}", "=".repeat(80).as_str().cyan());
        println!("{} {}", "Question:".cyan(), record.question);
        match &record.answer {
            Some(answer) => println!("\n{} {}", "Answer:".cyan(), answer),
            None => println!("\n{} (none)", "Answer:".cyan()),
        }
        println!("\n{} {}", "Expected:".cyan(), record.expected);

        if !record.context.is_empty() {
            println!("\n{}", "Context:".cyan());
            for (i, passage) in record.context.iter().enumerate() {
                println!("  Source {} - {}", i + 1, passage.source);
            }
        }

        let verdict = match &record.outcome {
            RecordOutcome::Pass => "PASS".green().bold(),
            RecordOutcome::Fail => "FAIL".red().bold(),
            RecordOutcome::Error { kind, reason } => {
                format!("ERROR [{}] {}", kind, reason).as_str().red().bold()
            }
        };
        println!("\n{} {}", "Result:".yellow(), verdict);

        if !record.judgements.is_empty() {
            println!("\n{}", "Evaluations:".yellow());
            for judgement in &record.judgements {
                println!("  {}", judgement.metric.label().green());
                if !judgement.thoughts.is_empty() {
                    println!("    {} {}", "Thoughts:".blue(), judgement.thoughts);
                }
                println!("    {} {}", "Stars:".magenta(), Self::stars_label(judgement.stars));
            }
        }
        if let Some(err) = &record.judge_error {
            println!("\n{} {}", "Judge error:".red(), err);
        }
    }

    fn stars_label(stars: Option<u8>) -> String {
        stars.map(|s| s.to_string()).unwrap_or_else(|| "N/A".to_string())
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results ==========");
        println!("Fixture: {} ({:?}, policy: {})", self.fixture, self.kind, self.policy);
        println!("Total records: {}", self.total);
        println!("----------------------------------------");
        println!("Passed:  {}", self.passed.to_string().as_str().green());
        println!("Failed:  {}", self.failed.to_string().as_str().red());
        println!("  of which errors: {}", self.errored);
        println!("Pass rate: {:.1}%", self.pass_rate * 100.0);

        if !self.average_stars.is_empty() {
            println!("----------------------------------------");
            for (metric, avg) in &self.average_stars {
                println!("Avg {}: {:.2}/5", metric.label(), avg);
            }
        }

        let misses: Vec<&RecordResult> = self
            .records
            .iter()
            .filter(|r| !r.outcome.is_pass())
            .collect();
        if !misses.is_empty() {
            println!("----------------------------------------");
            for record in misses {
                let reason = match &record.outcome {
                    RecordOutcome::Error { kind, reason } => format!("{}: {}", kind, reason),
                    _ => format!("got {:?}", record.answer.as_deref().unwrap_or_default()),
                };
                println!("#{} {} ({})", record.index + 1, record.question, reason);
            }
        }

        println!("----------------------------------------");
        println!("Total time: {:.1}s", self.total_time_secs);
        println!("========================================\n");
    }

    /// Save to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create report directory: {:?}", parent))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, outcome: RecordOutcome) -> RecordResult {
        RecordResult {
            index,
            question: format!("Q{}", index),
            expected: "A".to_string(),
            answer: Some("A".to_string()),
            outcome,
            context: Vec::new(),
            judgements: Vec::new(),
            judge_error: None,
        }
    }

    #[test]
    fn test_summary_counts_errors_as_failures() {
        let mut report = EvaluationReport::new("tests", FixtureKind::Answer, "contains");
        report.records = vec![
            result(0, RecordOutcome::Pass),
            result(1, RecordOutcome::Fail),
            result(
                2,
                RecordOutcome::Error {
                    kind: ChatErrorKind::ServiceUnavailable,
                    reason: "down".to_string(),
                },
            ),
            result(3, RecordOutcome::Pass),
        ];
        report.calculate_summary();

        assert_eq!(report.total, 4);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.errored, 1);
        assert_eq!(report.pass_rate, 0.5);
        assert_eq!(report.verdicts(), vec![true, false, false, true]);
    }

    #[test]
    fn test_empty_report_has_zero_pass_rate() {
        let mut report = EvaluationReport::new("empty", FixtureKind::Answer, "contains");
        report.calculate_summary();
        assert_eq!(report.total, 0);
        assert_eq!(report.pass_rate, 0.0);
    }

    #[test]
    fn test_average_stars_skip_missing_values() {
        let mut report = EvaluationReport::new("tests", FixtureKind::Answer, "contains");
        let mut first = result(0, RecordOutcome::Pass);
        first.judgements = vec![
            Judgement {
                metric: Metric::Quality,
                stars: Some(5),
                thoughts: String::new(),
            },
            Judgement {
                metric: Metric::Focus,
                stars: None,
                thoughts: String::new(),
            },
        ];
        let mut second = result(1, RecordOutcome::Pass);
        second.judgements = vec![Judgement {
            metric: Metric::Quality,
            stars: Some(2),
            thoughts: String::new(),
        }];
        report.records = vec![first, second];
        report.calculate_summary();

        assert_eq!(report.average_stars.get(&Metric::Quality), Some(&3.5));
        assert!(!report.average_stars.contains_key(&Metric::Focus));
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports").join("run.json");

        let mut report = EvaluationReport::new("tests", FixtureKind::DontKnow, "dont_know");
        report.records = vec![result(
            0,
            RecordOutcome::Error {
                kind: ChatErrorKind::ServiceUnavailable,
                reason: "timeout".to_string(),
            },
        )];
        report.calculate_summary();
        report.save_json(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["kind"], "dont_know");
        assert_eq!(value["records"][0]["outcome"]["status"], "error");
        assert_eq!(value["records"][0]["outcome"]["kind"], "service_unavailable");

        let loaded: EvaluationReport = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, report);
    }
}
