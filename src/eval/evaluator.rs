//! Fixture replay: ask every question in order and score the answers.

use super::fixture::{Fixture, FixtureRecord};
use super::judge::{JudgeInput, LlmJudge};
use super::matching::MatchPolicy;
use super::report::{EvaluationReport, RecordOutcome, RecordResult};
use crate::chat::{ChatRequest, ChatService};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Configuration for an evaluation run.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorConfig {
    /// Maximum records to evaluate (for quick testing).
    pub max_items: Option<usize>,
    /// Print each record as it completes.
    pub verbose: bool,
}

/// Evaluation runner.
pub struct Evaluator {
    service: Arc<dyn ChatService>,
    policy: MatchPolicy,
    judge: Option<LlmJudge>,
    config: EvaluatorConfig,
}

impl Evaluator {
    /// Create a new evaluator against a chat service.
    pub fn new(service: Arc<dyn ChatService>, policy: MatchPolicy) -> Self {
        Self {
            service,
            policy,
            judge: None,
            config: EvaluatorConfig::default(),
        }
    }

    /// Also rate successful answers with an LLM judge.
    pub fn with_judge(mut self, judge: LlmJudge) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the fixture, one record at a time, in fixture order.
    ///
    /// A failing chat call is recorded on its own record; the run always
    /// reaches the end of the fixture.
    pub async fn run(&self, fixture: &Fixture) -> EvaluationReport {
        let start_time = Instant::now();
        let mut report = EvaluationReport::new(&fixture.name, fixture.kind, self.policy.name());

        let records: Vec<&FixtureRecord> = match self.config.max_items {
            Some(max) => fixture.records.iter().take(max).collect(),
            None => fixture.records.iter().collect(),
        };

        tracing::info!(
            fixture = %fixture.name,
            records = records.len(),
            policy = self.policy.name(),
            "starting evaluation"
        );

        for (index, record) in records.iter().enumerate() {
            let result = self.evaluate_record(index, record, fixture).await;

            if self.config.verbose {
                EvaluationReport::print_record(&result);
            } else {
                print!("{}", if result.outcome.is_pass() { "." } else { "F" });
                std::io::stdout().flush().ok();
            }

            report.records.push(result);
        }

        if !self.config.verbose && !records.is_empty() {
            println!(); // Newline after progress marks
        }

        report.total_time_secs = start_time.elapsed().as_secs_f64();
        report.calculate_summary();
        report
    }

    /// Evaluate a single fixture record.
    async fn evaluate_record(
        &self,
        index: usize,
        record: &FixtureRecord,
        fixture: &Fixture,
    ) -> RecordResult {
        let mut result = RecordResult {
            index,
            question: record.question.clone(),
            expected: record.expected.clone(),
            answer: None,
            outcome: RecordOutcome::Fail,
            context: Vec::new(),
            judgements: Vec::new(),
            judge_error: None,
        };

        let response = match self.service.ask(&ChatRequest::new(&record.question)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(index, question = %record.question, error = %err, "chat call failed");
                result.outcome = RecordOutcome::Error {
                    kind: err.kind(),
                    reason: err.reason().to_string(),
                };
                return result;
            }
        };

        result.outcome = if self.policy.matches(&response.answer, record) {
            RecordOutcome::Pass
        } else {
            RecordOutcome::Fail
        };

        if let Some(judge) = &self.judge {
            let input = JudgeInput {
                question: &record.question,
                answer: &response.answer,
                ground_truth: &record.expected,
                context: &response.context,
            };
            match judge.judge_all(fixture.kind, input).await {
                Ok(judgements) => result.judgements = judgements,
                Err(err) => {
                    tracing::warn!(index, error = %err, "judge failed");
                    result.judge_error = Some(err.to_string());
                }
            }
        }

        result.answer = Some(response.answer);
        result.context = response.context;
        result
    }
}
