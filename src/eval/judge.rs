//! LLM-as-judge star ratings.

use super::fixture::FixtureKind;
use crate::error::Result;
use crate::llm::{Generator, Prompts};
use crate::retrieval::Passage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A judged dimension of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Quality,
    Correctness,
    DontKnow,
    Focus,
    RetrievalRelevance,
}

impl Metric {
    /// Metrics judged for a fixture kind.
    pub fn for_kind(kind: FixtureKind) -> &'static [Metric] {
        match kind {
            FixtureKind::Answer => &[
                Metric::Quality,
                Metric::Correctness,
                Metric::Focus,
                Metric::RetrievalRelevance,
            ],
            FixtureKind::DontKnow => &[Metric::DontKnow],
        }
    }

    fn template(self) -> &'static str {
        match self {
            Metric::Quality => Prompts::judge_quality(),
            Metric::Correctness => Prompts::judge_correctness(),
            Metric::DontKnow => Prompts::judge_dont_know(),
            Metric::Focus => Prompts::judge_focus(),
            Metric::RetrievalRelevance => Prompts::judge_retrieval_relevance(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Quality => "Quality",
            Metric::Correctness => "Correctness",
            Metric::DontKnow => "Don't Know",
            Metric::Focus => "Focus",
            Metric::RetrievalRelevance => "Retrieval Relevance",
        }
    }
}

/// The judge's verdict on one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    pub metric: Metric,
    /// Star rating 1-5, `None` when the reply had no usable value.
    pub stars: Option<u8>,
    /// The judge's reasoning, if it gave any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thoughts: String,
}

/// Everything the judge needs to see about one answered question.
#[derive(Debug, Clone, Copy)]
pub struct JudgeInput<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub ground_truth: &'a str,
    pub context: &'a [Passage],
}

/// LLM-as-Judge for rating answers.
#[derive(Clone)]
pub struct LlmJudge {
    generator: Arc<dyn Generator>,
}

impl LlmJudge {
    /// Create a new judge with the given generator.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Rate one answer on one metric.
    pub async fn judge(&self, metric: Metric, input: JudgeInput<'_>) -> Result<Judgement> {
        let prompt = Self::render(metric, input);
        let reply = self
            .generator
            .complete(Some(Prompts::judge_system()), &prompt)
            .await?;
        tracing::debug!(?metric, %reply, "judge reply");
        Ok(Self::parse_reply(metric, &reply))
    }

    /// Rate one answer on every metric for the fixture kind, in order.
    pub async fn judge_all(&self, kind: FixtureKind, input: JudgeInput<'_>) -> Result<Vec<Judgement>> {
        let mut judgements = Vec::new();
        for &metric in Metric::for_kind(kind) {
            judgements.push(self.judge(metric, input).await?);
        }
        Ok(judgements)
    }

    /// Context as numbered `Source N - content` lines.
    pub fn format_context(passages: &[Passage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Source {} - {}", i + 1, p.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(metric: Metric, input: JudgeInput<'_>) -> String {
        metric
            .template()
            .replace("{{question}}", input.question)
            .replace("{{context}}", &Self::format_context(input.context))
            .replace("{{answer}}", input.answer)
            .replace("{{ground_truth}}", input.ground_truth)
    }

    /// Pull `thoughts:` and `stars:` out of a judge reply.
    fn parse_reply(metric: Metric, reply: &str) -> Judgement {
        // ASCII folding keeps byte offsets valid for `reply`
        let lower = reply.to_ascii_lowercase();
        let section = |marker: &str| lower.rfind(marker).map(|pos| pos + marker.len());

        let stars_at = section("stars:");
        let thoughts = section("thoughts:")
            .map(|start| {
                let end = stars_at.filter(|&s| s > start).map(|s| s - "stars:".len());
                reply[start..end.unwrap_or(reply.len())].trim().to_string()
            })
            .unwrap_or_default();

        let stars = stars_at.and_then(|start| Self::first_number(&reply[start..]));

        Judgement {
            metric,
            stars: stars.map(|s| s.clamp(1, 5)),
            thoughts,
        }
    }

    fn first_number(text: &str) -> Option<u8> {
        let digits: String = text
            .trim_start()
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u32>().ok().map(|n| n.min(u8::MAX as u32) as u8)
    }
}
