//! Evaluation: replay a fixture against a chat service and score it.
//!
//! This module provides:
//! - Fixture loading (general Q/A and don't-know variants)
//! - Matching policies for comparing answers with expectations
//! - An optional LLM-as-judge that adds star ratings
//! - The sequential evaluator and its report

pub mod evaluator;
pub mod fixture;
pub mod judge;
pub mod matching;
pub mod remote;
pub mod report;

pub use evaluator::{Evaluator, EvaluatorConfig};
pub use fixture::{Fixture, FixtureKind, FixtureRecord};
pub use judge::{Judgement, JudgeInput, LlmJudge, Metric};
pub use matching::{DEFAULT_DONT_KNOW_PHRASES, MatchPolicy, normalize};
pub use remote::HttpChatClient;
pub use report::{EvaluationReport, RecordOutcome, RecordResult};
