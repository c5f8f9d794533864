//! Equivalence scoring: oracle vs. evaluator answer agreement.
//!
//! The scorer judges answer-to-answer agreement only. It is the single
//! source of truth for whether a repair round is triggered. Structural
//! isolation: [`EquivalenceScorer::score`] accepts the battery and the two
//! answer sets — there is no parameter through which source text or the
//! artifact could be passed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::answering::AnswerSet;
use crate::battery::QuestionBattery;
use crate::client::{ChatMessage, GenerationClient, GenerationOptions};
use crate::errors::RunnerError;
use crate::prompts;

/// Fixed pass threshold. Policy constant, not runtime-tunable.
pub const PASS_SCORE: u8 = 95;

/// Severity of an itemized equivalence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One itemized failure with a suggested minimal fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFailure {
    pub id: String,
    pub severity: Severity,
    pub reason: String,
    #[serde(default)]
    pub minimal_fix: String,
}

/// Verdict for one round. Produced fresh each round, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreVerdict {
    /// Pass flag as reported by the scoring model. Retained for the audit
    /// trail; the local policy in [`ScoreVerdict::is_passing`] is
    /// authoritative.
    #[serde(default)]
    pub pass: bool,
    #[serde(default)]
    pub score_0_100: u8,
    #[serde(default)]
    pub failures: Vec<ScoreFailure>,
    #[serde(default)]
    pub summary: String,
}

impl ScoreVerdict {
    /// Parse a verdict from a generation payload.
    pub fn from_value(value: &Value) -> Result<Self, RunnerError> {
        serde_json::from_value(value.clone())
            .map_err(|e| RunnerError::ParseFailure(format!("malformed score verdict: {e}")))
    }

    /// Fixed pass policy: score at or above [`PASS_SCORE`] and no
    /// high-severity failure.
    pub fn is_passing(&self) -> bool {
        self.score_0_100 >= PASS_SCORE && !self.has_high_severity()
    }

    pub fn has_high_severity(&self) -> bool {
        self.failures.iter().any(|f| f.severity == Severity::High)
    }

    /// Append one automatic high-severity failure per battery id missing
    /// from either answer set. A coverage gap must never pass silently.
    pub fn with_coverage(mut self, battery: &QuestionBattery, oracle: &AnswerSet, evaluator: &AnswerSet) -> Self {
        for id in battery.ids() {
            if oracle.contains(id) && evaluator.contains(id) {
                continue;
            }
            let missing_from = if !oracle.contains(id) && !evaluator.contains(id) {
                "oracle and evaluator"
            } else if !oracle.contains(id) {
                "oracle"
            } else {
                "evaluator"
            };
            self.failures.push(ScoreFailure {
                id: id.to_string(),
                severity: Severity::High,
                reason: format!("no answer provided by {missing_from}"),
                minimal_fix: "restore the facts needed to answer this question".into(),
            });
        }
        self
    }
}

/// Source-blind scorer. Holds only a generation client.
pub struct EquivalenceScorer<'a> {
    client: &'a GenerationClient,
}

impl<'a> EquivalenceScorer<'a> {
    pub fn new(client: &'a GenerationClient) -> Self {
        Self { client }
    }

    /// Score one round of oracle vs. evaluator answers.
    pub async fn score(
        &self,
        battery: &QuestionBattery,
        oracle: &AnswerSet,
        evaluator: &AnswerSet,
    ) -> Result<ScoreVerdict, RunnerError> {
        let messages = [
            ChatMessage::system(prompts::SCORER_PREAMBLE),
            ChatMessage::user(prompts::scorer_prompt(battery, oracle, evaluator)),
        ];
        let value = self
            .client
            .complete_json(&messages, GenerationOptions::json(2000, 0.1))
            .await?;
        let verdict = ScoreVerdict::from_value(&value)?.with_coverage(battery, oracle, evaluator);
        info!(
            score = verdict.score_0_100,
            failures = verdict.failures.len(),
            passing = verdict.is_passing(),
            "equivalence scored"
        );
        Ok(verdict)
    }
}
