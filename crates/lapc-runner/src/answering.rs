//! Dual answering: oracle (source-grounded) and evaluator (artifact-only).
//!
//! Both passes answer the same battery and return an [`AnswerSet`].
//! The evaluator pass is structurally source-blind: its signature takes a
//! [`CompressedArtifact`] and cannot accept a `SourceBundle`, so a call
//! site cannot leak ground truth into it by accident.
//!
//! An answer set with missing ids is a data-quality defect, not a fatal
//! error — generation is non-adversarial but imperfect. The scorer turns
//! each gap into an automatic per-question failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::CompressedArtifact;
use crate::battery::QuestionBattery;
use crate::client::{ChatMessage, GenerationClient, GenerationOptions};
use crate::errors::RunnerError;
use crate::prompts;
use crate::source::SourceBundle;

/// Mapping from question id to answer text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<String, String>,
}

impl AnswerSet {
    /// Parse from a generation payload of the shape
    /// `{"answers": {"q1": "...", ...}}`.
    pub fn from_value(value: &Value) -> Result<Self, RunnerError> {
        let raw = value.get("answers").cloned().unwrap_or(Value::Null);
        let answers: BTreeMap<String, String> = serde_json::from_value(raw)
            .map_err(|e| RunnerError::ParseFailure(format!("malformed answer map: {e}")))?;
        Ok(Self { answers })
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.answers.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.answers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Pretty-JSON rendering for inclusion in the scorer prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.answers).unwrap_or_else(|_| "{}".into())
    }

    /// Build from literal pairs; used by tests and scripted agents.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            answers: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Oracle pass: answers grounded in the full source bundle.
pub async fn oracle_pass(
    client: &GenerationClient,
    battery: &QuestionBattery,
    bundle: &SourceBundle,
) -> Result<AnswerSet, RunnerError> {
    let messages = [
        ChatMessage::system(prompts::ORACLE_PREAMBLE),
        ChatMessage::user(prompts::oracle_prompt(battery, bundle)),
    ];
    let value = client
        .complete_json(&messages, GenerationOptions::json(3000, 0.1))
        .await?;
    AnswerSet::from_value(&value)
}

/// Evaluator pass: answers grounded only in the compressed artifact.
///
/// Deliberately cannot take a `SourceBundle`.
pub async fn evaluator_pass(
    client: &GenerationClient,
    battery: &QuestionBattery,
    artifact: &CompressedArtifact,
) -> Result<AnswerSet, RunnerError> {
    let messages = [
        ChatMessage::system(prompts::EVALUATOR_PREAMBLE),
        ChatMessage::user(prompts::evaluator_prompt(battery, artifact)),
    ];
    let value = client
        .complete_json(&messages, GenerationOptions::json(3000, 0.1))
        .await?;
    AnswerSet::from_value(&value)
}
