//! Question battery generation: exactly ten equivalence-probing questions.
//!
//! The battery is generated once per run and shared read-only by every
//! round. A battery of the wrong size, or with duplicate ids, invalidates
//! the equivalence guarantee the rest of the loop depends on, so both are
//! fatal — never padded or truncated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::client::{ChatMessage, GenerationClient, GenerationOptions};
use crate::errors::RunnerError;
use crate::prompts;
use crate::source::SourceBundle;

/// Fixed battery size.
pub const BATTERY_SIZE: usize = 10;

/// A single question record with a stable identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
}

/// Ordered, fixed-size question battery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBattery {
    questions: Vec<Question>,
}

impl QuestionBattery {
    /// Parse a battery from a generation payload of the shape
    /// `{"questions": [{"id": "...", "question": "..."}, ...]}`.
    ///
    /// Enforces exactly [`BATTERY_SIZE`] questions with unique ids.
    pub fn from_value(value: &Value) -> Result<Self, RunnerError> {
        let raw = value.get("questions").cloned().unwrap_or(Value::Null);
        let questions: Vec<Question> = serde_json::from_value(raw)
            .map_err(|e| RunnerError::ParseFailure(format!("malformed question list: {e}")))?;
        if questions.len() != BATTERY_SIZE {
            return Err(RunnerError::BatterySize {
                expected: BATTERY_SIZE,
                got: questions.len(),
            });
        }
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(RunnerError::DuplicateQuestionId(q.id.clone()));
            }
        }
        Ok(Self { questions })
    }

    /// Generate the battery from the source bundle.
    pub async fn generate(
        client: &GenerationClient,
        bundle: &SourceBundle,
    ) -> Result<Self, RunnerError> {
        let messages = [
            ChatMessage::system(prompts::BATTERY_PREAMBLE),
            ChatMessage::user(prompts::battery_prompt(bundle, BATTERY_SIZE)),
        ];
        let value = client
            .complete_json(&messages, GenerationOptions::json(2500, 0.1))
            .await?;
        let battery = Self::from_value(&value)?;
        info!(questions = battery.len(), "question battery generated");
        Ok(battery)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Ordered question ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.id.as_str())
    }

    /// Pretty-JSON rendering for inclusion in prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.questions).unwrap_or_else(|_| "[]".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn battery_value(count: usize) -> Value {
        let questions: Vec<Value> = (1..=count)
            .map(|i| json!({"id": format!("q{i}"), "question": format!("Question {i}?")}))
            .collect();
        json!({ "questions": questions })
    }

    #[test]
    fn accepts_exactly_ten_unique_questions() {
        let battery = QuestionBattery::from_value(&battery_value(10)).unwrap();
        assert_eq!(battery.len(), BATTERY_SIZE);
        let ids: Vec<&str> = battery.ids().collect();
        assert_eq!(ids[0], "q1");
        assert_eq!(ids[9], "q10");
    }

    #[test]
    fn nine_questions_is_fatal() {
        let err = QuestionBattery::from_value(&battery_value(9)).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::BatterySize {
                expected: 10,
                got: 9
            }
        ));
    }

    #[test]
    fn eleven_questions_is_fatal() {
        let err = QuestionBattery::from_value(&battery_value(11)).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::BatterySize {
                expected: 10,
                got: 11
            }
        ));
    }

    #[test]
    fn duplicate_id_is_fatal() {
        let mut value = battery_value(10);
        value["questions"][9]["id"] = json!("q1");
        let err = QuestionBattery::from_value(&value).unwrap_err();
        match err {
            RunnerError::DuplicateQuestionId(id) => assert_eq!(id, "q1"),
            other => panic!("expected DuplicateQuestionId, got {other}"),
        }
    }

    #[test]
    fn missing_questions_key_is_parse_failure() {
        let err = QuestionBattery::from_value(&json!({"items": []})).unwrap_err();
        assert!(matches!(err, RunnerError::ParseFailure(_)));
    }
}
