//! Validation report: the complete, inspectable trace of a run.
//!
//! Reproducible from the recorded battery and answers even though the
//! generation capability is non-deterministic across re-runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::convergence::RoundRecord;
use crate::errors::RunnerError;
use crate::scorer::ScoreVerdict;

/// Audit report written alongside the final artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Model identifier used for every generation call.
    pub model: String,
    /// Ordered source labels.
    pub source: Vec<String>,
    /// Path the final artifact was written to.
    pub output: String,
    pub generated_at: DateTime<Utc>,
    /// Ordered round-by-round audit trail.
    pub rounds: Vec<RoundRecord>,
}

impl ValidationReport {
    pub fn new(
        model: impl Into<String>,
        source: Vec<String>,
        output: impl Into<String>,
        rounds: Vec<RoundRecord>,
    ) -> Self {
        Self {
            model: model.into(),
            source,
            output: output.into(),
            generated_at: Utc::now(),
            rounds,
        }
    }

    /// Verdict of the last scored round, if any round ran.
    pub fn final_verdict(&self) -> Option<&ScoreVerdict> {
        self.rounds.last().map(|r| &r.verdict)
    }

    /// Pretty JSON with a trailing newline, ready to write to disk.
    pub fn to_pretty_json(&self) -> Result<String, RunnerError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RunnerError::Internal(anyhow::anyhow!("report serialization: {e}")))?;
        Ok(format!("{json}\n"))
    }
}
