//! Runner error taxonomy with retry classification.
//!
//! Every error in the runner is represented here. Callers can query
//! `is_retriable()` / `retry_category()` without string matching.
//!
//! ## Retry categories
//!
//! | Category          | Retriable | Notes                                   |
//! |-------------------|-----------|-----------------------------------------|
//! | Transient         | yes       | request-level upstream failure          |
//! | ParseFailure      | no        | malformed structured output is terminal |
//! | ContractViolation | no        | missing sections, wrong battery size    |
//! | Configuration     | no        | bad/missing runtime config              |
//!
//! A failing `ScoreVerdict` is deliberately NOT an error: it is ordinary
//! control flow that drives a repair round.

use std::fmt;

use thiserror::Error;

/// Classification used by callers to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Transient network / upstream error — safe to retry with backoff.
    Transient,
    /// Generation output failed structured parsing — terminal.
    ParseFailure,
    /// A structural precondition the loop depends on does not hold — terminal.
    ContractViolation,
    /// Configuration is invalid or missing — terminal.
    Configuration,
}

impl RetryCategory {
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for RetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::ParseFailure => write!(f, "parse_failure"),
            Self::ContractViolation => write!(f, "contract_violation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Unified error type for all runner operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Upstream generation request failed (network, timeout, HTTP status).
    ///
    /// Carries the HTTP status when one was received and the raw upstream
    /// body/error text so a failed run can be diagnosed without re-running.
    #[error("upstream generation failure{}: {}", status_suffix(.status), .detail)]
    Upstream { status: Option<u16>, detail: String },

    /// Generation output could not be parsed as the expected structured
    /// shape, even after fence stripping and brace extraction.
    #[error("structured response parse failure: {0}")]
    ParseFailure(String),

    /// The compressed artifact is missing required section markers.
    #[error("compressed output missing required sections: {0:?}")]
    MissingSections(Vec<String>),

    /// The question battery did not contain exactly the required count.
    #[error("expected {expected} questions, got {got}")]
    BatterySize { expected: usize, got: usize },

    /// The question battery contained a duplicate identifier.
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),

    /// Configuration is invalid or missing required fields.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Filesystem error reading sources or writing outputs.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error that doesn't fit the above categories.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl RunnerError {
    /// Classify this error for retry logic.
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::Upstream { .. } => RetryCategory::Transient,
            Self::ParseFailure(_) => RetryCategory::ParseFailure,
            Self::MissingSections(_) | Self::BatterySize { .. } | Self::DuplicateQuestionId(_) => {
                RetryCategory::ContractViolation
            }
            Self::Configuration(_) => RetryCategory::Configuration,
            Self::Io(_) | Self::Internal(_) => RetryCategory::ContractViolation,
        }
    }

    /// Returns `true` if the caller may retry after this error.
    pub fn is_retriable(&self) -> bool {
        self.retry_category().is_retriable()
    }

    /// Build an `Upstream` variant from a transport-level error.
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            detail: detail.into(),
        }
    }
}
