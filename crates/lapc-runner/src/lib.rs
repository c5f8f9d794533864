//! Build a LAPC compressed artifact from long-form source docs, then
//! blind-validate that it preserves enough meaning to answer a fixed
//! question battery as well as the source does, repairing in bounded
//! rounds until it passes or the budget runs out.
//!
//! Pipeline: compression draft → QA battery → per round: oracle answers
//! (source-aware) vs. evaluator answers (compressed-only, source-blind)
//! → source-blind equivalence scoring → targeted restoration on failure.

pub mod answering;
pub mod artifact;
pub mod battery;
pub mod builder;
pub mod client;
pub mod config;
pub mod convergence;
pub mod errors;
pub mod parse;
pub mod prompts;
pub mod report;
pub mod scorer;
pub mod source;

pub use answering::AnswerSet;
pub use artifact::CompressedArtifact;
pub use battery::{Question, QuestionBattery, BATTERY_SIZE};
pub use builder::ArtifactBuilder;
pub use client::{ChatMessage, GenerationClient, GenerationOptions};
pub use config::RunnerConfig;
pub use convergence::{ConvergenceLoop, LiveAgents, LoopOutcome, RoundAgents, RoundRecord};
pub use errors::{RetryCategory, RunnerError};
pub use report::ValidationReport;
pub use scorer::{EquivalenceScorer, ScoreFailure, ScoreVerdict, Severity};
pub use source::{SourceBlock, SourceBundle};
