//! The validate-and-repair convergence loop.
//!
//! States follow `Drafting → Scoring → (Passed | Repairing) → Scoring → …`;
//! `Passed` and `Exhausted` are terminal. Termination is guaranteed: every
//! iteration either passes (stop) or consumes one unit of round budget.
//!
//! The loop owns the current artifact and the round history. Each round's
//! participants get a read-only view; a repair produces a replacement
//! artifact value, never an in-place edit. History is append-only and is
//! returned in full as the audit trail.
//!
//! Generation-backed steps sit behind the [`RoundAgents`] seam so tests can
//! drive the loop with scripted verdict sequences.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::answering::{self, AnswerSet};
use crate::artifact::CompressedArtifact;
use crate::battery::QuestionBattery;
use crate::builder::ArtifactBuilder;
use crate::client::GenerationClient;
use crate::errors::RunnerError;
use crate::scorer::{EquivalenceScorer, ScoreFailure, ScoreVerdict};
use crate::source::SourceBundle;

// ── State machine ────────────────────────────────────────────────────────────

/// Loop states. Every run starts at `Drafting` and terminates at either
/// `Passed` or `Exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Initial artifact being produced (pre-loop).
    Drafting,
    /// Running dual answering + scoring against the current artifact.
    Scoring,
    /// Applying a minimal-edit restoration to the artifact.
    Repairing,
    /// Verdict passed — terminal.
    Passed,
    /// Round budget exhausted while failing — terminal, not an error.
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Exhausted)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drafting => write!(f, "Drafting"),
            Self::Scoring => write!(f, "Scoring"),
            Self::Repairing => write!(f, "Repairing"),
            Self::Passed => write!(f, "Passed"),
            Self::Exhausted => write!(f, "Exhausted"),
        }
    }
}

fn is_legal_transition(from: LoopState, to: LoopState) -> bool {
    use LoopState::*;
    matches!(
        (from, to),
        (Drafting, Scoring)
            | (Scoring, Passed)
            | (Scoring, Repairing)
            | (Scoring, Exhausted)
            | (Repairing, Scoring)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: LoopState,
    pub to: LoopState,
    /// Round number at the time of transition (0 for pre-loop states).
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: LoopState,
    pub to: LoopState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal loop transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

impl From<IllegalTransition> for RunnerError {
    fn from(err: IllegalTransition) -> Self {
        RunnerError::Internal(anyhow::Error::new(err))
    }
}

/// Guarded state tracker with a complete transition log.
struct LoopStateMachine {
    current: LoopState,
    round: u32,
    transitions: Vec<TransitionRecord>,
}

impl LoopStateMachine {
    fn new() -> Self {
        Self {
            current: LoopState::Drafting,
            round: 0,
            transitions: Vec::new(),
        }
    }

    fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    fn advance(&mut self, to: LoopState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = %self.current, to = %to, round = self.round, "loop transition");
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }
}

// ── Round agents seam ────────────────────────────────────────────────────────

/// The generation-backed steps of one round.
///
/// `evaluate` and `score` deliberately have no parameter through which a
/// `SourceBundle` could be passed; only `oracle` and `repair` are allowed
/// to be source-grounded.
#[async_trait]
pub trait RoundAgents: Send + Sync {
    /// Oracle pass: answer the battery with full source access.
    async fn oracle(&self, battery: &QuestionBattery) -> Result<AnswerSet, RunnerError>;

    /// Evaluator pass: answer the battery from the artifact alone.
    async fn evaluate(
        &self,
        battery: &QuestionBattery,
        artifact: &CompressedArtifact,
    ) -> Result<AnswerSet, RunnerError>;

    /// Score oracle vs. evaluator agreement, source-blind.
    async fn score(
        &self,
        battery: &QuestionBattery,
        oracle: &AnswerSet,
        evaluator: &AnswerSet,
    ) -> Result<ScoreVerdict, RunnerError>;

    /// Minimal-edit restoration targeting the reported failures.
    async fn repair(
        &self,
        artifact: &CompressedArtifact,
        failures: &[ScoreFailure],
    ) -> Result<CompressedArtifact, RunnerError>;
}

/// Production agents backed by the generation client.
pub struct LiveAgents<'a> {
    client: &'a GenerationClient,
    bundle: &'a SourceBundle,
}

impl<'a> LiveAgents<'a> {
    pub fn new(client: &'a GenerationClient, bundle: &'a SourceBundle) -> Self {
        Self { client, bundle }
    }
}

#[async_trait]
impl RoundAgents for LiveAgents<'_> {
    async fn oracle(&self, battery: &QuestionBattery) -> Result<AnswerSet, RunnerError> {
        answering::oracle_pass(self.client, battery, self.bundle).await
    }

    async fn evaluate(
        &self,
        battery: &QuestionBattery,
        artifact: &CompressedArtifact,
    ) -> Result<AnswerSet, RunnerError> {
        answering::evaluator_pass(self.client, battery, artifact).await
    }

    async fn score(
        &self,
        battery: &QuestionBattery,
        oracle: &AnswerSet,
        evaluator: &AnswerSet,
    ) -> Result<ScoreVerdict, RunnerError> {
        EquivalenceScorer::new(self.client)
            .score(battery, oracle, evaluator)
            .await
    }

    async fn repair(
        &self,
        artifact: &CompressedArtifact,
        failures: &[ScoreFailure],
    ) -> Result<CompressedArtifact, RunnerError> {
        ArtifactBuilder::new(self.client)
            .restore(self.bundle, artifact, failures)
            .await
    }
}

// ── Round history / outcome ──────────────────────────────────────────────────

/// One round of the audit trail. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub oracle: AnswerSet,
    pub evaluator: AnswerSet,
    #[serde(rename = "score")]
    pub verdict: ScoreVerdict,
}

/// Terminal result of the loop: best-effort artifact plus full audit trail.
#[derive(Debug)]
pub struct LoopOutcome {
    pub artifact: CompressedArtifact,
    pub rounds: Vec<RoundRecord>,
    /// Whether the final scored round passed. `false` means the budget was
    /// exhausted while failing — a flagged outcome, not an error.
    pub passed: bool,
    pub transitions: Vec<TransitionRecord>,
}

impl LoopOutcome {
    pub fn final_verdict(&self) -> Option<&ScoreVerdict> {
        self.rounds.last().map(|r| &r.verdict)
    }
}

// ── The loop ─────────────────────────────────────────────────────────────────

/// Bounded validate-and-repair driver.
pub struct ConvergenceLoop {
    max_rounds: u32,
}

impl ConvergenceLoop {
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    /// Run answer → score → (conditional repair) rounds until pass or
    /// budget exhaustion.
    ///
    /// Exactly as many repair calls are made as there are failing rounds
    /// with budget remaining: a failing final round is recorded but not
    /// repaired, so the returned artifact is always the last scored one.
    pub async fn run<A: RoundAgents + ?Sized>(
        &self,
        agents: &A,
        battery: &QuestionBattery,
        initial: CompressedArtifact,
    ) -> Result<LoopOutcome, RunnerError> {
        let mut sm = LoopStateMachine::new();
        sm.advance(LoopState::Scoring, Some("initial artifact drafted"))?;

        let mut artifact = initial;
        let mut rounds: Vec<RoundRecord> = Vec::new();
        let mut passed = false;

        for round in 1..=self.max_rounds {
            sm.set_round(round);

            let oracle = agents.oracle(battery).await?;
            let evaluator = agents.evaluate(battery, &artifact).await?;
            let verdict = agents.score(battery, &oracle, &evaluator).await?;
            info!(
                round,
                score = verdict.score_0_100,
                failures = verdict.failures.len(),
                passing = verdict.is_passing(),
                "round scored"
            );

            let is_passing = verdict.is_passing();
            rounds.push(RoundRecord {
                round,
                oracle,
                evaluator,
                verdict,
            });

            if is_passing {
                sm.advance(LoopState::Passed, Some("verdict passed"))?;
                passed = true;
                break;
            }

            if round < self.max_rounds {
                sm.advance(LoopState::Repairing, Some("verdict failed; budget remains"))?;
                // Clone of the just-recorded failures; history stays untouched.
                let failures = rounds
                    .last()
                    .map(|r| r.verdict.failures.clone())
                    .unwrap_or_default();
                let repaired = agents.repair(&artifact, &failures).await?;
                repaired.ensure_sections()?;
                artifact = repaired;
                sm.advance(LoopState::Scoring, Some("restored artifact"))?;
            }
        }

        if !passed {
            warn!(
                rounds = rounds.len(),
                "round budget exhausted without a passing verdict"
            );
            sm.advance(LoopState::Exhausted, Some("round budget exhausted"))?;
        }

        Ok(LoopOutcome {
            artifact,
            rounds,
            passed,
            transitions: sm.into_transitions(),
        })
    }
}
