//! Convergence loop termination and repair-accounting tests.
//!
//! The loop is driven end-to-end with in-process scripted agents — no
//! generation endpoint required.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use lapc_runner::{
    AnswerSet, CompressedArtifact, ConvergenceLoop, QuestionBattery, RoundAgents, RunnerError,
    ScoreFailure, ScoreVerdict, Severity,
};

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn battery() -> QuestionBattery {
    let questions: Vec<Value> = (1..=10)
        .map(|i| json!({"id": format!("q{i}"), "question": format!("Question {i}?")}))
        .collect();
    QuestionBattery::from_value(&json!({ "questions": questions })).unwrap()
}

fn full_answers() -> AnswerSet {
    AnswerSet::from_pairs((1..=10).map(|i| (format!("q{i}"), format!("answer {i}"))))
}

fn valid_draft() -> String {
    "// Context frame\nframe words here\n\n// Tier 3 payload\npayload words here\n\n\
     // Activation cues\ncue words here\n\n// Behavioral constraints\nconstraint words here"
        .to_string()
}

fn initial_artifact() -> CompressedArtifact {
    CompressedArtifact::compose(&valid_draft(), "a.md + b.md", 1200)
}

fn failing_verdict(score: u8) -> ScoreVerdict {
    ScoreVerdict {
        pass: false,
        score_0_100: score,
        failures: vec![ScoreFailure {
            id: "q3".into(),
            severity: Severity::High,
            reason: "evaluator contradicts oracle".into(),
            minimal_fix: "restore the q3 fact".into(),
        }],
        summary: "high-severity gap".into(),
    }
}

fn passing_verdict() -> ScoreVerdict {
    ScoreVerdict {
        pass: true,
        score_0_100: 97,
        failures: vec![],
        summary: "equivalent".into(),
    }
}

// ── Scripted agents ──────────────────────────────────────────────────────────

/// Feeds a fixed sequence of verdicts; counts every agent call.
struct ScriptedAgents {
    verdicts: Mutex<Vec<ScoreVerdict>>,
    oracle_calls: AtomicU32,
    evaluator_calls: AtomicU32,
    score_calls: AtomicU32,
    repair_calls: AtomicU32,
    /// When set, repairs drop this section marker from the artifact.
    drop_section_on_repair: Option<&'static str>,
}

impl ScriptedAgents {
    fn new(verdicts: Vec<ScoreVerdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts),
            oracle_calls: AtomicU32::new(0),
            evaluator_calls: AtomicU32::new(0),
            score_calls: AtomicU32::new(0),
            repair_calls: AtomicU32::new(0),
            drop_section_on_repair: None,
        }
    }

    fn with_broken_repair(mut self, marker: &'static str) -> Self {
        self.drop_section_on_repair = Some(marker);
        self
    }

    fn repairs(&self) -> u32 {
        self.repair_calls.load(Ordering::SeqCst)
    }

    fn scored_rounds(&self) -> u32 {
        self.score_calls.load(Ordering::SeqCst)
    }

    fn answer_passes(&self) -> (u32, u32) {
        (
            self.oracle_calls.load(Ordering::SeqCst),
            self.evaluator_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl RoundAgents for ScriptedAgents {
    async fn oracle(&self, _battery: &QuestionBattery) -> Result<AnswerSet, RunnerError> {
        self.oracle_calls.fetch_add(1, Ordering::SeqCst);
        Ok(full_answers())
    }

    async fn evaluate(
        &self,
        _battery: &QuestionBattery,
        _artifact: &CompressedArtifact,
    ) -> Result<AnswerSet, RunnerError> {
        self.evaluator_calls.fetch_add(1, Ordering::SeqCst);
        Ok(full_answers())
    }

    async fn score(
        &self,
        _battery: &QuestionBattery,
        _oracle: &AnswerSet,
        _evaluator: &AnswerSet,
    ) -> Result<ScoreVerdict, RunnerError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        let mut verdicts = self.verdicts.lock().unwrap();
        assert!(!verdicts.is_empty(), "loop scored more rounds than scripted");
        Ok(verdicts.remove(0))
    }

    async fn repair(
        &self,
        _artifact: &CompressedArtifact,
        failures: &[ScoreFailure],
    ) -> Result<CompressedArtifact, RunnerError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!failures.is_empty(), "repair invoked without failures");
        let mut draft = format!("{}\nrepaired detail", valid_draft());
        if let Some(marker) = self.drop_section_on_repair {
            draft = draft.replace(marker, "// gone");
        }
        Ok(CompressedArtifact::compose(&draft, "a.md + b.md", 1200))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pass_on_first_round_stops_immediately() {
    let agents = ScriptedAgents::new(vec![passing_verdict(), passing_verdict()]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert!(outcome.passed);
    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(agents.scored_rounds(), 1, "no round after a pass");
    assert_eq!(agents.repairs(), 0);
}

#[tokio::test]
async fn failing_round_one_triggers_exactly_one_repair() {
    // Scenario: {pass:false, score:80, high q3} on round 1 of a 2-round
    // budget -> one repair call, round 2 executes, loop ends after round 2.
    let agents = ScriptedAgents::new(vec![failing_verdict(80), failing_verdict(85)]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(agents.scored_rounds(), 2);
    assert_eq!(agents.repairs(), 1, "no repair after the final failing round");
    assert_eq!(agents.answer_passes(), (2, 2), "both passes run every round");
}

#[tokio::test]
async fn fail_then_pass_converges_in_two_rounds() {
    let agents = ScriptedAgents::new(vec![failing_verdict(80), passing_verdict()]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert!(outcome.passed);
    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(agents.repairs(), 1);
    // The returned artifact is the repaired one.
    assert!(outcome.artifact.text().contains("repaired detail"));
}

#[tokio::test]
async fn budget_exhaustion_is_not_an_error() {
    let agents = ScriptedAgents::new(vec![
        failing_verdict(70),
        failing_verdict(75),
        failing_verdict(80),
    ]);
    let outcome = ConvergenceLoop::new(3)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.rounds.len(), 3);
    assert_eq!(agents.repairs(), 2);
    assert_eq!(outcome.final_verdict().unwrap().score_0_100, 80);
}

#[tokio::test]
async fn high_severity_blocks_pass_despite_high_score() {
    let mut verdict = failing_verdict(98);
    verdict.pass = true; // model claims pass; local policy is authoritative
    let agents = ScriptedAgents::new(vec![verdict, passing_verdict()]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert_eq!(agents.repairs(), 1);
    assert!(outcome.passed);
    assert_eq!(outcome.rounds.len(), 2);
}

#[tokio::test]
async fn repair_dropping_a_section_is_fatal_and_named() {
    let agents = ScriptedAgents::new(vec![failing_verdict(80), passing_verdict()])
        .with_broken_repair("// Activation cues");
    let err = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap_err();

    match err {
        RunnerError::MissingSections(missing) => {
            assert_eq!(missing, vec!["// Activation cues".to_string()]);
        }
        other => panic!("expected MissingSections, got {other}"),
    }
}

#[tokio::test]
async fn single_round_budget_never_repairs() {
    let agents = ScriptedAgents::new(vec![failing_verdict(60)]);
    let outcome = ConvergenceLoop::new(1)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(agents.repairs(), 0);
}

#[tokio::test]
async fn audit_trail_rounds_are_ordered_and_append_only() {
    let agents = ScriptedAgents::new(vec![
        failing_verdict(70),
        failing_verdict(80),
        passing_verdict(),
    ]);
    let outcome = ConvergenceLoop::new(5)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    let indices: Vec<u32> = outcome.rounds.iter().map(|r| r.round).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    let scores: Vec<u8> = outcome
        .rounds
        .iter()
        .map(|r| r.verdict.score_0_100)
        .collect();
    assert_eq!(scores, vec![70, 80, 97]);
}

#[tokio::test]
async fn terminal_transition_matches_outcome() {
    let agents = ScriptedAgents::new(vec![failing_verdict(80), failing_verdict(85)]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();

    let last = outcome.transitions.last().unwrap();
    assert_eq!(format!("{:?}", last.to), "Exhausted");

    let agents = ScriptedAgents::new(vec![passing_verdict()]);
    let outcome = ConvergenceLoop::new(2)
        .run(&agents, &battery(), initial_artifact())
        .await
        .unwrap();
    let last = outcome.transitions.last().unwrap();
    assert_eq!(format!("{:?}", last.to), "Passed");
}
