//! Prompt constants and builders for each generation role.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever prompt content changes,
//! so a recorded report can be traced back to the wording that produced it.

use crate::answering::AnswerSet;
use crate::artifact::CompressedArtifact;
use crate::battery::QuestionBattery;
use crate::scorer::ScoreFailure;
use crate::source::SourceBundle;

/// Prompt version. Bump on any content change.
pub const PROMPT_VERSION: &str = "1.0.0";

/// Compression pass system prompt.
pub const COMPRESSOR_PREAMBLE: &str =
    "You are performing LAPC compression. Output only the final compressed document. No commentary.";

/// Question battery system prompt.
pub const BATTERY_PREAMBLE: &str =
    "Generate a rigorous test battery for compression equivalence.";

/// Oracle pass system prompt.
pub const ORACLE_PREAMBLE: &str = "You are the oracle pass. Use source only.";

/// Evaluator pass system prompt.
pub const EVALUATOR_PREAMBLE: &str =
    "Source-blind evaluation only. If uncertain, state uncertainty; do not invent.";

/// Scorer system prompt.
pub const SCORER_PREAMBLE: &str = "Strict equivalence scorer.";

/// Restoration pass system prompt.
pub const RESTORER_PREAMBLE: &str = "Targeted restoration pass. Minimal edits only.";

pub fn compression_prompt(bundle: &SourceBundle) -> String {
    format!(
        "Apply LAPC with balanced compression (dense but disambiguate where behavior could drift).\n\
         Compression target: roughly 250-420 words total after the header.\n\
         Required output shape:\n\
         1) First line must be the LAPC header with ratio placeholder:\n\
         [LAPC v1 | source: {label} | ratio: TBD]\n\
         2) Then these exact section headers in order:\n\
         // Context frame\n\
         // Tier 3 payload\n\
         // Activation cues\n\
         // Behavioral constraints\n\
         3) Use compact LAPC syntax where useful (! ? -> ; w/ w/o etc).\n\
         4) Add ? prefix for ambiguous/high-drift cues.\n\
         5) Keep concrete Tier-3 facts and behavior constraints faithful.\n\n\
         Now compress this source:\n{source}",
        label = bundle.label(),
        source = bundle.prompt_text(),
    )
}

pub fn battery_prompt(bundle: &SourceBundle, count: usize) -> String {
    format!(
        "Create exactly {count} high-signal questions to verify semantic/behavioral equivalence.\n\
         Mix coverage + edge-case questions. JSON only:\n\
         {{\"questions\":[{{\"id\":\"q1\",\"question\":\"...\"}}, ...]}}\n\n\
         Source:\n{source}",
        source = bundle.prompt_text(),
    )
}

pub fn oracle_prompt(battery: &QuestionBattery, bundle: &SourceBundle) -> String {
    format!(
        "Answer these questions using ONLY the original source.\n\
         Return JSON only: {{\"answers\":{{\"q1\":\"...\", ...}}}}\n\
         Keep each answer <= 45 words and factual.\n\n\
         Questions:\n{questions}\n\n\
         Source:\n{source}",
        questions = battery.to_prompt_json(),
        source = bundle.prompt_text(),
    )
}

pub fn evaluator_prompt(battery: &QuestionBattery, artifact: &CompressedArtifact) -> String {
    format!(
        "You are the blind evaluator pass.\n\
         You MUST answer using only the compressed content below. You are forbidden from using any unseen source.\n\
         Return JSON only: {{\"answers\":{{\"q1\":\"...\", ...}}}}\n\
         Keep each answer <= 45 words. If uncertain, say uncertain.\n\n\
         Questions:\n{questions}\n\n\
         Compressed:\n{compressed}",
        questions = battery.to_prompt_json(),
        compressed = artifact.text(),
    )
}

pub fn scorer_prompt(
    battery: &QuestionBattery,
    oracle: &AnswerSet,
    evaluator: &AnswerSet,
) -> String {
    format!(
        "Score equivalence by comparing Oracle vs Evaluator answers.\n\
         You are source-blind: DO NOT use original source text.\n\
         Output JSON only with schema:\n\
         {{\n\
           \"pass\": true|false,\n\
           \"score_0_100\": int,\n\
           \"failures\": [{{\"id\":\"qX\",\"severity\":\"high|medium|low\",\"reason\":\"...\",\"minimal_fix\":\"...\"}}],\n\
           \"summary\":\"...\"\n\
         }}\n\
         Passing guidance: >=95 and no high-severity failure.\n\n\
         Questions:\n{questions}\n\n\
         Oracle answers:\n{oracle}\n\n\
         Evaluator answers:\n{evaluator}",
        questions = battery.to_prompt_json(),
        oracle = oracle.to_prompt_json(),
        evaluator = evaluator.to_prompt_json(),
    )
}

pub fn restoration_prompt(
    failures: &[ScoreFailure],
    artifact: &CompressedArtifact,
    bundle: &SourceBundle,
) -> String {
    format!(
        "Revise the compressed doc with MINIMAL token additions to fix failures.\n\
         Keep required section headers and preserve dense LAPC style.\n\
         Do not add explanatory prose.\n\
         Output only the revised compressed document.\n\n\
         Failures:\n{failures}\n\n\
         Current compressed:\n{compressed}\n\n\
         Original source for targeted restoration:\n{source}",
        failures = serde_json::to_string_pretty(failures).unwrap_or_else(|_| "[]".into()),
        compressed = artifact.text(),
        source = bundle.prompt_text(),
    )
}
