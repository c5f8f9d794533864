//! The compressed LAPC artifact: header, ratio, and required sections.
//!
//! An artifact is a text document whose first line is the LAPC header:
//!
//! ```text
//! [LAPC v1 | source: a.md + b.md | ratio: 1200/300 (wc-w proxy; ~4.00:1)]
//! ```
//!
//! The ratio numerator is the summed source word count; the denominator is
//! the word count of the body excluding the header line. The body must
//! contain four required section markers in a fixed order. Artifacts are
//! values: every revision produces a new artifact, never an in-place edit.

use serde::{Deserialize, Serialize};

use crate::errors::RunnerError;
use crate::source::word_count;

/// Protocol-version tag every header starts with.
pub const HEADER_PREFIX: &str = "[LAPC v1";

/// Required section markers, in the order they must appear.
pub const REQUIRED_SECTIONS: [&str; 4] = [
    "// Context frame",
    "// Tier 3 payload",
    "// Activation cues",
    "// Behavioral constraints",
];

/// A compressed artifact with a synthesized header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedArtifact {
    text: String,
}

impl CompressedArtifact {
    /// Build an artifact from a generation draft, injecting (or overwriting)
    /// the header line with a freshly computed ratio.
    ///
    /// Any pre-existing `[LAPC v1` header in the draft is discarded before
    /// the body word count is taken, so the ratio denominator always refers
    /// to body words only.
    pub fn compose(draft: &str, source_label: &str, original_words: usize) -> Self {
        let body = strip_header(draft).trim().to_string();
        let compressed_words = word_count(&body).max(1);
        let ratio = format!(
            "{original_words}/{compressed_words} (wc-w proxy; ~{:.2}:1)",
            original_words as f64 / compressed_words as f64
        );
        let header = format!("[LAPC v1 | source: {source_label} | ratio: {ratio}]");
        Self {
            text: format!("{header}\n\n{body}\n"),
        }
    }

    /// Full artifact text, header included, trailing newline guaranteed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The header line.
    pub fn header(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }

    /// Body text with the header line removed.
    pub fn body(&self) -> &str {
        strip_header(&self.text)
    }

    /// Word count of the body, excluding the header line.
    pub fn body_words(&self) -> usize {
        word_count(self.body())
    }

    /// Check that every required section marker is present.
    ///
    /// Fatal on failure: names exactly the missing markers, in order.
    /// There is no recovery path other than re-running generation.
    pub fn ensure_sections(&self) -> Result<(), RunnerError> {
        let missing: Vec<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|marker| !self.text.contains(**marker))
            .map(|marker| marker.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RunnerError::MissingSections(missing))
        }
    }
}

fn strip_header(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with(HEADER_PREFIX) {
        match trimmed.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    } else {
        text
    }
}
