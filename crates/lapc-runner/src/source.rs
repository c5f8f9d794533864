//! Source material treated as ground truth for a run.

use serde::{Deserialize, Serialize};

/// Whitespace-delimited token count (`wc -w` proxy).
///
/// This is the unit every compression ratio is reported in; it must be
/// reproducible from the text alone.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// One labeled block of source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBlock {
    /// Human-readable label, typically the originating file path.
    pub label: String,
    pub text: String,
}

impl SourceBlock {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// One or more labeled source blocks, immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBundle {
    blocks: Vec<SourceBlock>,
}

impl SourceBundle {
    pub fn new(blocks: Vec<SourceBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[SourceBlock] {
        &self.blocks
    }

    /// Ordered labels of all blocks.
    pub fn labels(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.label.clone()).collect()
    }

    /// Joined label used in the artifact header, e.g. `a.md + b.md`.
    pub fn label(&self) -> String {
        self.labels().join(" + ")
    }

    /// Summed whitespace word count across all blocks.
    pub fn total_words(&self) -> usize {
        self.blocks.iter().map(|b| word_count(&b.text)).sum()
    }

    /// Render all blocks for inclusion in a prompt, each tagged with its label.
    pub fn prompt_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&format!("[SOURCE: {}]\n{}\n\n", block.label, block.text));
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_is_whitespace_delimited() {
        assert_eq!(word_count("one two  three\n\tfour"), 4);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n  "), 0);
    }

    #[test]
    fn bundle_sums_words_across_blocks() {
        let bundle = SourceBundle::new(vec![
            SourceBlock::new("a.md", "alpha beta gamma"),
            SourceBlock::new("b.md", "delta epsilon"),
        ]);
        assert_eq!(bundle.total_words(), 5);
        assert_eq!(bundle.label(), "a.md + b.md");
    }

    #[test]
    fn prompt_text_tags_each_block() {
        let bundle = SourceBundle::new(vec![
            SourceBlock::new("a.md", "alpha"),
            SourceBlock::new("b.md", "beta"),
        ]);
        let text = bundle.prompt_text();
        assert!(text.contains("[SOURCE: a.md]\nalpha"));
        assert!(text.contains("[SOURCE: b.md]\nbeta"));
    }
}
