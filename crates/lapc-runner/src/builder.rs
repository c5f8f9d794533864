//! Artifact Builder: compression draft and targeted restoration.
//!
//! Both operations end the same way: recompose the header with a fresh
//! ratio, then validate the required sections. Section validation failure
//! is fatal — the caller has no recovery path except re-running generation.

use tracing::info;

use crate::artifact::CompressedArtifact;
use crate::client::{ChatMessage, GenerationClient, GenerationOptions};
use crate::errors::RunnerError;
use crate::prompts;
use crate::scorer::ScoreFailure;
use crate::source::SourceBundle;

pub struct ArtifactBuilder<'a> {
    client: &'a GenerationClient,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(client: &'a GenerationClient) -> Self {
        Self { client }
    }

    /// Produce the initial compressed artifact from the source bundle.
    pub async fn build(&self, bundle: &SourceBundle) -> Result<CompressedArtifact, RunnerError> {
        let messages = [
            ChatMessage::system(prompts::COMPRESSOR_PREAMBLE),
            ChatMessage::user(prompts::compression_prompt(bundle)),
        ];
        let draft = self
            .client
            .complete(&messages, GenerationOptions::text(5000, 0.2))
            .await?;
        let artifact = CompressedArtifact::compose(&draft, &bundle.label(), bundle.total_words());
        artifact.ensure_sections()?;
        info!(
            source_words = bundle.total_words(),
            body_words = artifact.body_words(),
            "compression draft built"
        );
        Ok(artifact)
    }

    /// Revise the artifact with minimal token-level edits targeting only
    /// the reported failures. Same header and section policy as `build`.
    pub async fn restore(
        &self,
        bundle: &SourceBundle,
        artifact: &CompressedArtifact,
        failures: &[ScoreFailure],
    ) -> Result<CompressedArtifact, RunnerError> {
        let messages = [
            ChatMessage::system(prompts::RESTORER_PREAMBLE),
            ChatMessage::user(prompts::restoration_prompt(failures, artifact, bundle)),
        ];
        let revised = self
            .client
            .complete(&messages, GenerationOptions::text(5000, 0.2))
            .await?;
        let revised = CompressedArtifact::compose(&revised, &bundle.label(), bundle.total_words());
        revised.ensure_sections()?;
        info!(
            targeted_failures = failures.len(),
            body_words = revised.body_words(),
            "restoration applied"
        );
        Ok(revised)
    }
}
