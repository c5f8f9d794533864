//! CLI entry point: build a LAPC doc via OpenRouter and blind-validate it.
//!
//! Exit contract: pass and budget exhaustion are both process-level
//! success (the final status summary carries the verdict); any fatal
//! failure (missing sections, wrong question count, retry exhaustion,
//! parse failure) exits non-zero with full detail. The output artifact
//! and report are written exactly once, after the loop is done.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use lapc_runner::{
    config::{self, RunnerConfig},
    ArtifactBuilder, ConvergenceLoop, GenerationClient, LiveAgents, QuestionBattery, SourceBlock,
    SourceBundle, ValidationReport,
};

#[derive(Parser, Debug)]
#[command(name = "lapc-runner", about = "Build a LAPC compressed doc via OpenRouter and blind-validate it")]
struct Args {
    /// Primary source doc path
    #[arg(long, default_value = "docs/jacdd-reference.md")]
    source_a: PathBuf,

    /// Secondary source doc path
    #[arg(long, default_value = "docs/raw-braindump-extraction.md")]
    source_b: PathBuf,

    /// Output markdown file path
    #[arg(long, default_value = "docs/jacdd-claude-opus-4.6.md")]
    output: PathBuf,

    /// Validation report output path
    #[arg(long, default_value = "docs/jacdd-claude-opus-4.6-validation.json")]
    report: PathBuf,

    /// OpenRouter model id (default: env OPENROUTER_MODEL or anthropic/claude-opus-4.6)
    #[arg(long)]
    model: Option<String>,

    /// Max restoration rounds
    #[arg(long, default_value_t = config::DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    config::load_dotenv(Path::new(".env"))?;

    let mut cfg = RunnerConfig::from_env(args.model.as_deref());
    cfg.max_rounds = args.max_rounds;
    cfg.validate()?;

    let bundle = SourceBundle::new(vec![
        read_block(&args.source_a)?,
        read_block(&args.source_b)?,
    ]);
    info!(
        model = %cfg.model,
        source = %bundle.label(),
        source_words = bundle.total_words(),
        "runner starting"
    );

    let client = GenerationClient::new(&cfg)?;

    let artifact = ArtifactBuilder::new(&client).build(&bundle).await?;
    let battery = QuestionBattery::generate(&client, &bundle).await?;

    let agents = LiveAgents::new(&client, &bundle);
    let outcome = ConvergenceLoop::new(cfg.max_rounds)
        .run(&agents, &battery, artifact)
        .await?;

    // The loop is done; write the artifact and report exactly once.
    write_text(&args.output, outcome.artifact.text())?;
    let report = ValidationReport::new(
        &cfg.model,
        bundle.labels(),
        args.output.display().to_string(),
        outcome.rounds,
    );
    write_text(&args.report, &report.to_pretty_json()?)?;

    let summary = json!({
        "output": args.output.display().to_string(),
        "report": args.report.display().to_string(),
        "model": cfg.model,
        "passed": outcome.passed,
        "score": report.final_verdict(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn read_block(path: &Path) -> Result<SourceBlock> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source {}", path.display()))?;
    Ok(SourceBlock::new(path.display().to_string(), text))
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
