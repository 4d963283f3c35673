use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::{error, info, warn};

use crate::FaqError;
use crate::answer::{AnswerSynthesizer, AnswerWithRelated};
use crate::config::Config;
use crate::corpus::load_corpus;
use crate::index::{ConsistencyReport, IndexArtifacts, RecordChange, check_against_corpus};
use crate::indexer::IndexBuilder;
use crate::providers::{AzureOpenAiClient, Retrying};
use crate::retrieval::{RetrievalContext, RetrievalHit, Retriever};

/// Shown instead of an answer when a remote provider fails
pub const SERVICE_UNAVAILABLE_NOTICE: &str =
    "The answering service is temporarily unavailable. Please try again in a moment.";

/// Azure client wrapped in the configured retry policy
#[inline]
pub fn provider_client(config: &Config) -> Result<Retrying<AzureOpenAiClient>> {
    let client =
        AzureOpenAiClient::new(&config.provider).context("Failed to create Azure OpenAI client")?;
    Ok(Retrying::new(client, config.provider.retry_attempts))
}

/// Load the saved index for the configured embedding deployment
#[inline]
pub fn open_context(config: &Config) -> Result<RetrievalContext> {
    let dir = config.artifacts_dir();
    RetrievalContext::open(&dir, &config.provider).with_context(|| {
        format!(
            "Failed to open index in {} (run `faq-bot index` first)",
            dir.display()
        )
    })
}

/// Embed the corpus and save the index artifacts
#[inline]
pub fn build_index(config: &Config, corpus: Option<&Path>) -> Result<IndexArtifacts> {
    let corpus_path = corpus.map_or_else(|| config.corpus_path(), Path::to_path_buf);
    info!("Building index from {}", corpus_path.display());

    let records = load_corpus(&corpus_path)
        .with_context(|| format!("Failed to load corpus from {}", corpus_path.display()))?;

    let client = provider_client(config)?;
    let artifacts = IndexBuilder::new(&client, &config.provider)
        .build(records)
        .map_err(service_failure)
        .context("Failed to build index")?;

    let dir = config.artifacts_dir();
    artifacts
        .save(&dir)
        .with_context(|| format!("Failed to save index to {}", dir.display()))?;

    println!(
        "{} Indexed {} questions ({} dimensions) into {}",
        style("✓").green(),
        artifacts.records.len(),
        artifacts.index.dimension(),
        style(dir.display()).cyan()
    );
    Ok(artifacts)
}

/// Answer a question and optionally list related corpus questions
#[inline]
pub fn ask(
    config: &Config,
    query: &str,
    language: &str,
    related: Option<usize>,
    json: bool,
) -> Result<AnswerWithRelated> {
    let ctx = open_context(config)?;
    let client = provider_client(config)?;
    let synthesizer = AnswerSynthesizer::new(&client, &client, config.answer.clone());

    let related = related.unwrap_or(config.answer.related_questions);
    let mut result = synthesizer
        .answer_with_related(&ctx, query, language, related)
        .map_err(service_failure)?;
    result.related.truncate(related);

    if json {
        let rendered =
            serde_json::to_string_pretty(&result).context("Failed to serialize answer")?;
        println!("{}", rendered);
        return Ok(result);
    }

    println!("{}", result.response.answer);
    if let Some(source) = &result.response.source {
        println!("{}", style(format!("(Based on: '{}')", source)).dim());
    }
    if !result.related.is_empty() {
        println!();
        println!("{}", style("Related questions:").bold());
        for hit in &result.related {
            println!("  - {}", hit.question);
        }
    }

    Ok(result)
}

/// Print the `k` nearest corpus questions with their distances.
///
/// Without `k` the configured `answer.related_questions` count is used.
#[inline]
pub fn related(config: &Config, query: &str, k: Option<usize>) -> Result<Vec<RetrievalHit>> {
    let ctx = open_context(config)?;
    let client = provider_client(config)?;
    let k = k.unwrap_or(config.answer.related_questions);

    let hits = Retriever::new(&client)
        .retrieve(&ctx, query, k)
        .map_err(service_failure)?;

    let threshold = config.answer.confidence_threshold;
    for hit in &hits {
        let distance = format!("{:>8.4}", hit.distance);
        let distance = if hit.distance <= threshold {
            style(distance).green()
        } else {
            style(distance).dim()
        };
        println!("{}  [{}] {}", distance, hit.position, hit.question);
    }
    println!();
    println!(
        "Confidence threshold: {} (distances at or below it are answered)",
        threshold
    );

    Ok(hits)
}

/// Validate the saved artifacts and compare them with the corpus
#[inline]
pub fn check_artifacts(config: &Config) -> Result<(IndexArtifacts, ConsistencyReport)> {
    let dir = config.artifacts_dir();
    let artifacts = IndexArtifacts::load(&dir)
        .with_context(|| format!("Failed to load index artifacts from {}", dir.display()))?;

    let corpus_path = config.corpus_path();
    let corpus = load_corpus(&corpus_path)
        .with_context(|| format!("Failed to load corpus from {}", corpus_path.display()))?;

    let report = check_against_corpus(&artifacts.records, &corpus);
    Ok((artifacts, report))
}

#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 FAQ Bot Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   Config file: {}", config.config_file_path().display());
    println!("   Corpus: {}", display_presence(&config.corpus_path()));
    println!("   Artifacts: {}", config.artifacts_dir().display());
    println!(
        "   Embedding deployment: {}",
        config.provider.embedding_fingerprint()
    );
    println!(
        "   API key: {}",
        if config.provider.api_key.is_some() {
            "✅ set"
        } else {
            "❌ missing"
        }
    );
    println!();

    println!("🔍 Index Status:");
    if !IndexArtifacts::exist_in(&config.artifacts_dir()) {
        println!("   ❌ No index found; run `faq-bot index` to build one");
        return Ok(());
    }

    let (artifacts, report) = match check_artifacts(config) {
        Ok(checked) => checked,
        Err(e) => {
            error!("Status check failed: {:#}", e);
            println!("   ❌ {:#}", e);
            return Ok(());
        }
    };

    println!(
        "   ✅ {} vectors, {} dimensions",
        artifacts.index.len(),
        artifacts.index.dimension()
    );
    println!(
        "   🕒 Built: {}",
        artifacts.manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    match artifacts.ensure_provider(&config.provider) {
        Ok(()) => println!("   ✅ Built with the configured embedding deployment"),
        Err(e) => {
            warn!("{}", e);
            println!("   ⚠️  {}", e);
        }
    }
    println!();

    println!("🔄 Corpus Consistency:");
    if report.is_consistent {
        println!("   ✅ Index matches corpus ({} records)", report.corpus_records);
        return Ok(());
    }

    println!(
        "   ⚠️  {} differences (indexed {}, corpus {})",
        report.changes.len(),
        report.indexed_records,
        report.corpus_records
    );
    for change in &report.changes {
        println!("      {}", describe_change(change));
    }
    if report.requires_rebuild() {
        println!("   Run `faq-bot index` to rebuild.");
    } else {
        println!("   Only answers or categories changed; rebuild to refresh stored answers.");
    }

    Ok(())
}

fn describe_change(change: &RecordChange) -> String {
    match change {
        RecordChange::Added { position, question } => format!("+ [{}] {}", position, question),
        RecordChange::Removed { position, question } => format!("- [{}] {}", position, question),
        RecordChange::QuestionChanged {
            position,
            indexed,
            current,
        } => format!("~ [{}] {} -> {}", position, indexed, current),
        RecordChange::MetadataChanged { position, question } => {
            format!("* [{}] {} (answer or category)", position, question)
        }
    }
}

fn display_presence(path: &Path) -> String {
    if path.is_file() {
        format!("{} ✅", path.display())
    } else {
        format!("{} ❌ missing", path.display())
    }
}

/// Log a provider failure and print the generic notice before propagating it
fn service_failure(e: FaqError) -> anyhow::Error {
    if e.is_service_failure() {
        error!("Provider call failed: {}", e);
        eprintln!("{}", style(SERVICE_UNAVAILABLE_NOTICE).yellow());
    }
    anyhow::Error::from(e)
}
