// Indexer module
// Offline pipeline that embeds every corpus question into a flat index


use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::config::ProviderConfig;
use crate::corpus::FaqRecord;
use crate::index::{FlatIndex, IndexArtifacts, IndexManifest};
use crate::providers::EmbeddingProvider;
use crate::{FaqError, Result};

/// Embeds corpus questions in order and assembles the index artifacts.
///
/// Nothing is written to disk here; callers save the returned
/// [`IndexArtifacts`] once the whole corpus has been embedded.
pub struct IndexBuilder<'a, E> {
    embedder: E,
    provider: &'a ProviderConfig,
}

impl<'a, E: EmbeddingProvider> IndexBuilder<'a, E> {
    /// `provider` is recorded in the manifest so a later load can tell which
    /// embedding deployment produced the vectors
    #[inline]
    pub fn new(embedder: E, provider: &'a ProviderConfig) -> Self {
        Self { embedder, provider }
    }

    #[inline]
    pub fn build(&self, records: Vec<FaqRecord>) -> Result<IndexArtifacts> {
        if records.is_empty() {
            error!("Refusing to build an index from an empty corpus");
            return Err(FaqError::EmptyIndex);
        }

        info!("Embedding {} corpus questions", records.len());
        let started = Instant::now();
        let bar = progress_bar(records.len());

        let mut index: Option<FlatIndex> = None;
        for (position, record) in records.iter().enumerate() {
            bar.set_message(record.question.clone());

            let vector = self.embedder.embed(&record.question).inspect_err(|e| {
                bar.abandon();
                error!("Embedding failed for entry {}: {}", position, e);
            })?;
            debug!(
                "Embedded entry {} ({} dimensions)",
                position,
                vector.len()
            );

            let index = index.get_or_insert_with(|| FlatIndex::new(vector.len()));
            index.add(&vector).inspect_err(|_| bar.abandon())?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        let index = index.ok_or(FaqError::EmptyIndex)?;
        let manifest = IndexManifest::new(self.provider, index.dimension(), index.len());

        info!(
            "Built index of {} vectors ({} dimensions) in {:.1}s",
            index.len(),
            index.dimension(),
            started.elapsed().as_secs_f32()
        );
        IndexArtifacts::new(index, records, manifest)
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len as u64).with_style(style)
}
