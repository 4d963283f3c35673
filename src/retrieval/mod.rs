// Retrieval module
// Query embedding and nearest-neighbor lookup against an explicit context

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::corpus::FaqRecord;
use crate::index::{FlatIndex, IndexArtifacts, IndexManifest};
use crate::providers::EmbeddingProvider;
use crate::{FaqError, Result};

/// Read-only index and metadata shared by every query.
///
/// Construction is the only place the pair is checked; after that the
/// context never changes and can be shared across threads.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    index: FlatIndex,
    records: Vec<FaqRecord>,
    manifest: Option<IndexManifest>,
}

impl RetrievalContext {
    #[inline]
    pub fn new(index: FlatIndex, records: Vec<FaqRecord>) -> Result<Self> {
        if index.len() != records.len() {
            return Err(FaqError::ArtifactMismatch(format!(
                "index has {} vectors but metadata has {} records",
                index.len(),
                records.len()
            )));
        }
        Ok(Self {
            index,
            records,
            manifest: None,
        })
    }

    #[inline]
    pub fn from_artifacts(artifacts: IndexArtifacts) -> Result<Self> {
        artifacts.validate()?;
        Ok(Self {
            index: artifacts.index,
            records: artifacts.records,
            manifest: Some(artifacts.manifest),
        })
    }

    /// Load saved artifacts, refusing those built by another embedding deployment
    #[inline]
    pub fn open(dir: &Path, provider: &ProviderConfig) -> Result<Self> {
        let artifacts = IndexArtifacts::load(dir)?;
        artifacts.ensure_provider(provider)?;
        info!("Retrieval context ready with {} entries", artifacts.records.len());
        Self::from_artifacts(artifacts)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn records(&self) -> &[FaqRecord] {
        &self.records
    }

    #[inline]
    pub fn record(&self, position: usize) -> Option<&FaqRecord> {
        self.records.get(position)
    }

    #[inline]
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }
}

/// A corpus question close to the query, nearest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    pub question: String,
    pub distance: f32,
    pub position: usize,
}

/// Embeds queries and looks them up in a [`RetrievalContext`]
#[derive(Debug, Clone)]
pub struct Retriever<E> {
    embedder: E,
}

impl<E: EmbeddingProvider> Retriever<E> {
    #[inline]
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Up to `k` nearest corpus questions, ascending by distance
    #[inline]
    pub fn retrieve(
        &self,
        ctx: &RetrievalContext,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        if ctx.is_empty() {
            return Err(FaqError::EmptyIndex);
        }

        let vector = self.embedder.embed(query)?;
        let neighbors = ctx.index.search(&vector, k)?;

        let hits = neighbors
            .into_iter()
            .map(|neighbor| {
                let record = ctx.record(neighbor.position).ok_or_else(|| {
                    FaqError::ArtifactMismatch(format!(
                        "index position {} has no metadata record",
                        neighbor.position
                    ))
                })?;
                Ok(RetrievalHit {
                    question: record.question.clone(),
                    distance: neighbor.distance,
                    position: neighbor.position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Retrieved {} hits for query; nearest distance {:?}",
            hits.len(),
            hits.first().map(|hit| hit.distance)
        );
        Ok(hits)
    }
}
