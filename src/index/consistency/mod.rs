// Index staleness check
// Compares the records an index was built from with the current corpus

#[cfg(test)]
mod tests;

use tracing::{info, warn};

use crate::corpus::FaqRecord;

/// A single positional difference between indexed and current records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// The corpus has a record past the end of the index
    Added { position: usize, question: String },
    /// The index has a record past the end of the corpus
    Removed { position: usize, question: String },
    /// The question text differs, so the stored vector is stale
    QuestionChanged {
        position: usize,
        indexed: String,
        current: String,
    },
    /// Same question, different answer or category
    MetadataChanged { position: usize, question: String },
}

impl RecordChange {
    #[inline]
    pub fn position(&self) -> usize {
        match self {
            Self::Added { position, .. }
            | Self::Removed { position, .. }
            | Self::QuestionChanged { position, .. }
            | Self::MetadataChanged { position, .. } => *position,
        }
    }

    /// Whether the index vectors no longer describe the corpus
    #[inline]
    pub fn requires_reembedding(&self) -> bool {
        !matches!(self, Self::MetadataChanged { .. })
    }
}

/// Result of comparing persisted metadata with the corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub indexed_records: usize,
    pub corpus_records: usize,
    pub changes: Vec<RecordChange>,
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn requires_rebuild(&self) -> bool {
        self.changes.iter().any(RecordChange::requires_reembedding)
    }
}

/// Compare records position by position.
///
/// Records are joined by position, so an insertion in the middle of the
/// corpus shows up as a run of changed records followed by one addition.
#[inline]
pub fn check_against_corpus(indexed: &[FaqRecord], corpus: &[FaqRecord]) -> ConsistencyReport {
    let mut changes = Vec::new();

    for (position, (old, new)) in indexed.iter().zip(corpus).enumerate() {
        if old.question != new.question {
            changes.push(RecordChange::QuestionChanged {
                position,
                indexed: old.question.clone(),
                current: new.question.clone(),
            });
        } else if old != new {
            changes.push(RecordChange::MetadataChanged {
                position,
                question: new.question.clone(),
            });
        }
    }

    let shared = indexed.len().min(corpus.len());
    changes.extend(
        corpus
            .iter()
            .enumerate()
            .skip(shared)
            .map(|(position, record)| RecordChange::Added {
                position,
                question: record.question.clone(),
            }),
    );
    changes.extend(
        indexed
            .iter()
            .enumerate()
            .skip(shared)
            .map(|(position, record)| RecordChange::Removed {
                position,
                question: record.question.clone(),
            }),
    );

    let report = ConsistencyReport {
        indexed_records: indexed.len(),
        corpus_records: corpus.len(),
        is_consistent: changes.is_empty(),
        changes,
    };

    if report.is_consistent {
        info!("Index matches corpus ({} records)", report.corpus_records);
    } else {
        warn!(
            "Index differs from corpus in {} places (indexed {}, corpus {})",
            report.changes.len(),
            report.indexed_records,
            report.corpus_records
        );
    }

    report
}
