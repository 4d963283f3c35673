use std::cell::Cell;
use std::collections::HashMap;

use tempfile::TempDir;

use super::*;

struct TableEmbedder {
    vectors: HashMap<&'static str, Vec<f32>>,
    calls: Cell<usize>,
}

impl EmbeddingProvider for TableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.set(self.calls.get() + 1);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| FaqError::EmbeddingService {
                status: Some(400),
                message: format!("unknown text {text}"),
            })
    }
}

fn table() -> TableEmbedder {
    TableEmbedder {
        vectors: HashMap::from([
            ("update card", vec![0.1, 0.0]),
            ("far away", vec![10.0, 10.0]),
            ("wrong size", vec![1.0, 2.0, 3.0]),
        ]),
        calls: Cell::new(0),
    }
}

fn records() -> Vec<FaqRecord> {
    ["How do I update my card?", "Where is my invoice?", "How do I reset my password?"]
        .into_iter()
        .map(|question| FaqRecord {
            question: question.to_string(),
            answer: format!("Answer to {question}"),
            category: "General".to_string(),
        })
        .collect()
}

fn context() -> RetrievalContext {
    let index = FlatIndex::from_vectors(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0]])
        .expect("index builds");
    RetrievalContext::new(index, records()).expect("context builds")
}

#[test]
fn hits_are_sorted_and_resolved() {
    let retriever = Retriever::new(table());
    let hits = retriever
        .retrieve(&context(), "update card", 3)
        .expect("retrieval works");

    let questions: Vec<&str> = hits.iter().map(|hit| hit.question.as_str()).collect();
    assert_eq!(
        questions,
        vec![
            "How do I update my card?",
            "Where is my invoice?",
            "How do I reset my password?"
        ]
    );
    assert_eq!(hits[0].position, 0);
    assert!((hits[0].distance - 0.01).abs() < 1e-6);
    assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
}

#[test]
fn k_limits_hits() {
    let retriever = Retriever::new(table());
    let ctx = context();

    assert_eq!(retriever.retrieve(&ctx, "update card", 1).expect("k=1").len(), 1);
    assert_eq!(retriever.retrieve(&ctx, "update card", 10).expect("k=10").len(), 3);
    assert!(retriever.retrieve(&ctx, "update card", 0).expect("k=0").is_empty());
}

#[test]
fn embedding_failure_propagates() {
    let retriever = Retriever::new(table());
    let result = retriever.retrieve(&context(), "unknown query", 1);

    assert!(matches!(
        result,
        Err(FaqError::EmbeddingService {
            status: Some(400),
            ..
        })
    ));
}

#[test]
fn wrong_dimension_query_is_rejected() {
    let retriever = Retriever::new(table());
    let result = retriever.retrieve(&context(), "wrong size", 1);

    assert!(matches!(
        result,
        Err(FaqError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
}

#[test]
fn empty_context_skips_embedding() {
    let ctx = RetrievalContext::new(FlatIndex::new(2), Vec::new()).expect("empty context builds");
    let retriever = Retriever::new(table());

    assert!(matches!(
        retriever.retrieve(&ctx, "update card", 1),
        Err(FaqError::EmptyIndex)
    ));
    assert_eq!(retriever.embedder().calls.get(), 0);
}

#[test]
fn mismatched_pair_is_rejected() {
    let index = FlatIndex::from_vectors(vec![vec![0.0, 0.0]; 2]).expect("index builds");
    assert!(matches!(
        RetrievalContext::new(index, records()),
        Err(FaqError::ArtifactMismatch(_))
    ));
}

#[test]
fn context_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RetrievalContext>();

    let ctx = std::sync::Arc::new(context());
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ctx = std::sync::Arc::clone(&ctx);
            std::thread::spawn(move || ctx.index().search(&[0.0, 0.0], 1).map(|hits| hits[0].position))
        })
        .collect();

    for handle in handles {
        let position = handle.join().expect("thread joins").expect("search works");
        assert_eq!(position, 0);
    }
}

#[test]
fn open_checks_provider() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let provider = ProviderConfig::default();
    let ctx = context();
    let manifest = IndexManifest::new(&provider, 2, ctx.len());
    IndexArtifacts::new(ctx.index().clone(), ctx.records().to_vec(), manifest)
        .expect("artifacts line up")
        .save(temp_dir.path())
        .expect("artifacts save");

    let opened = RetrievalContext::open(temp_dir.path(), &provider).expect("context opens");
    assert_eq!(opened.len(), 3);
    assert_eq!(opened.records(), ctx.records());
    assert!(opened.manifest().is_some());

    let other = ProviderConfig {
        embedding_deployment: "text-embedding-3-small".to_string(),
        ..ProviderConfig::default()
    };
    assert!(matches!(
        RetrievalContext::open(temp_dir.path(), &other),
        Err(FaqError::ProviderMismatch { .. })
    ));
}
