use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaqError>;

#[derive(Error, Debug)]
pub enum FaqError {
    #[error("Corpus format error: {0}")]
    CorpusFormat(String),

    #[error("Embedding service error{}: {message}", status_suffix(.status))]
    EmbeddingService { status: Option<u16>, message: String },

    #[error("Generation service error{}: {message}", status_suffix(.status))]
    GenerationService { status: Option<u16>, message: String },

    #[error("Search attempted against an empty index")]
    EmptyIndex,

    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index artifacts do not match: {0}")]
    ArtifactMismatch(String),

    #[error(
        "Index was built with embedding provider '{built_with}' but '{configured}' is configured; rebuild the index"
    )]
    ProviderMismatch {
        built_with: String,
        configured: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FaqError {
    /// Whether a remote call failing this way may succeed if repeated.
    ///
    /// Transport failures carry no status. Throttling and server-side
    /// failures are worth another attempt; every other status is final.
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::EmbeddingService { status, .. } | Self::GenerationService { status, .. } => {
                match status {
                    None => true,
                    Some(code) => *code == 429 || *code >= 500,
                }
            }
            _ => false,
        }
    }

    /// Whether the failure came from a remote provider rather than local state.
    #[inline]
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService { .. } | Self::GenerationService { .. }
        )
    }
}

#[allow(clippy::ref_option, reason = "thiserror passes fields by reference")]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (HTTP {code})"))
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod index;
pub mod indexer;
pub mod providers;
pub mod retrieval;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let transport = FaqError::EmbeddingService {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(transport.is_transient());

        let throttled = FaqError::GenerationService {
            status: Some(429),
            message: "slow down".to_string(),
        };
        assert!(throttled.is_transient());

        let server = FaqError::EmbeddingService {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert!(server.is_transient());

        let unauthorized = FaqError::EmbeddingService {
            status: Some(401),
            message: "bad key".to_string(),
        };
        assert!(!unauthorized.is_transient());
        assert!(!FaqError::EmptyIndex.is_transient());
    }

    #[test]
    fn service_error_display_includes_status() {
        let error = FaqError::EmbeddingService {
            status: Some(404),
            message: "DeploymentNotFound".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Embedding service error (HTTP 404): DeploymentNotFound"
        );

        let error = FaqError::GenerationService {
            status: None,
            message: "timed out".to_string(),
        };
        assert_eq!(error.to_string(), "Generation service error: timed out");
    }
}
