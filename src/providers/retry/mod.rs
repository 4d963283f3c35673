
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{ChatMessage, EmbeddingProvider, GenerationParams, GenerationProvider};
use crate::Result;

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Retries transient provider failures with exponential backoff.
///
/// Permanent failures (client errors, malformed responses) are returned
/// after the first attempt, unmodified.
#[derive(Debug, Clone)]
pub struct Retrying<P> {
    inner: P,
    attempts: u32,
    base_delay: Duration,
}

impl<P> Retrying<P> {
    #[inline]
    pub fn new(inner: P, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    #[inline]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[inline]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn run<T, F>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            debug!("{} attempt {}/{}", operation, attempt, self.attempts);

            match call() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.base_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                    warn!(
                        "{} failed ({}), attempt {}/{}; retrying in {:?}",
                        operation, e, attempt, self.attempts, delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        error!("{} failed after {} attempts: {}", operation, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for Retrying<P> {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run("Embedding request", || self.inner.embed(text))
    }
}

impl<P: GenerationProvider> GenerationProvider for Retrying<P> {
    #[inline]
    fn generate(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String> {
        self.run("Chat completion", || self.inner.generate(messages, params))
    }
}
