// Remote model providers
// Embedding and chat-completion capabilities behind traits so the pipeline
// can run against fakes in tests

pub mod azure;
pub mod retry;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use azure::AzureOpenAiClient;
pub use retry::Retrying;

/// Turns text into a fixed-length vector.
///
/// Every vector produced by one provider configuration has the same
/// dimension. Vectors from different configurations are not comparable.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces text from a chat transcript
pub trait GenerationProvider {
    fn generate(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

impl<P: GenerationProvider + ?Sized> GenerationProvider for &P {
    #[inline]
    fn generate(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String> {
        (**self).generate(messages, params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    #[inline]
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 512,
        }
    }
}
