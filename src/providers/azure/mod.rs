
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{ChatMessage, EmbeddingProvider, GenerationParams, GenerationProvider};
use crate::config::ProviderConfig;
use crate::{FaqError, Result};

/// Azure OpenAI REST client for one embedding and one chat deployment.
///
/// Calls are blocking and make exactly one attempt. Wrap the client in
/// [`super::Retrying`] to retry transient failures.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    embeddings_url: Url,
    chat_url: Url,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Error envelope returned by Azure OpenAI on non-success responses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: String,
}

/// Outcome of a completed HTTP exchange
struct RawResponse {
    status: u16,
    body: String,
}

impl AzureOpenAiClient {
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let embeddings_url = config
            .embeddings_url()
            .map_err(|e| FaqError::Config(e.to_string()))?;
        let chat_url = config
            .chat_url()
            .map_err(|e| FaqError::Config(e.to_string()))?;
        let api_key = config
            .require_api_key()
            .map_err(|e| FaqError::Config(e.to_string()))?
            .to_string();

        Ok(Self {
            embeddings_url,
            chat_url,
            api_key,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    fn post_json(&self, url: &Url, body: &str) -> std::result::Result<RawResponse, ureq::Error> {
        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("api-key", &self.api_key)
            .send(body)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok(RawResponse { status, body })
    }
}

impl EmbeddingProvider for AzureOpenAiClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding for text (length: {})", text.len());

        let service_error = |status: Option<u16>, message: String| FaqError::EmbeddingService {
            status,
            message,
        };

        let request = serde_json::to_string(&EmbeddingRequest { input: text })
            .map_err(|e| service_error(None, format!("Failed to serialize request: {}", e)))?;

        let response = self
            .post_json(&self.embeddings_url, &request)
            .map_err(|e| service_error(None, e.to_string()))?;

        if !(200..300).contains(&response.status) {
            warn!("Embedding request failed with HTTP {}", response.status);
            return Err(service_error(
                Some(response.status),
                error_message(&response.body),
            ));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&response.body).map_err(|e| {
            service_error(
                Some(response.status),
                format!("Unexpected embedding response: {}", e),
            )
        })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| {
                service_error(
                    Some(response.status),
                    "Embedding response contained no vector".to_string(),
                )
            })?;

        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl GenerationProvider for AzureOpenAiClient {
    #[inline]
    fn generate(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String> {
        debug!(
            "Requesting chat completion ({} messages, temperature {}, max_tokens {})",
            messages.len(),
            params.temperature,
            params.max_tokens
        );

        let service_error = |status: Option<u16>, message: String| FaqError::GenerationService {
            status,
            message,
        };

        let request = serde_json::to_string(&ChatRequest {
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        })
        .map_err(|e| service_error(None, format!("Failed to serialize request: {}", e)))?;

        let response = self
            .post_json(&self.chat_url, &request)
            .map_err(|e| service_error(None, e.to_string()))?;

        if !(200..300).contains(&response.status) {
            warn!("Chat completion failed with HTTP {}", response.status);
            return Err(service_error(
                Some(response.status),
                error_message(&response.body),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&response.body).map_err(|e| {
            service_error(
                Some(response.status),
                format!("Unexpected chat completion response: {}", e),
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                service_error(
                    Some(response.status),
                    "Chat completion contained no message content".to_string(),
                )
            })
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Prefer the provider's structured message, fall back to the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorDetail {
                code: Some(code),
                message,
            },
        }) => format!("{}: {}", code, message),
        Ok(ErrorResponse { error }) => error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
