// Answer module
// Confidence gate over the nearest match and paraphrase of its stored answer


use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnswerConfig;
use crate::corpus::FaqRecord;
use crate::providers::{ChatMessage, EmbeddingProvider, GenerationParams, GenerationProvider};
use crate::retrieval::{RetrievalContext, RetrievalHit, Retriever};
use crate::{FaqError, Result};

pub const SYSTEM_PROMPT: &str = "You are a helpful support assistant.";
pub const DEFAULT_LANGUAGE: &str = "English";

/// What the caller shows the user.
///
/// `source` is the matched corpus question, or `None` when the bot declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub source: Option<String>,
}

impl AnswerResponse {
    #[inline]
    pub fn is_decline(&self) -> bool {
        self.source.is_none()
    }
}

/// An answer plus the neighbors that were considered for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerWithRelated {
    #[serde(flatten)]
    pub response: AnswerResponse,
    pub related: Vec<RetrievalHit>,
}

pub struct AnswerSynthesizer<E, G> {
    retriever: Retriever<E>,
    generator: G,
    settings: AnswerConfig,
}

impl<E, G> AnswerSynthesizer<E, G>
where
    E: EmbeddingProvider,
    G: GenerationProvider,
{
    #[inline]
    pub fn new(embedder: E, generator: G, settings: AnswerConfig) -> Self {
        Self {
            retriever: Retriever::new(embedder),
            generator,
            settings,
        }
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    #[inline]
    pub fn settings(&self) -> &AnswerConfig {
        &self.settings
    }

    /// Answer `query` in `language` from the single nearest corpus entry
    #[inline]
    pub fn answer(
        &self,
        ctx: &RetrievalContext,
        query: &str,
        language: &str,
    ) -> Result<AnswerResponse> {
        let hits = self.retriever.retrieve(ctx, query, 1)?;
        self.respond(ctx, query, language, hits.first())
    }

    /// Like [`Self::answer`], also returning up to `k` neighbors from the same search
    #[inline]
    pub fn answer_with_related(
        &self,
        ctx: &RetrievalContext,
        query: &str,
        language: &str,
        k: usize,
    ) -> Result<AnswerWithRelated> {
        let related = self.retriever.retrieve(ctx, query, k.max(1))?;
        let response = self.respond(ctx, query, language, related.first())?;
        Ok(AnswerWithRelated { response, related })
    }

    fn respond(
        &self,
        ctx: &RetrievalContext,
        query: &str,
        language: &str,
        top: Option<&RetrievalHit>,
    ) -> Result<AnswerResponse> {
        let Some(top) = top else {
            return Err(FaqError::EmptyIndex);
        };

        if !self.is_confident(top.distance) {
            info!(
                "Declining: nearest distance {} exceeds threshold {}",
                top.distance, self.settings.confidence_threshold
            );
            return Ok(self.decline());
        }

        let record = ctx.record(top.position).ok_or_else(|| {
            FaqError::ArtifactMismatch(format!(
                "index position {} has no metadata record",
                top.position
            ))
        })?;
        debug!(
            "Matched '{}' at distance {}",
            record.question, top.distance
        );

        let messages = build_prompt(query, record, language);
        let params = GenerationParams {
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        match self.generator.generate(&messages, &params) {
            Ok(reply) => Ok(AnswerResponse {
                answer: reply.trim().to_string(),
                source: Some(record.question.clone()),
            }),
            Err(e) if self.settings.fallback_to_stored_answer && e.is_service_failure() => {
                warn!("Generation failed ({}); returning the stored answer", e);
                Ok(AnswerResponse {
                    answer: record.answer.clone(),
                    source: Some(record.question.clone()),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Distances at the threshold still count as a match
    #[inline]
    pub fn is_confident(&self, distance: f32) -> bool {
        distance <= self.settings.confidence_threshold
    }

    #[inline]
    pub fn decline(&self) -> AnswerResponse {
        AnswerResponse {
            answer: self.settings.decline_message.clone(),
            source: None,
        }
    }
}

/// System instruction plus a user turn carrying the query, the matched
/// pair and the requested language
#[inline]
pub fn build_prompt(query: &str, matched: &FaqRecord, language: &str) -> Vec<ChatMessage> {
    let language = if language.trim().is_empty() {
        DEFAULT_LANGUAGE
    } else {
        language.trim()
    };

    let user = format!(
        "User question: {}\n\n\
         Known Q&A: {} → {}\n\n\
         Please answer in a friendly and clear tone in this language: {}.",
        query, matched.question, matched.answer, language
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
