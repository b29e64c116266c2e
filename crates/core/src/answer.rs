use crate::error::AnswerError;
use crate::models::ScoredChunk;
use crate::registry::DocumentRegistry;
use crate::traits::{ChunkIndex, TextGenerator};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

/// Chunks retrieved per question.
pub const DEFAULT_CONTEXT_CHUNKS: usize = 5;
/// Stored-chunk prefix fed to the model, bounded by its input limits.
const FLASHCARD_CONTEXT_CHUNKS: usize = 10;
const SUMMARY_CONTEXT_CHUNKS: usize = 15;

const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find any relevant information to answer your question.";
const DEGRADED_ANSWER: &str =
    "I encountered an error while trying to answer your question. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Answers questions, builds flashcards, and summarizes documents by
/// pairing retrieval with a generative model. Retrieval goes through the
/// chunk index; flashcards and summaries read the registry's chunk lists
/// directly.
pub struct AnswerService<G: TextGenerator> {
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn ChunkIndex>,
    generator: G,
}

impl<G: TextGenerator> AnswerService<G> {
    pub fn new(registry: Arc<DocumentRegistry>, index: Arc<dyn ChunkIndex>, generator: G) -> Self {
        Self {
            registry,
            index,
            generator,
        }
    }

    /// Answer a question from retrieved context. No relevant chunks means
    /// no model call at all; a model failure degrades to a best-effort
    /// apology rather than an error.
    pub async fn ask(
        &self,
        question: &str,
        document_id: Option<&str>,
    ) -> Result<Answer, AnswerError> {
        let sources = self
            .index
            .search(question, document_id, DEFAULT_CONTEXT_CHUNKS)
            .await?;

        if sources.is_empty() {
            return Ok(Answer {
                question: question.to_string(),
                answer: NO_RELEVANT_INFORMATION.to_string(),
                sources,
            });
        }

        let prompt = answer_prompt(question, &sources);
        let answer = match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => DEGRADED_ANSWER.to_string(),
            Err(error) => {
                tracing::warn!(error = %error, "answer generation failed");
                DEGRADED_ANSWER.to_string()
            }
        };

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
        })
    }

    /// Generate up to `count` flashcards from a document's stored chunks.
    /// A response with no parsable `Q:`/`A:` pairs is a hard failure.
    pub async fn flashcards(
        &self,
        document_id: &str,
        count: usize,
        topic: Option<&str>,
    ) -> Result<Vec<Flashcard>, AnswerError> {
        let content = self.document_content(document_id, FLASHCARD_CONTEXT_CHUNKS)?;
        let prompt = flashcard_prompt(&content, count, topic);
        let response = self.generator.generate(&prompt).await?;

        let cards = parse_flashcards(&response)?;
        if cards.is_empty() {
            return Err(AnswerError::UnparsableFlashcards);
        }
        Ok(cards.into_iter().take(count).collect())
    }

    /// Summarize a document's stored chunks in about `max_words` words.
    pub async fn summarize(
        &self,
        document_id: &str,
        max_words: usize,
    ) -> Result<String, AnswerError> {
        let content = self.document_content(document_id, SUMMARY_CONTEXT_CHUNKS)?;
        let prompt = summary_prompt(&content, max_words);
        let summary = self.generator.generate(&prompt).await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AnswerError::EmptyResponse);
        }
        Ok(summary.to_string())
    }

    fn document_content(&self, document_id: &str, max_chunks: usize) -> Result<String, AnswerError> {
        if self.registry.get(document_id).is_none() {
            return Err(AnswerError::DocumentNotFound(document_id.to_string()));
        }
        let chunks = self.registry.list_chunks(document_id);
        if chunks.is_empty() {
            return Err(AnswerError::NoContent(document_id.to_string()));
        }
        Ok(chunks
            .iter()
            .take(max_chunks)
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

fn answer_prompt(question: &str, sources: &[ScoredChunk]) -> String {
    let context = sources
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question using only the information in the context below. \
         If the context doesn't contain the answer, acknowledge that you don't \
         have enough information.\n\nCONTEXT:\n{context}\n\nQUESTION: {question}\n"
    )
}

fn flashcard_prompt(content: &str, count: usize, topic: Option<&str>) -> String {
    let topic_str = topic.map(|t| format!(" about {t}")).unwrap_or_default();
    format!(
        "Generate {count} study flashcards{topic_str} based on the following content.\n\
         Each flashcard should be in the format: Q: ... A: ...\n\
         Focus on key concepts, definitions, and important facts.\n\
         Return only the flashcards, no explanations or extra text.\n\
         CONTENT:\n{content}\n"
    )
}

fn summary_prompt(content: &str, max_words: usize) -> String {
    format!(
        "Summarize the following content in about {max_words} words.\n\
         Focus on the main points, key concepts, and important details.\n\
         The summary should be concise, coherent, and well-structured.\n\
         CONTENT:\n{content}\n"
    )
}

/// Pull `Q: ... A: ...` pairs out of a model response.
fn parse_flashcards(response: &str) -> Result<Vec<Flashcard>, AnswerError> {
    let question_marker = Regex::new(r"(?i)\bQ:")?;
    let answer_marker = Regex::new(r"(?i)\bA:")?;

    let mut cards = Vec::new();
    for block in question_marker.split(response) {
        let Some(marker) = answer_marker.find(block) else {
            continue;
        };
        let front = block[..marker.start()].trim();
        let back = block[marker.end()..].trim();
        if front.is_empty() || back.is_empty() {
            continue;
        }
        cards.push(Flashcard {
            front: format!("Q: {front}"),
            back: format!("A: {back}"),
        });
    }
    Ok(cards)
}

/// Gemini `generateContent` client. The endpoint is the full model URL;
/// the key travels as a query parameter, per the API's convention.
pub struct GeminiGenerator {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AnswerError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnswerError::ModelStatus {
                endpoint: self.endpoint.clone(),
                status: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let text = parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AnswerError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
