use crate::error::{AnswerError, SearchError};
use crate::models::{DocumentChunk, ScoredChunk};
use async_trait::async_trait;

/// A pluggable store of chunks supporting similarity lookup. The backend is
/// a static configuration choice made once at the composition root.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), SearchError>;

    /// Ranked chunks for `query`, most relevant first (ascending distance).
    /// A `document_id` filter restricts candidates to that document. A query
    /// matching nothing returns an empty list, never an error.
    async fn search(
        &self,
        query: &str,
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError>;
}

/// The generative model behind answers, flashcards, and summaries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError>;
}
