use crate::error::SearchError;
use crate::models::{DocumentChunk, ScoredChunk};
use crate::traits::ChunkIndex;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct KeywordState {
    chunks: HashMap<String, DocumentChunk>,
    /// Insertion order, so equal scores rank deterministically.
    order: Vec<String>,
    by_document: HashMap<String, Vec<String>>,
}

/// Fallback retrieval backend with zero external dependencies.
///
/// No embeddings: a chunk qualifies when its lower-cased whitespace token
/// set intersects the query's, scored by the covered fraction of query
/// terms. Scores are reported as `distance = 1 − score` so ranking stays
/// comparable with the embedding backend's lower-is-better contract.
#[derive(Default)]
pub struct KeywordOverlapIndex {
    state: RwLock<KeywordState>,
}

impl KeywordOverlapIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn term_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ChunkIndex for KeywordOverlapIndex {
    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        let mut state = self.state.write().expect("keyword index lock poisoned");
        for chunk in chunks {
            if !state.chunks.contains_key(&chunk.id) {
                state.order.push(chunk.id.clone());
                state
                    .by_document
                    .entry(chunk.document_id.clone())
                    .or_default()
                    .push(chunk.id.clone());
            }
            state.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let query_terms = term_set(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state.read().expect("keyword index lock poisoned");
        let candidate_ids: Vec<String> = match document_id {
            Some(id) => state.by_document.get(id).cloned().unwrap_or_default(),
            None => state.order.clone(),
        };

        let mut scored: Vec<(f64, &DocumentChunk)> = Vec::new();
        for chunk_id in &candidate_ids {
            let Some(chunk) = state.chunks.get(chunk_id) else {
                continue;
            };
            let matching = term_set(&chunk.content)
                .intersection(&query_terms)
                .count();
            if matching > 0 {
                scored.push((matching as f64 / query_terms.len() as f64, chunk));
            }
        }

        scored.sort_by(|left, right| right.0.total_cmp(&left.0));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, chunk)| ScoredChunk {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                content: chunk.content.clone(),
                page_number: chunk.page_number,
                chunk_index: chunk.chunk_index,
                metadata: chunk.metadata.clone(),
                distance: 1.0 - score,
            })
            .collect())
    }
}
