use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{DocumentChunk, ScoredChunk};
use crate::traits::ChunkIndex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

struct IndexedChunk {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

#[derive(Default)]
struct VectorState {
    chunks: HashMap<String, IndexedChunk>,
    order: Vec<String>,
    by_document: HashMap<String, Vec<String>>,
}

/// Embedding-backed retrieval backend. Chunk content is embedded once at
/// insertion time; queries are embedded on the fly and ranked by cosine
/// distance (`1 − cosine similarity`, lower is better).
pub struct EmbeddingIndex<E: Embedder> {
    embedder: E,
    state: RwLock<VectorState>,
}

impl<E: Embedder> EmbeddingIndex<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            state: RwLock::new(VectorState::default()),
        }
    }
}

fn cosine_distance(left: &[f32], right: &[f32]) -> Option<f64> {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return None;
    }
    Some(1.0 - f64::from(dot / (left_norm * right_norm)))
}

#[async_trait]
impl<E: Embedder> ChunkIndex for EmbeddingIndex<E> {
    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        let mut state = self.state.write().expect("embedding index lock poisoned");
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.content);
            if !state.chunks.contains_key(&chunk.id) {
                state.order.push(chunk.id.clone());
                state
                    .by_document
                    .entry(chunk.document_id.clone())
                    .or_default()
                    .push(chunk.id.clone());
            }
            state.chunks.insert(
                chunk.id.clone(),
                IndexedChunk {
                    chunk: chunk.clone(),
                    vector,
                },
            );
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let query_vector = self.embedder.embed(query);

        let state = self.state.read().expect("embedding index lock poisoned");
        let candidate_ids: Vec<String> = match document_id {
            Some(id) => state.by_document.get(id).cloned().unwrap_or_default(),
            None => state.order.clone(),
        };

        let mut scored: Vec<(f64, &DocumentChunk)> = Vec::new();
        for chunk_id in &candidate_ids {
            let Some(indexed) = state.chunks.get(chunk_id) else {
                continue;
            };
            if let Some(distance) = cosine_distance(&query_vector, &indexed.vector) {
                scored.push((distance, &indexed.chunk));
            }
        }

        scored.sort_by(|left, right| left.0.total_cmp(&right.0));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(distance, chunk)| ScoredChunk {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                content: chunk.content.clone(),
                page_number: chunk.page_number,
                chunk_index: chunk.chunk_index,
                metadata: chunk.metadata.clone(),
                distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedTrigramEmbedder;
    use crate::models::ChunkMetadata;

    fn chunk(id: &str, document_id: &str, content: &str) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            document_id: document_id.to_string(),
            content: content.to_string(),
            page_number: None,
            chunk_index: 0,
            metadata: ChunkMetadata::default(),
        }
    }

    fn index() -> EmbeddingIndex<HashedTrigramEmbedder> {
        EmbeddingIndex::new(HashedTrigramEmbedder::default())
    }

    #[tokio::test]
    async fn exact_text_has_near_zero_distance() {
        let index = index();
        index
            .add_chunks(&[
                chunk("c-1", "doc-a", "the krebs cycle produces ATP"),
                chunk("c-2", "doc-a", "rivers erode sedimentary rock"),
            ])
            .await
            .unwrap();

        let hits = index
            .search("the krebs cycle produces ATP", None, 2)
            .await
            .unwrap();
        assert_eq!(hits[0].chunk_id, "c-1");
        assert!(hits[0].distance < 1e-5);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn document_filter_scopes_candidates() {
        let index = index();
        index
            .add_chunks(&[
                chunk("c-1", "doc-a", "glucose metabolism"),
                chunk("c-2", "doc-b", "glucose metabolism"),
            ])
            .await
            .unwrap();

        let hits = index
            .search("glucose metabolism", Some("doc-b"), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "doc-b");
    }

    #[tokio::test]
    async fn too_short_query_returns_empty() {
        // Queries below trigram length embed to the zero vector, which has
        // no defined cosine distance to anything.
        let index = index();
        index
            .add_chunks(&[chunk("c-1", "doc-a", "some indexed content")])
            .await
            .unwrap();
        assert!(index.search("ab", None, 5).await.unwrap().is_empty());
    }
}
