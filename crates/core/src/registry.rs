use crate::models::{Document, DocumentChunk, DocumentStatus, IndexStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    documents: HashMap<String, Document>,
    chunks: HashMap<String, Vec<DocumentChunk>>,
}

/// Process-wide store of document metadata and per-document chunk lists.
///
/// Constructed once at the composition root and shared via `Arc`; the lock
/// serializes writes while reads stay concurrent.
#[derive(Default)]
pub struct DocumentRegistry {
    state: RwLock<RegistryState>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly stored upload. Storage happens synchronously before
    /// any background work, so the document starts out `Processing`.
    pub fn register(
        &self,
        id: impl Into<String>,
        filename: impl Into<String>,
        file_path: impl Into<String>,
        checksum: Option<String>,
    ) -> Document {
        let now = Utc::now();
        let document = Document {
            id: id.into(),
            filename: filename.into(),
            file_path: file_path.into(),
            status: DocumentStatus::Processing,
            index_status: IndexStatus::Pending,
            created_at: now,
            updated_at: now,
            error_message: None,
            checksum,
        };

        let mut state = self.state.write().expect("registry lock poisoned");
        state
            .documents
            .insert(document.id.clone(), document.clone());
        document
    }

    pub fn get(&self, document_id: &str) -> Option<Document> {
        let state = self.state.read().expect("registry lock poisoned");
        state.documents.get(document_id).cloned()
    }

    pub fn list_all(&self) -> Vec<Document> {
        let state = self.state.read().expect("registry lock poisoned");
        let mut documents: Vec<Document> = state.documents.values().cloned().collect();
        documents.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        documents
    }

    pub fn set_status(
        &self,
        document_id: &str,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Option<Document> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let document = state.documents.get_mut(document_id)?;
        document.status = status;
        document.updated_at = Utc::now();
        if error_message.is_some() {
            document.error_message = error_message;
        }
        Some(document.clone())
    }

    /// Store the full chunk list for a document and transition it to
    /// `Ready` in the same operation. This is the only place the `Ready`
    /// transition happens; callers that need a later `Error` status must
    /// set it after this call, not before.
    pub fn commit_chunks(&self, document_id: &str, chunks: Vec<DocumentChunk>) -> bool {
        let mut state = self.state.write().expect("registry lock poisoned");
        let Some(document) = state.documents.get_mut(document_id) else {
            return false;
        };
        document.status = DocumentStatus::Ready;
        document.updated_at = Utc::now();
        state.chunks.insert(document_id.to_string(), chunks);
        true
    }

    pub fn set_index_status(
        &self,
        document_id: &str,
        index_status: IndexStatus,
    ) -> Option<Document> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let document = state.documents.get_mut(document_id)?;
        document.index_status = index_status;
        document.updated_at = Utc::now();
        Some(document.clone())
    }

    /// Chunks for one document, in `chunk_index` order.
    pub fn list_chunks(&self, document_id: &str) -> Vec<DocumentChunk> {
        let state = self.state.read().expect("registry lock poisoned");
        state.chunks.get(document_id).cloned().unwrap_or_default()
    }
}
