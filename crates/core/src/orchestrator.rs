use crate::chunking::{chunk_text, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::{ExtractedSegment, Extractor, OcrConfig};
use crate::models::{
    ChunkMetadata, DocumentChunk, DocumentStatus, IndexStatus, IngestionOptions, SourceKind,
};
use crate::registry::DocumentRegistry;
use crate::traits::ChunkIndex;
use crate::upload::extension_label;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Drives one document from stored file to terminal status:
/// extract → chunk → commit to the registry → batch-insert into the index.
pub struct IngestionOrchestrator {
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn ChunkIndex>,
    extractor: Extractor,
    options: IngestionOptions,
}

impl IngestionOrchestrator {
    pub fn new(
        registry: Arc<DocumentRegistry>,
        index: Arc<dyn ChunkIndex>,
        ocr: Option<OcrConfig>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            registry,
            index,
            extractor: Extractor::new(options.max_pages, ocr),
            options,
        }
    }

    /// One complete ingestion run. Failures never reach the caller; every
    /// outcome lands in the document's registry entry.
    pub async fn run(&self, document_id: &str, file_path: &Path) {
        self.registry
            .set_status(document_id, DocumentStatus::Processing, None);

        if let Err(error) = self.run_inner(document_id, file_path).await {
            tracing::error!(document_id, error = %error, "ingestion run failed");
            self.registry
                .set_status(document_id, DocumentStatus::Error, Some(error.to_string()));
        }
    }

    /// Fire-and-forget run, the upload handler's calling convention. The
    /// handle is returned so tests and shutdown paths can still await it.
    pub fn spawn(self: &Arc<Self>, document_id: String, file_path: PathBuf) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(&document_id, &file_path).await })
    }

    async fn run_inner(&self, document_id: &str, file_path: &Path) -> Result<(), IngestError> {
        let Some(kind) = SourceKind::from_path(file_path) else {
            return Err(IngestError::UnsupportedFormat(extension_label(
                &file_path.to_string_lossy(),
            )));
        };

        // Extraction failures are logged and degrade to an empty segment
        // list; the no-content guard below turns both cases into the same
        // terminal error.
        let extracted =
            tokio::task::block_in_place(|| self.extractor.extract(file_path, kind));
        let segments = match extracted {
            Ok(segments) => segments,
            Err(error) => {
                tracing::error!(document_id, error = %error, "extraction failed");
                Vec::new()
            }
        };

        let chunks = self.materialize_chunks(document_id, file_path, kind, &segments)?;
        if chunks.is_empty() {
            return Err(IngestError::NoContent);
        }
        tracing::info!(document_id, chunk_count = chunks.len(), "extracted chunks");

        // Registry first: the commit is also the `Ready` transition.
        self.registry.commit_chunks(document_id, chunks.clone());

        let index_status = self.index_chunks(document_id, &chunks).await;
        self.registry.set_index_status(document_id, index_status);
        Ok(())
    }

    /// Split segments and assign chunk identity: fresh ids and a gap-free
    /// document-wide ordinal, in extraction order.
    fn materialize_chunks(
        &self,
        document_id: &str,
        file_path: &Path,
        kind: SourceKind,
        segments: &[ExtractedSegment],
    ) -> Result<Vec<DocumentChunk>, IngestError> {
        let config = ChunkingConfig::from(self.options);
        let filename = match kind {
            SourceKind::Image => file_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
            SourceKind::Pdf => None,
        };

        let mut chunks = Vec::new();
        let mut ordinal = 0u64;
        for segment in segments {
            for content in chunk_text(&segment.text, config)? {
                if content.trim().is_empty() {
                    continue;
                }
                chunks.push(DocumentChunk {
                    id: Uuid::new_v4().to_string(),
                    document_id: document_id.to_string(),
                    content,
                    page_number: segment.page_number,
                    chunk_index: ordinal,
                    metadata: ChunkMetadata {
                        source: Some(kind),
                        page: segment.page_number,
                        total_pages: segment.total_pages,
                        filename: filename.clone(),
                    },
                });
                ordinal += 1;
            }
        }
        Ok(chunks)
    }

    /// Best-effort, at-most-once batch insertion. A failed batch is logged
    /// and skipped, never retried; remaining batches still go in.
    async fn index_chunks(&self, document_id: &str, chunks: &[DocumentChunk]) -> IndexStatus {
        let batch_size = self.options.index_batch_size.max(1);
        let mut failed_batches = 0usize;
        let mut total_batches = 0usize;

        for (batch_number, batch) in chunks.chunks(batch_size).enumerate() {
            total_batches += 1;
            if let Err(error) = self.index.add_chunks(batch).await {
                failed_batches += 1;
                tracing::warn!(
                    document_id,
                    batch_number,
                    batch_len = batch.len(),
                    error = %error,
                    "chunk batch failed to index"
                );
            }
        }

        if failed_batches == 0 {
            IndexStatus::Full
        } else if failed_batches == total_batches {
            IndexStatus::Failed
        } else {
            IndexStatus::Partial
        }
    }
}
