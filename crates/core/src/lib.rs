pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod stores;
pub mod traits;
pub mod upload;

pub use answer::{Answer, AnswerService, Flashcard, GeminiGenerator, DEFAULT_CONTEXT_CHUNKS};
pub use chunking::{chunk_text, normalize_whitespace, ChunkingConfig};
pub use embeddings::{Embedder, HashedTrigramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{AnswerError, IngestError, SearchError};
pub use extractor::{ExtractedSegment, Extractor, OcrConfig};
pub use models::{
    ChunkMetadata, Document, DocumentChunk, DocumentStatus, IndexStatus, IngestionOptions,
    ScoredChunk, SourceKind,
};
pub use orchestrator::IngestionOrchestrator;
pub use registry::DocumentRegistry;
pub use stores::{EmbeddingIndex, KeywordOverlapIndex};
pub use traits::{ChunkIndex, TextGenerator};
pub use upload::{
    accept_upload, digest_file, discover_supported_files, store_upload, StoredUpload,
};
