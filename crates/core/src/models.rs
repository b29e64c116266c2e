use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Lifecycle of one ingestion run. Transitions are forward-only, except
/// `Error`, which is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Ready | DocumentStatus::Error)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Secondary indexing outcome for a document. A document can be `Ready`
/// while some chunk batches never reached the chunk index; this field makes
/// that gap observable instead of hiding it in the lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Pending,
    Full,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub status: DocumentStatus,
    pub index_status: IndexStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub checksum: Option<String>,
}

/// Kind of source file, derived from the upload's extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
}

impl SourceKind {
    /// Classify a path by extension; `None` means the format is unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str())?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(SourceKind::Image),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChunkMetadata {
    pub source: Option<SourceKind>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub chunk_index: u64,
    pub metadata: ChunkMetadata,
}

/// One ranked hit from a chunk index. `distance` is ascending: lower means
/// more relevant, regardless of the backend that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub chunk_index: u64,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
    pub max_pages: usize,
    pub index_batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: 2_000,
            overlap_chars: 200,
            max_pages: 50,
            index_batch_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_ignores_extension_case() {
        assert_eq!(SourceKind::from_path(Path::new("a.PDF")), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_path(Path::new("b.JpEg")), Some(SourceKind::Image));
        assert_eq!(SourceKind::from_path(Path::new("c.docx")), None);
        assert_eq!(SourceKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn ready_and_error_are_terminal() {
        assert!(DocumentStatus::Ready.is_terminal());
        assert!(DocumentStatus::Error.is_terminal());
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(!DocumentStatus::Pending.is_terminal());
    }
}
