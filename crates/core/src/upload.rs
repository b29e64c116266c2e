use crate::error::IngestError;
use crate::models::{Document, SourceKind};
use crate::orchestrator::IngestionOrchestrator;
use crate::registry::DocumentRegistry;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

/// Result of persisting one upload into the flat, id-keyed uploads layout.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub document_id: String,
    pub file_path: PathBuf,
    pub checksum: String,
}

/// Persist raw upload bytes as `<uploads_dir>/<document_id>.<ext>`.
///
/// Unsupported extensions are rejected before anything touches disk.
pub fn store_upload(
    uploads_dir: &Path,
    original_filename: &str,
    bytes: &[u8],
) -> Result<StoredUpload, IngestError> {
    let original = Path::new(original_filename);
    if SourceKind::from_path(original).is_none() {
        return Err(IngestError::UnsupportedFormat(
            extension_label(original_filename),
        ));
    }
    let extension = original
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| IngestError::MissingFileName(original_filename.to_string()))?
        .to_ascii_lowercase();

    fs::create_dir_all(uploads_dir)?;

    let document_id = Uuid::new_v4().to_string();
    let file_path = uploads_dir.join(format!("{document_id}.{extension}"));
    fs::write(&file_path, bytes)?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);

    Ok(StoredUpload {
        document_id,
        file_path,
        checksum: format!("{:x}", hasher.finalize()),
    })
}

/// The whole upload-handler contract in one call: persist the file, register
/// the document as `Processing`, and kick off the ingestion run in the
/// background. The caller gets the accepted document immediately; the join
/// handle is only there for tests and orderly shutdown.
pub fn accept_upload(
    registry: &DocumentRegistry,
    orchestrator: &Arc<IngestionOrchestrator>,
    uploads_dir: &Path,
    original_filename: &str,
    bytes: &[u8],
) -> Result<(Document, tokio::task::JoinHandle<()>), IngestError> {
    let stored = store_upload(uploads_dir, original_filename, bytes)?;
    let document = registry.register(
        stored.document_id.clone(),
        original_filename,
        stored.file_path.to_string_lossy(),
        Some(stored.checksum),
    );
    let handle = orchestrator.spawn(stored.document_id, stored.file_path);
    Ok((document, handle))
}

/// `".pdf"`-style label for error messages, or the raw name when there is
/// no extension at all.
pub fn extension_label(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| filename.to_string())
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// All supported files under `folder`, recursively, in a stable order.
pub fn discover_supported_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if SourceKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}
