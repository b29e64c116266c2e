use crate::chunking::normalize_whitespace;
use crate::error::IngestError;
use crate::models::SourceKind;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// One extracted unit of text: a PDF page, or the whole recognized text of
/// an image. Text is whitespace-normalized and never empty.
#[derive(Debug, Clone)]
pub struct ExtractedSegment {
    pub text: String,
    pub page_number: Option<u32>,
    pub total_pages: Option<u32>,
}

/// Where to send raster images for optical character recognition.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl OcrConfig {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, IngestError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self { endpoint, api_key })
    }
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    image_base64: String,
    source_path: String,
    /// Fully automatic page segmentation, the mode suited for whole
    /// scanned pages rather than single lines.
    segmentation: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    text: Option<String>,
}

/// Converts a stored file into text segments, branching on file kind.
pub struct Extractor {
    max_pages: usize,
    ocr: Option<OcrConfig>,
}

impl Extractor {
    pub fn new(max_pages: usize, ocr: Option<OcrConfig>) -> Self {
        Self { max_pages, ocr }
    }

    /// Extract text for one stored file. An `Ok` with no segments means the
    /// source genuinely carried no text; the caller decides what that means.
    pub fn extract(
        &self,
        path: &Path,
        kind: SourceKind,
    ) -> Result<Vec<ExtractedSegment>, IngestError> {
        match kind {
            SourceKind::Pdf => self.extract_pdf(path),
            SourceKind::Image => self.extract_image(path),
        }
    }

    fn extract_pdf(&self, path: &Path) -> Result<Vec<ExtractedSegment>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        if page_numbers.len() > self.max_pages {
            tracing::warn!(
                path = %path.display(),
                total_pages,
                max_pages = self.max_pages,
                "page cap reached, extracting leading pages only"
            );
        }

        let mut segments = Vec::new();
        for page_number in page_numbers.into_iter().take(self.max_pages) {
            let raw = document
                .extract_text(&[page_number])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            let text = normalize_whitespace(&raw);
            if text.is_empty() {
                continue;
            }

            segments.push(ExtractedSegment {
                text,
                page_number: Some(page_number),
                total_pages: Some(total_pages),
            });
        }

        Ok(segments)
    }

    fn extract_image(&self, path: &Path) -> Result<Vec<ExtractedSegment>, IngestError> {
        let config = self.ocr.as_ref().ok_or(IngestError::OcrNotConfigured)?;

        let recognized = recognize_image_text(config, path)?;
        let text = normalize_whitespace(&recognized);
        if text.is_empty() {
            // An image with no recognizable text is not an extraction error.
            return Ok(Vec::new());
        }

        Ok(vec![ExtractedSegment {
            text,
            page_number: None,
            total_pages: None,
        }])
    }
}

fn recognize_image_text(config: &OcrConfig, path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(IngestError::Io)?;
    let payload = OcrRequest {
        image_base64: STANDARD.encode(bytes),
        source_path: path.to_string_lossy().to_string(),
        segmentation: "full-page-auto",
    };

    let mut request = Client::new()
        .post(&config.endpoint)
        .header("content-type", "application/json")
        .json(&payload);

    if let Some(api_key) = &config.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send()?;
    if !response.status().is_success() {
        return Err(IngestError::OcrFailed(format!(
            "ocr request to {} returned {}",
            config.endpoint,
            response.status()
        )));
    }

    let parsed: OcrResponse = response.json()?;
    Ok(parsed.text.unwrap_or_default())
}
