use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("ocr endpoint not configured")]
    OcrNotConfigured,

    #[error("no content extracted from document")]
    NoContent,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("search request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("document has no stored content: {0}")]
    NoContent(String),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("model returned {status} from {endpoint}")]
    ModelStatus { endpoint: String, status: String },

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("model response has no usable text")]
    EmptyResponse,

    #[error("no flashcards parsed from model response")]
    UnparsableFlashcards,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
