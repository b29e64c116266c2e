use clap::{Parser, Subcommand, ValueEnum};
use docqa_core::{
    accept_upload, discover_supported_files, AnswerService, ChunkIndex, Document,
    DocumentRegistry, DocumentStatus, EmbeddingIndex, GeminiGenerator, HashedTrigramEmbedder,
    IngestionOptions, IngestionOrchestrator, KeywordOverlapIndex, OcrConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Retrieval backend; keyword needs no model, vector embeds locally.
    #[arg(long, value_enum, default_value = "keyword")]
    backend: Backend,

    /// Directory where accepted uploads are stored, keyed by document id.
    #[arg(long, default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 2_000)]
    max_chunk_chars: usize,

    /// Overlap carried between consecutive chunks, in characters.
    #[arg(long, default_value_t = 200)]
    overlap_chars: usize,

    /// Page cap for oversized PDFs.
    #[arg(long, default_value_t = 50)]
    max_pages: usize,

    /// Chunks per index insertion batch.
    #[arg(long, default_value_t = 10)]
    index_batch_size: usize,

    /// OCR endpoint for raster images; without it, image uploads fail.
    #[arg(long, env = "DOCQA_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    #[arg(long, env = "DOCQA_OCR_API_KEY")]
    ocr_api_key: Option<String>,

    /// Generative model endpoint (a generateContent-style URL).
    #[arg(
        long,
        env = "DOCQA_LLM_ENDPOINT",
        default_value = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
    )]
    llm_endpoint: String,

    #[arg(long, env = "GEMINI_API_KEY")]
    llm_api_key: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Keyword,
    Vector,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a file or a folder of files and report per-document outcomes.
    Ingest {
        /// PDF or image file, or a folder scanned recursively.
        #[arg(long)]
        path: PathBuf,
    },
    /// Ingest, then run a retrieval-only search and print ranked chunks.
    Search {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Ingest, then answer a question grounded in the retrieved chunks.
    Ask {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        question: String,
    },
    /// Ingest, then generate study flashcards for the first document.
    Flashcards {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// Optional topic to focus the cards on.
        #[arg(long)]
        topic: Option<String>,
    },
    /// Ingest, then summarize the first document.
    Summarize {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 500)]
        max_words: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %chrono::Utc::now().to_rfc3339(),
        "docqa boot"
    );

    let registry = Arc::new(DocumentRegistry::new());
    let index: Arc<dyn ChunkIndex> = match cli.backend {
        Backend::Keyword => Arc::new(KeywordOverlapIndex::new()),
        Backend::Vector => Arc::new(EmbeddingIndex::new(HashedTrigramEmbedder::default())),
    };

    let ocr = match &cli.ocr_endpoint {
        Some(endpoint) => Some(
            OcrConfig::new(endpoint.clone(), cli.ocr_api_key.clone())
                .map_err(|error| anyhow::anyhow!(error.to_string()))?,
        ),
        None => None,
    };

    let options = IngestionOptions {
        max_chunk_chars: cli.max_chunk_chars,
        overlap_chars: cli.overlap_chars,
        max_pages: cli.max_pages,
        index_batch_size: cli.index_batch_size,
    };
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&index),
        ocr,
        options,
    ));

    match &cli.command {
        Command::Ingest { path } => {
            let documents = ingest_path(&registry, &orchestrator, &cli.uploads_dir, path).await?;
            for document in documents {
                report_document(&registry, &document);
            }
        }
        Command::Search { path, query, top_k } => {
            ingest_path(&registry, &orchestrator, &cli.uploads_dir, path).await?;
            let hits = index
                .search(query, None, *top_k)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            if hits.is_empty() {
                println!("no matching chunks");
            }
            for (rank, hit) in hits.iter().enumerate() {
                let page = hit
                    .page_number
                    .map(|p| format!(" p.{p}"))
                    .unwrap_or_default();
                println!(
                    "{}. distance={:.4} doc={}{} :: {}",
                    rank + 1,
                    hit.distance,
                    hit.document_id,
                    page,
                    preview(&hit.content)
                );
            }
        }
        Command::Ask { path, question } => {
            ingest_path(&registry, &orchestrator, &cli.uploads_dir, path).await?;
            let service = answer_service(&cli, Arc::clone(&registry), Arc::clone(&index))?;
            let answer = service
                .ask(question, None)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{}", answer.answer);
            for (rank, source) in answer.sources.iter().enumerate() {
                info!(
                    rank = rank + 1,
                    document_id = %source.document_id,
                    distance = source.distance,
                    "answer source"
                );
            }
        }
        Command::Flashcards { path, count, topic } => {
            let documents = ingest_path(&registry, &orchestrator, &cli.uploads_dir, path).await?;
            let document = first_ready(&documents)?;
            let service = answer_service(&cli, Arc::clone(&registry), Arc::clone(&index))?;
            let cards = service
                .flashcards(&document.id, *count, topic.as_deref())
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for card in cards {
                println!("{}", card.front);
                println!("{}", card.back);
                println!();
            }
        }
        Command::Summarize { path, max_words } => {
            let documents = ingest_path(&registry, &orchestrator, &cli.uploads_dir, path).await?;
            let document = first_ready(&documents)?;
            let service = answer_service(&cli, Arc::clone(&registry), Arc::clone(&index))?;
            let summary = service
                .summarize(&document.id, *max_words)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{summary}");
        }
    }

    Ok(())
}

/// Upload every supported file under `path` and wait for all ingestion runs
/// to finish. Unsupported or unreadable files are skipped with a warning.
async fn ingest_path(
    registry: &Arc<DocumentRegistry>,
    orchestrator: &Arc<IngestionOrchestrator>,
    uploads_dir: &Path,
    path: &Path,
) -> anyhow::Result<Vec<Document>> {
    let files = if path.is_dir() {
        discover_supported_files(path)
    } else {
        vec![path.to_path_buf()]
    };
    if files.is_empty() {
        anyhow::bail!("no supported files found under {}", path.display());
    }

    let mut accepted = Vec::new();
    let mut handles = Vec::new();
    for file in files {
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(path = %file.display(), error = %error, "skipping unreadable file");
                continue;
            }
        };
        match accept_upload(registry, orchestrator, uploads_dir, &filename, &bytes) {
            Ok((document, handle)) => {
                info!(document_id = %document.id, filename = %document.filename, "upload accepted");
                accepted.push(document.id);
                handles.push(handle);
            }
            Err(error) => warn!(path = %file.display(), error = %error, "skipping file"),
        }
    }

    for handle in handles {
        handle.await?;
    }

    Ok(accepted
        .iter()
        .filter_map(|id| registry.get(id))
        .collect())
}

fn answer_service(
    cli: &Cli,
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn ChunkIndex>,
) -> anyhow::Result<AnswerService<GeminiGenerator>> {
    let api_key = cli
        .llm_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not configured"))?;
    let generator = GeminiGenerator::new(cli.llm_endpoint.clone(), api_key)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    Ok(AnswerService::new(registry, index, generator))
}

fn first_ready(documents: &[Document]) -> anyhow::Result<&Document> {
    documents
        .iter()
        .find(|document| document.status == DocumentStatus::Ready)
        .ok_or_else(|| anyhow::anyhow!("no document finished ingestion successfully"))
}

/// First line of a chunk, clipped to a terminal-friendly width.
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(120).collect();
    if preview.len() < line.len() {
        preview.push_str("...");
    }
    preview
}

fn report_document(registry: &DocumentRegistry, document: &Document) {
    let chunk_count = registry.list_chunks(&document.id).len();
    match document.status {
        DocumentStatus::Error => println!(
            "{} {} status={} message={}",
            document.id,
            document.filename,
            document.status,
            document.error_message.as_deref().unwrap_or("unknown"),
        ),
        _ => println!(
            "{} {} status={} index={:?} chunks={}",
            document.id, document.filename, document.status, document.index_status, chunk_count,
        ),
    }
}
