use docqa_core::{
    accept_upload, ChunkIndex, DocumentRegistry, DocumentStatus, IndexStatus,
    IngestionOptions, IngestionOrchestrator, KeywordOverlapIndex,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Build a real PDF with one page per entry in `pages`. An empty entry
/// produces a page with no text at all.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let mut operations = Vec::new();
        if !text.is_empty() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 750.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save test pdf");
}

fn composition_root() -> (
    Arc<DocumentRegistry>,
    Arc<KeywordOverlapIndex>,
    Arc<IngestionOrchestrator>,
) {
    composition_root_with(IngestionOptions::default())
}

fn composition_root_with(
    options: IngestionOptions,
) -> (
    Arc<DocumentRegistry>,
    Arc<KeywordOverlapIndex>,
    Arc<IngestionOrchestrator>,
) {
    let registry = Arc::new(DocumentRegistry::new());
    let index = Arc::new(KeywordOverlapIndex::new());
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        Arc::clone(&registry),
        index.clone(),
        None,
        options,
    ));
    (registry, index, orchestrator)
}

#[tokio::test(flavor = "multi_thread")]
async fn text_bearing_pdf_ends_ready_and_searchable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    write_pdf(
        &path,
        &["Cells divide through mitosis. Osmosis moves water across membranes."],
    );

    let (registry, index, orchestrator) = composition_root();
    registry.register("doc-1", "biology.pdf", path.to_string_lossy(), None);
    orchestrator.run("doc-1", &path).await;

    let document = registry.get("doc-1").unwrap();
    assert_eq!(document.status, DocumentStatus::Ready);
    assert_eq!(document.index_status, IndexStatus::Full);
    assert!(document.error_message.is_none());

    let chunks = registry.list_chunks("doc-1");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].page_number, Some(1));
    assert!(chunks[0].content.contains("mitosis"));

    let hits = index.search("osmosis", Some("doc-1"), 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_id, "doc-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_pdf_ends_in_error_with_nothing_stored() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blank.pdf");
    write_pdf(&path, &[""]);

    let (registry, index, orchestrator) = composition_root();
    registry.register("doc-1", "blank.pdf", path.to_string_lossy(), None);
    orchestrator.run("doc-1", &path).await;

    let document = registry.get("doc-1").unwrap();
    assert_eq!(document.status, DocumentStatus::Error);
    assert!(document
        .error_message
        .as_deref()
        .unwrap()
        .contains("no content extracted"));

    assert!(registry.list_chunks("doc-1").is_empty());
    assert!(index.search("anything", None, 5).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_pages_are_skipped_but_later_pages_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sparse.pdf");
    write_pdf(&path, &["", "Photosynthesis happens in chloroplasts."]);

    let (registry, _index, orchestrator) = composition_root();
    registry.register("doc-1", "sparse.pdf", path.to_string_lossy(), None);
    orchestrator.run("doc-1", &path).await;

    let document = registry.get("doc-1").unwrap();
    assert_eq!(document.status, DocumentStatus::Ready);

    let chunks = registry.list_chunks("doc-1");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].page_number, Some(2));
    assert_eq!(chunks[0].chunk_index, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn page_cap_truncates_oversized_documents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("long.pdf");
    write_pdf(&path, &["First page text here.", "Second page text here."]);

    let options = IngestionOptions {
        max_pages: 1,
        ..IngestionOptions::default()
    };
    let (registry, _index, orchestrator) = composition_root_with(options);
    registry.register("doc-1", "long.pdf", path.to_string_lossy(), None);
    orchestrator.run("doc-1", &path).await;

    let document = registry.get("doc-1").unwrap();
    assert_eq!(document.status, DocumentStatus::Ready);

    let chunks = registry.list_chunks("doc-1");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].page_number, Some(1));
    assert_eq!(chunks[0].metadata.total_pages, Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn document_filters_isolate_searches_between_uploads() {
    let dir = tempdir().unwrap();
    let path_a = dir.path().join("a.pdf");
    let path_b = dir.path().join("b.pdf");
    write_pdf(&path_a, &["Gravity bends spacetime."]);
    write_pdf(&path_b, &["Gravity pulls apples down."]);

    let (registry, index, orchestrator) = composition_root();
    registry.register("doc-a", "a.pdf", path_a.to_string_lossy(), None);
    registry.register("doc-b", "b.pdf", path_b.to_string_lossy(), None);
    orchestrator.run("doc-a", &path_a).await;
    orchestrator.run("doc-b", &path_b).await;

    let hits = index.search("gravity", Some("doc-a"), 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits.iter().all(|hit| hit.document_id == "doc-a"));

    let unscoped = index.search("gravity", None, 5).await.unwrap();
    assert_eq!(unscoped.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn accepted_uploads_are_acknowledged_then_processed() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.pdf");
    write_pdf(&source, &["Enzymes lower activation energy."]);
    let bytes = std::fs::read(&source).unwrap();

    let uploads = dir.path().join("uploads");
    let (registry, _index, orchestrator) = composition_root();

    let (document, handle) =
        accept_upload(&registry, &orchestrator, &uploads, "lecture.pdf", &bytes).unwrap();
    assert_eq!(document.status, DocumentStatus::Processing);
    assert_eq!(document.filename, "lecture.pdf");
    assert!(document.checksum.is_some());

    handle.await.unwrap();

    let finished = registry.get(&document.id).unwrap();
    assert_eq!(finished.status, DocumentStatus::Ready);
    assert_eq!(registry.list_chunks(&document.id).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_uploads_never_reach_the_pipeline() {
    let dir = tempdir().unwrap();
    let (registry, _index, orchestrator) = composition_root();

    let result = accept_upload(
        &registry,
        &orchestrator,
        &dir.path().join("uploads"),
        "notes.docx",
        b"irrelevant",
    );
    assert!(result.is_err());
    assert!(registry.list_all().is_empty());
}
