//! End-to-end pipeline tests against in-memory collaborators.
//!
//! The service is exercised through the same traits the production clients
//! implement: an in-memory object store, a scripted provider that writes
//! shards the way Cloud Vision does, and a recording document repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use cloudvision_ocr::models::{Document, Page, WordPosition};
use cloudvision_ocr::ocr::{listing_prefix, OcrJob, OcrProvider, ProviderError};
use cloudvision_ocr::repository::{DocumentRepository, RepositoryError};
use cloudvision_ocr::services::{OcrError, OcrService};
use cloudvision_ocr::storage::{BlobStore, StorageError};

/// In-memory object store.
struct InMemStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemStore {
    fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    fn insert(&self, key: &str, payload: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), payload);
    }

    fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for InMemStore {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError> {
        let bytes = std::fs::read(local_path).map_err(|source| StorageError::Io {
            path: local_path.to_path_buf(),
            source,
        })?;
        self.insert(remote_key, bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.lock().unwrap();
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        // Listings carry no ordering contract; return the worst case so the
        // locator has to do the sorting.
        keys.reverse();
        Ok(keys)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(key).expect("object must exist").clone())
    }
}

/// Provider fake that writes pre-scripted shards under the destination
/// prefix, shard n named with the provider's unpadded numeric suffix.
struct ScriptedProvider {
    store: Arc<InMemStore>,
    shards: Vec<Vec<u8>>,
}

#[async_trait]
impl OcrProvider for ScriptedProvider {
    async fn annotate(&self, job: &OcrJob) -> Result<(), ProviderError> {
        let prefix = listing_prefix(&job.destination_uri).expect("valid destination uri");
        for (index, payload) in self.shards.iter().enumerate() {
            let n = index + 1;
            let key = format!("{}output-{}-to-{}.json", prefix, n, n);
            self.store.insert(&key, payload.clone());
        }
        Ok(())
    }
}

/// Provider fake that fails every job the given way.
struct TimedOutProvider;

#[async_trait]
impl OcrProvider for TimedOutProvider {
    async fn annotate(&self, _job: &OcrJob) -> Result<(), ProviderError> {
        Err(ProviderError::JobTimeout(Duration::from_secs(360)))
    }
}

/// Repository fake recording every patch.
struct RecordingRepository {
    patched: Mutex<Vec<(u64, Vec<Page>)>>,
}

impl RecordingRepository {
    fn new() -> Self {
        Self {
            patched: Mutex::new(Vec::new()),
        }
    }

    fn patches(&self) -> Vec<(u64, Vec<Page>)> {
        self.patched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentRepository for RecordingRepository {
    async fn get(&self, _document_id: u64) -> Result<Document, RepositoryError> {
        unimplemented!("not used by the pipeline")
    }

    async fn download_pdf(&self, _document: &Document) -> Result<Vec<u8>, RepositoryError> {
        unimplemented!("not used by the pipeline")
    }

    async fn patch_pages(&self, document_id: u64, pages: &[Page]) -> Result<(), RepositoryError> {
        self.patched
            .lock()
            .unwrap()
            .push((document_id, pages.to_vec()));
        Ok(())
    }
}

fn document(page_count: u32) -> Document {
    Document {
        id: 700,
        slug: "report".to_string(),
        title: "Report".to_string(),
        page_count,
        asset_url: "https://assets.example.org/".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Stage a placeholder PDF under `<tempdir>/documents/report.pdf`.
fn stage_pdf(dir: &tempfile::TempDir) -> PathBuf {
    let staging = dir.path().join("documents");
    std::fs::create_dir_all(&staging).unwrap();
    let path = staging.join("report.pdf");
    std::fs::write(&path, b"%PDF-1.4 placeholder").unwrap();
    path
}

fn shard_with_word(text: &str, word: &str, corners: [f64; 4]) -> Vec<u8> {
    let [x1, x2, y1, y2] = corners;
    let symbols: Vec<serde_json::Value> = word
        .chars()
        .map(|c| json!({"text": c.to_string()}))
        .collect();
    serde_json::to_vec(&json!({
        "responses": [{
            "fullTextAnnotation": {
                "text": text,
                "pages": [{
                    "blocks": [{
                        "paragraphs": [{
                            "words": [{
                                "boundingBox": {"normalizedVertices": [
                                    {"x": x1, "y": y1},
                                    {"x": x2, "y": y1},
                                    {"x": x2, "y": y2},
                                    {"x": x1, "y": y2},
                                ]},
                                "symbols": symbols,
                            }]
                        }]
                    }]
                }]
            }
        }]
    }))
    .unwrap()
}

fn empty_shard() -> Vec<u8> {
    serde_json::to_vec(&json!({"responses": [{}]})).unwrap()
}

fn text_only_shard(text: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "responses": [{"fullTextAnnotation": {"text": text, "pages": []}}]
    }))
    .unwrap()
}

fn service_with(
    store: Arc<InMemStore>,
    provider: Arc<dyn OcrProvider>,
    repository: Arc<RecordingRepository>,
) -> OcrService {
    OcrService::new(store, provider, repository, "test-bucket")
}

#[tokio::test]
async fn test_two_shard_run_patches_expected_pages() {
    let store = Arc::new(InMemStore::new());
    let provider = Arc::new(ScriptedProvider {
        store: store.clone(),
        shards: vec![
            shard_with_word("Hello world\n", "Hello", [0.1, 0.3, 0.05, 0.2]),
            empty_shard(),
        ],
    });
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store.clone(), provider, repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);
    let document = document(2);

    let summary = service.run(&document, &pdf_path).await.unwrap();
    assert_eq!(summary.shards, 2);
    assert_eq!(summary.pages, 2);

    // The source PDF was uploaded under the staging group prefix.
    assert!(store.contains("documents/report.pdf"));

    let patches = repository.patches();
    assert_eq!(patches.len(), 1);
    let (document_id, pages) = &patches[0];
    assert_eq!(*document_id, 700);
    assert_eq!(
        pages[0],
        Page {
            page_number: 0,
            text: "Hello world\n".to_string(),
            ocr: "googlecv".to_string(),
            positions: vec![WordPosition {
                text: "Hello".to_string(),
                x1: 0.1,
                x2: 0.3,
                y1: 0.05,
                y2: 0.2,
            }],
        }
    );
    assert_eq!(pages[1], Page::empty(1));
}

#[tokio::test]
async fn test_eleven_shards_keep_numeric_page_order() {
    let store = Arc::new(InMemStore::new());
    let shards: Vec<Vec<u8>> = (1..=11)
        .map(|n| text_only_shard(&format!("shard {}", n)))
        .collect();
    let provider = Arc::new(ScriptedProvider {
        store: store.clone(),
        shards,
    });
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store.clone(), provider, repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);

    let summary = service.run(&document(11), &pdf_path).await.unwrap();
    assert_eq!(summary.pages, 11);

    // A naive lexicographic sort would order shard 10 and 11 before 2; the
    // length-first ordering must keep them numeric.
    let patches = repository.patches();
    let pages = &patches[0].1;
    for (index, page) in pages.iter().enumerate() {
        assert_eq!(page.page_number, index as u32);
        assert_eq!(page.text, format!("shard {}", index + 1));
    }
}

#[tokio::test]
async fn test_no_shards_is_an_empty_result_set() {
    let store = Arc::new(InMemStore::new());
    let provider = Arc::new(ScriptedProvider {
        store: store.clone(),
        shards: Vec::new(),
    });
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store.clone(), provider, repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);

    let err = service.run(&document(1), &pdf_path).await.unwrap_err();
    assert!(matches!(
        err,
        OcrError::EmptyResultSet { document_id: 700, .. }
    ));
    assert!(repository.patches().is_empty());
}

#[tokio::test]
async fn test_provider_timeout_is_terminal() {
    let store = Arc::new(InMemStore::new());
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store, Arc::new(TimedOutProvider), repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);

    let err = service.run(&document(1), &pdf_path).await.unwrap_err();
    assert!(matches!(err, OcrError::JobTimeout { document_id: 700, .. }));
    assert!(repository.patches().is_empty());
}

#[tokio::test]
async fn test_malformed_shard_aborts_with_its_key() {
    let store = Arc::new(InMemStore::new());
    let provider = Arc::new(ScriptedProvider {
        store: store.clone(),
        shards: vec![text_only_shard("fine"), b"not json at all".to_vec()],
    });
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store.clone(), provider, repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);

    let err = service.run(&document(2), &pdf_path).await.unwrap_err();
    match err {
        OcrError::Shard { key, .. } => assert!(key.ends_with("output-2-to-2.json")),
        other => panic!("expected shard error, got {:?}", other),
    }
    assert!(repository.patches().is_empty());
}

#[tokio::test]
async fn test_page_count_mismatch_still_patches() {
    let store = Arc::new(InMemStore::new());
    let provider = Arc::new(ScriptedProvider {
        store: store.clone(),
        shards: vec![text_only_shard("only page")],
    });
    let repository = Arc::new(RecordingRepository::new());
    let service = service_with(store.clone(), provider, repository.clone());

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = stage_pdf(&dir);

    // Declared page count disagrees with what the provider produced; the run
    // must still succeed and patch what was assembled.
    let summary = service.run(&document(5), &pdf_path).await.unwrap();
    assert_eq!(summary.pages, 1);
    assert_eq!(repository.patches().len(), 1);
}
