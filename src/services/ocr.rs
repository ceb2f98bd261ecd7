//! End-to-end OCR run for a single document.
//!
//! Upload the source PDF, submit the annotation job, wait for it, discover
//! and parse the result shards, assemble the page list, and patch it back
//! onto the document. Nothing here retries; a failed run is retried
//! wholesale by the caller or not at all.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::models::Document;
use crate::ocr::{
    assemble, locate_shards, parse_shard, LocateError, OcrJob, OcrProvider, ProviderError,
    ShardParseError, DEFAULT_JOB_TIMEOUT,
};
use crate::repository::{DocumentRepository, RepositoryError};
use crate::storage::{BlobStore, StorageError};

/// The provider rejects overlong destination object names, so the filename
/// part of the destination prefix is truncated to this many characters.
const DESTINATION_NAME_LIMIT: usize = 60;

/// Errors from a document's OCR run.
///
/// Everything here is fatal for the run. Word-level anomalies never reach
/// this type; the parser absorbs them.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("document {document_id}: ocr job timed out after {timeout:?}")]
    JobTimeout { document_id: u64, timeout: Duration },

    #[error("document {document_id}: no result shards under '{prefix}'")]
    EmptyResultSet { document_id: u64, prefix: String },

    #[error("document {document_id}, shard '{key}': {source}")]
    Shard {
        document_id: u64,
        key: String,
        #[source]
        source: ShardParseError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Result shards consumed.
    pub shards: usize,
    /// Pages patched onto the document.
    pub pages: usize,
}

/// Runs the OCR pipeline for one document at a time.
///
/// Holds stateless client handles only, so one service instance may process
/// documents concurrently from separate tasks; the destination prefix embeds
/// the source filename, which keeps concurrent shard listings apart.
pub struct OcrService {
    store: Arc<dyn BlobStore>,
    provider: Arc<dyn OcrProvider>,
    documents: Arc<dyn DocumentRepository>,
    bucket: String,
    batch_size: u32,
    timeout: Duration,
}

impl OcrService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        provider: Arc<dyn OcrProvider>,
        documents: Arc<dyn DocumentRepository>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            documents,
            bucket: bucket.into(),
            batch_size: 1,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    /// Number of source pages grouped into each result shard.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Completion deadline for the annotation job.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// OCR `document` from the staged PDF at `source_path` and patch the
    /// resulting page list onto it.
    pub async fn run(
        &self,
        document: &Document,
        source_path: &Path,
    ) -> Result<RunSummary, OcrError> {
        let remote_key = remote_key(source_path);
        self.store.upload(source_path, &remote_key).await?;

        let source_uri = format!("gs://{}/{}", self.bucket, remote_key);
        let destination_uri = self.destination_uri(source_path);

        let job = OcrJob::new(source_uri, destination_uri.clone())
            .with_batch_size(self.batch_size)
            .with_timeout(self.timeout);

        tracing::info!(
            document_id = document.id,
            source = %job.source_uri,
            destination = %job.destination_uri,
            "submitting ocr job"
        );

        match self.provider.annotate(&job).await {
            Err(ProviderError::JobTimeout(timeout)) => {
                return Err(OcrError::JobTimeout {
                    document_id: document.id,
                    timeout,
                });
            }
            other => other?,
        }

        let shard_keys = locate_shards(self.store.as_ref(), &destination_uri).await?;
        if shard_keys.is_empty() {
            // The provider reported success but wrote nothing; treat it as a
            // provider-side failure rather than a zero-page document.
            return Err(OcrError::EmptyResultSet {
                document_id: document.id,
                prefix: destination_uri,
            });
        }

        let mut shard_pages = Vec::with_capacity(shard_keys.len());
        for key in &shard_keys {
            let payload = self.store.download(key).await?;
            let pages = parse_shard(&payload).map_err(|source| OcrError::Shard {
                document_id: document.id,
                key: key.clone(),
                source,
            })?;
            shard_pages.push(pages);
        }

        let pages = assemble(shard_pages);

        if pages.len() as u64 != u64::from(document.page_count) {
            tracing::warn!(
                document_id = document.id,
                declared = document.page_count,
                assembled = pages.len(),
                "assembled page count differs from the document's declared page count"
            );
        }

        self.documents.patch_pages(document.id, &pages).await?;

        Ok(RunSummary {
            shards: shard_keys.len(),
            pages: pages.len(),
        })
    }

    /// Destination prefix for the job's result shards.
    ///
    /// Shards land next to the upload under a `json_output/` prefix named
    /// after the source file, so concurrent runs for different files never
    /// share a listing prefix.
    fn destination_uri(&self, source_path: &Path) -> String {
        let filename = file_name(source_path);
        let group = group_name(source_path);
        format!(
            "gs://{}/{}/json_output/{}_",
            self.bucket,
            group,
            truncate_chars(&filename, DESTINATION_NAME_LIMIT)
        )
    }
}

/// Remote object key for an uploaded source file: the staging directory's
/// basename plus the filename.
fn remote_key(source_path: &Path) -> String {
    let filename = file_name(source_path);
    let group = group_name(source_path);
    if group.is_empty() {
        filename
    } else {
        format!("{}/{}", group, filename)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn group_name(path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Truncate to at most `limit` characters, never splitting a character.
fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
