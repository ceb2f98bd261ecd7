//! Asynchronous OCR provider interface and the Cloud Vision implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// MIME type submitted for source files.
pub const MIME_PDF: &str = "application/pdf";

/// Default Cloud Vision API endpoint.
pub const VISION_ENDPOINT: &str = "https://vision.googleapis.com";

/// How long to wait for a job before giving up on it.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(360);

/// Delay between completion polls of a running operation.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Recognition capability requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Full-document text detection.
    DocumentTextDetection,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentTextDetection => "DOCUMENT_TEXT_DETECTION",
        }
    }
}

/// One annotation job for one source file.
///
/// Immutable once built; discarded after its results are consumed.
#[derive(Debug, Clone)]
pub struct OcrJob {
    /// `gs://` URI of the uploaded source file.
    pub source_uri: String,
    /// `gs://` URI prefix under which the provider writes result shards.
    pub destination_uri: String,
    /// MIME type of the source file.
    pub mime_type: String,
    /// Requested recognition feature.
    pub feature: Feature,
    /// Number of source pages grouped into each result shard.
    pub batch_size: u32,
    /// Completion deadline for the whole job.
    pub timeout: Duration,
}

impl OcrJob {
    pub fn new(source_uri: impl Into<String>, destination_uri: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            destination_uri: destination_uri.into(),
            mime_type: MIME_PDF.to_string(),
            feature: Feature::DocumentTextDetection,
            batch_size: 1,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Errors from the OCR provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("ocr job did not finish within {0:?}")]
    JobTimeout(Duration),

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job submission rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("submission response did not name an operation")]
    MissingOperation,

    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// Asynchronous annotation provider.
///
/// Implementations are stateless, thread-safe handles shared across
/// concurrently processed documents.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Submit `job` and block until the provider reports completion, the
    /// provider reports failure, or `job.timeout` elapses. The wait is not
    /// cancellable mid-flight; a timeout is terminal for this job.
    async fn annotate(&self, job: &OcrJob) -> Result<(), ProviderError>;
}

/// Cloud Vision client using the REST API.
///
/// `files:asyncBatchAnnotate` returns a long-running operation; completion is
/// observed by polling the operation resource. Takes an already-issued bearer
/// token; credential provisioning is the caller's concern.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: VISION_ENDPOINT.to_string(),
            token: token.into(),
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn submit(&self, job: &OcrJob) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "requests": [{
                "inputConfig": {
                    "gcsSource": { "uri": job.source_uri },
                    "mimeType": job.mime_type,
                },
                "features": [{ "type": job.feature.as_str() }],
                "outputConfig": {
                    "gcsDestination": { "uri": job.destination_uri },
                    "batchSize": job.batch_size,
                },
            }]
        });

        let response = self
            .http
            .post(format!("{}/v1/files:asyncBatchAnnotate", self.endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        #[derive(Deserialize)]
        struct Submitted {
            name: Option<String>,
        }

        let submitted: Submitted = response.json().await?;
        submitted.name.ok_or(ProviderError::MissingOperation)
    }

    async fn await_operation(&self, operation: &str) -> Result<(), ProviderError> {
        #[derive(Deserialize)]
        struct Operation {
            #[serde(default)]
            done: bool,
            error: Option<OperationError>,
        }

        #[derive(Deserialize)]
        struct OperationError {
            #[serde(default)]
            message: String,
        }

        loop {
            let response = self
                .http
                .get(format!("{}/v1/{}", self.endpoint, operation))
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Rejected { status, body });
            }

            let state: Operation = response.json().await?;
            if let Some(error) = state.error {
                return Err(ProviderError::OperationFailed(error.message));
            }
            if state.done {
                return Ok(());
            }

            tracing::debug!(operation, "ocr operation still running");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl OcrProvider for VisionClient {
    async fn annotate(&self, job: &OcrJob) -> Result<(), ProviderError> {
        let operation = self.submit(job).await?;
        tracing::info!(operation = %operation, uri = %job.source_uri, "submitted ocr job");

        match tokio::time::timeout(job.timeout, self.await_operation(&operation)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::JobTimeout(job.timeout)),
        }
    }
}
