//! Discovery and deterministic ordering of result shards.

use thiserror::Error;
use url::Url;

use crate::storage::{BlobStore, StorageError};

/// Errors from shard discovery.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("invalid destination uri '{uri}': {reason}")]
    InvalidDestination { uri: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Strip the scheme and bucket segment from a `gs://bucket/...` destination
/// URI, leaving the path-only listing prefix.
///
/// Object names are listed verbatim, so the percent-encoding the URL parser
/// applies (spaces and non-ASCII in document titles) is undone here.
pub fn listing_prefix(destination_uri: &str) -> Result<String, LocateError> {
    let url = Url::parse(destination_uri).map_err(|e| LocateError::InvalidDestination {
        uri: destination_uri.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "gs" || url.host_str().is_none() {
        return Err(LocateError::InvalidDestination {
            uri: destination_uri.to_string(),
            reason: "expected a gs://bucket/... uri".to_string(),
        });
    }

    let path = url.path().trim_start_matches('/');
    let decoded = urlencoding::decode(path).map_err(|e| LocateError::InvalidDestination {
        uri: destination_uri.to_string(),
        reason: e.to_string(),
    })?;
    Ok(decoded.into_owned())
}

/// Order shard keys by length ascending, then lexicographically.
///
/// The provider suffixes shard names with an unpadded shard number, so a
/// plain lexicographic sort would place "...10_" before "...2_". Comparing
/// lengths first groups keys by digit count, and lexicographic order within
/// a group then matches numeric order.
pub fn order_shards(keys: &mut [String]) {
    keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
}

/// List all result shards written under `destination_uri`, in the order
/// their contents appear in the document.
///
/// An empty result is not an error here; the caller decides whether zero
/// shards means a failed job.
pub async fn locate_shards(
    store: &dyn BlobStore,
    destination_uri: &str,
) -> Result<Vec<String>, LocateError> {
    let prefix = listing_prefix(destination_uri)?;
    let mut keys = store.list(&prefix).await?;
    order_shards(&mut keys);
    Ok(keys)
}
