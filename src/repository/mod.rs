//! Document repository layer.
//!
//! Documents live in DocumentCloud; this layer reads their metadata and
//! source PDFs and writes the assembled page list back through the API.

mod documents;

pub use documents::{
    DocumentCloudClient, DocumentRepository, RepositoryError, DOCUMENTCLOUD_API,
};
