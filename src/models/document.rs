//! Document metadata as served by the DocumentCloud API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A DocumentCloud document.
///
/// The pipeline treats this as an opaque handle: it reads the identifying
/// fields and the declared page count, and writes the assembled page list
/// back against `id`. Nothing here is persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Numeric document identifier.
    pub id: u64,
    /// URL slug used in asset paths.
    pub slug: String,
    /// Document title.
    pub title: String,
    /// Page count declared by the API. The OCR provider may disagree; the
    /// pipeline surfaces the mismatch but never reconciles it.
    pub page_count: u32,
    /// Base URL for static assets (the source PDF lives under it).
    pub asset_url: String,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// When the document was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// URL of the document's source PDF.
    pub fn pdf_url(&self) -> String {
        format!(
            "{}documents/{}/{}.pdf",
            self.asset_url, self.id, self.slug
        )
    }
}
