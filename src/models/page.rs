//! Page text and word-position models.
//!
//! These serialize to the exact JSON shape the DocumentCloud page patch
//! endpoint accepts, so they double as the wire format.

use serde::{Deserialize, Serialize};

/// Engine tag recorded on every page this pipeline produces.
pub const OCR_ENGINE: &str = "googlecv";

/// The bounding box of one recognized word, in page-relative coordinates.
///
/// All coordinates are fractions of the page width or height in [0, 1].
/// `x1`/`y1` is the top-left corner and `x2`/`y2` the bottom-right corner;
/// the provider does not guarantee `x1 <= x2` or `y1 <= y2` and the pipeline
/// does not reorder them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPosition {
    pub text: String,
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

/// One page of OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page number, assigned by shard order during assembly.
    pub page_number: u32,
    /// Full recognized text of the page; empty when the provider returned no
    /// annotation for it.
    pub text: String,
    /// Engine tag, always [`OCR_ENGINE`].
    pub ocr: String,
    /// Word positions in the provider's block → paragraph → word traversal
    /// order.
    pub positions: Vec<WordPosition>,
}

impl Page {
    /// Create a page with no recognized content.
    pub fn empty(page_number: u32) -> Self {
        Self {
            page_number,
            text: String::new(),
            ocr: OCR_ENGINE.to_string(),
            positions: Vec::new(),
        }
    }
}
