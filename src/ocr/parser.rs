//! Parsing of one result shard into normalized page content.
//!
//! A shard is a JSON document holding one or more response units, one per
//! source page batched into the shard. Tolerance is deliberately uneven:
//!
//! - A response with no `fullTextAnnotation` becomes an empty page, keeping
//!   page numbering contiguous.
//! - A vertex with a missing coordinate reads as 0.
//! - A word whose bounding box leaves the unit square is dropped, alone.
//! - Anything else missing is fatal for the whole run. Skipping a broken
//!   shard would silently shift every later page number, and truncated text
//!   with no indication of loss is worse than an explicit failure.

use serde::Deserialize;
use thiserror::Error;

use crate::models::WordPosition;

/// Errors from shard parsing.
#[derive(Debug, Error)]
pub enum ShardParseError {
    /// The payload is not valid JSON at all.
    #[error("shard payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload is valid JSON but a required field is absent or has the
    /// wrong shape.
    #[error("shard is missing a required field: {0}")]
    Structural(#[source] serde_json::Error),

    /// A word's bounding polygon has too few vertices to carry the corner
    /// contract.
    #[error("word bounding box has {0} vertices, expected 4")]
    TruncatedBoundingBox(usize),
}

/// Text and word positions for one page, before a page number is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub text: String,
    pub positions: Vec<WordPosition>,
}

impl PageContent {
    fn empty() -> Self {
        Self {
            text: String::new(),
            positions: Vec::new(),
        }
    }
}

// Wire shapes for the provider's annotate-file output. Fields without a
// serde default are required; their absence is a structural failure.

#[derive(Debug, Deserialize)]
struct AnnotateFileOutput {
    responses: Vec<ResponseUnit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseUnit {
    full_text_annotation: Option<FullTextAnnotation>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    text: String,
    pages: Vec<AnnotatedPage>,
}

#[derive(Debug, Deserialize)]
struct AnnotatedPage {
    blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
struct Block {
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    words: Vec<Word>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Word {
    bounding_box: BoundingBox,
    symbols: Vec<Symbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingBox {
    normalized_vertices: Vec<NormalizedVertex>,
}

#[derive(Debug, Deserialize)]
struct NormalizedVertex {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct Symbol {
    text: String,
}

/// Parse one shard's raw bytes into its pages, in response order.
///
/// One shard may yield multiple pages when the provider batches several
/// source pages per shard; callers must not assume a single page.
pub fn parse_shard(payload: &[u8]) -> Result<Vec<PageContent>, ShardParseError> {
    // Two-stage parse so the error taxonomy stays precise: bytes that are
    // not JSON and JSON that lacks required structure fail differently.
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(ShardParseError::Malformed)?;
    let output: AnnotateFileOutput =
        serde_json::from_value(value).map_err(ShardParseError::Structural)?;

    output
        .responses
        .into_iter()
        .map(page_from_response)
        .collect()
}

fn page_from_response(response: ResponseUnit) -> Result<PageContent, ShardParseError> {
    let Some(annotation) = response.full_text_annotation else {
        // No recognized content on this page. An empty page keeps numbering
        // contiguous; omitting it would shift every later page.
        return Ok(PageContent::empty());
    };

    let mut positions = Vec::new();
    for page in &annotation.pages {
        for block in &page.blocks {
            for paragraph in &block.paragraphs {
                for word in &paragraph.words {
                    if let Some(position) = word_position(word)? {
                        positions.push(position);
                    }
                }
            }
        }
    }

    Ok(PageContent {
        text: annotation.text,
        positions,
    })
}

/// Extract a word's bounding box and text.
///
/// The polygon is 4 normalized vertices ordered clockwise from the top-left
/// corner: vertex 0 carries the left x and top y, vertex 1 the right x, and
/// vertex 2 the bottom y. This indexing is a contract with the provider, not
/// a generic bounding-box read.
fn word_position(word: &Word) -> Result<Option<WordPosition>, ShardParseError> {
    let vertices = &word.bounding_box.normalized_vertices;
    if vertices.len() < 3 {
        return Err(ShardParseError::TruncatedBoundingBox(vertices.len()));
    }

    let x1 = vertices[0].x;
    let x2 = vertices[1].x;
    let y1 = vertices[0].y;
    let y2 = vertices[2].y;

    let text: String = word.symbols.iter().map(|symbol| symbol.text.as_str()).collect();

    if ![x1, x2, y1, y2].iter().all(|c| (0.0..=1.0).contains(c)) {
        tracing::debug!(
            word = %text,
            x1, x2, y1, y2,
            "dropping word with out-of-range bounding box"
        );
        return Ok(None);
    }

    Ok(Some(WordPosition { text, x1, x2, y1, y2 }))
}
