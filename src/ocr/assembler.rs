//! Final page assembly across ordered shard results.

use crate::models::{Page, OCR_ENGINE};

use super::parser::PageContent;

/// Flatten per-shard page sequences, in shard order, into the document's
/// page list.
///
/// Page numbers are the running index over the flattened sequence. Any page
/// number the provider may have embedded in a payload is ignored; ordering
/// is owned entirely by the shard sequence.
pub fn assemble(shard_pages: Vec<Vec<PageContent>>) -> Vec<Page> {
    shard_pages
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(index, content)| Page {
            page_number: index as u32,
            text: content.text,
            ocr: OCR_ENGINE.to_string(),
            positions: content.positions,
        })
        .collect()
}
