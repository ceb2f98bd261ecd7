//! OCR job orchestration against the Cloud Vision API.
//!
//! The provider runs asynchronously: a job is submitted with a storage
//! destination prefix, and the provider writes its results there as one or
//! more JSON shards. This module drives the job to completion, discovers and
//! orders the shards, and parses them back into per-page text and word
//! positions.
//!
//! Shard ordering is load-bearing: page numbers are assigned from shard
//! order, so [`locator`] sorts keys by length before comparing them
//! lexicographically to keep unpadded numeric suffixes in numeric order.

mod assembler;
mod locator;
mod parser;
mod provider;

pub use assembler::assemble;
pub use locator::{listing_prefix, locate_shards, LocateError};
pub use parser::{parse_shard, PageContent, ShardParseError};
pub use provider::{
    Feature, OcrJob, OcrProvider, ProviderError, VisionClient, DEFAULT_JOB_TIMEOUT, MIME_PDF,
    VISION_ENDPOINT,
};
