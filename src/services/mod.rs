//! Service layer for the OCR pipeline.
//!
//! Domain logic separated from CLI concerns; the service can be driven by
//! the CLI or embedded elsewhere.

pub mod ocr;

pub use ocr::{OcrError, OcrService, RunSummary};
