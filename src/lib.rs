//! Cloud Vision OCR pipeline for DocumentCloud documents.
//!
//! Submits a document's PDF to the Google Cloud Vision asynchronous
//! annotation API, collects the JSON result shards the provider writes into
//! a storage bucket, and patches the reconstructed per-page text and word
//! positions back onto the document.

pub mod cli;
pub mod config;
pub mod models;
pub mod ocr;
pub mod repository;
pub mod services;
pub mod storage;
