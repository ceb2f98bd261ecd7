//! The `ocr` command: stage, submit, and patch each selected document.

use std::sync::Arc;

use anyhow::{bail, Context};
use console::style;

use crate::config::Config;
use crate::models::Document;
use crate::ocr::VisionClient;
use crate::repository::{DocumentCloudClient, DocumentRepository};
use crate::services::OcrService;
use crate::storage::GcsClient;

pub async fn cmd_ocr(
    config: &Config,
    document_ids: &[u64],
    bucket: Option<String>,
    dc_token: &str,
    gcp_token: &str,
) -> anyhow::Result<()> {
    if document_ids.is_empty() {
        bail!("no documents selected; pass one or more document IDs");
    }

    let bucket = bucket.unwrap_or_else(|| config.bucket.clone());
    let http = reqwest::Client::new();

    let documents_api = Arc::new(
        DocumentCloudClient::new(http.clone(), dc_token)
            .with_base_url(config.documentcloud_api.clone()),
    );
    let store = Arc::new(
        GcsClient::new(http.clone(), bucket.clone(), gcp_token)
            .with_endpoint(config.storage_endpoint.clone()),
    );
    let provider = Arc::new(
        VisionClient::new(http, gcp_token).with_endpoint(config.vision_endpoint.clone()),
    );

    let service = OcrService::new(store, provider, documents_api.clone(), bucket)
        .with_batch_size(config.batch_size)
        .with_timeout(config.job_timeout());

    // Fetch all metadata up front so a bad ID fails before any upload, and
    // so the page total can be reported before work starts.
    let mut documents = Vec::with_capacity(document_ids.len());
    for id in document_ids {
        let document = documents_api
            .get(*id)
            .await
            .with_context(|| format!("failed to fetch document {}", id))?;
        documents.push(document);
    }
    let total_pages: u32 = documents.iter().map(|d| d.page_count).sum();

    println!(
        "{} Processing {} document(s), {} page(s)",
        style("→").cyan(),
        documents.len(),
        total_pages
    );

    // Staging directory; its basename becomes the remote grouping prefix.
    let staging = tempfile::tempdir()?;
    let staging_dir = staging.path().join("documents");
    tokio::fs::create_dir_all(&staging_dir).await?;

    let mut failed = 0usize;
    for document in &documents {
        let pdf = match documents_api.download_pdf(document).await {
            Ok(pdf) => pdf,
            Err(e) => {
                println!("  {} {}: {}", style("✗").red(), document.title, e);
                failed += 1;
                continue;
            }
        };

        let pdf_path = staging_dir.join(format!("{}.pdf", sanitize_title(&document.title)));
        tokio::fs::write(&pdf_path, &pdf).await?;

        match service.run(document, &pdf_path).await {
            Ok(summary) => {
                println!(
                    "  {} {} ({} pages from {} shards)",
                    style("✓").green(),
                    document.title,
                    summary.pages,
                    summary.shards
                );
                warn_on_page_mismatch(document, summary.pages);
            }
            Err(e) => {
                println!("  {} {}: {}", style("✗").red(), document.title, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} documents failed", failed, documents.len());
    }
    Ok(())
}

fn warn_on_page_mismatch(document: &Document, assembled: usize) {
    if assembled as u64 != u64::from(document.page_count) {
        println!(
            "  {} {}: expected {} pages, OCR produced {}",
            style("!").yellow(),
            document.title,
            document.page_count,
            assembled
        );
    }
}

/// Make a document title safe to use as a staging filename.
fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if sanitized.is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}
