//! CLI for the OCR pipeline.

mod ocr;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cvocr")]
#[command(about = "Google Cloud Vision OCR pipeline for DocumentCloud documents")]
#[command(version)]
pub struct Cli {
    /// Config file (default: cvocr.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// OCR one or more documents and patch their page text
    Ocr {
        /// Document IDs to process
        document_ids: Vec<u64>,

        /// Override the storage bucket from config
        #[arg(long)]
        bucket: Option<String>,

        /// DocumentCloud API access token
        #[arg(long, env = "DC_API_TOKEN", hide_env_values = true)]
        dc_token: String,

        /// Google Cloud OAuth access token (storage + vision scopes)
        #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
        gcp_token: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = crate::config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ocr {
            document_ids,
            bucket,
            dc_token,
            gcp_token,
        } => ocr::cmd_ocr(&config, &document_ids, bucket, &dc_token, &gcp_token).await,
    }
}
