//! audit: reconciles the Internet Archive's page-image inventory of each
//! item against the downloads, OCR text, and thumbnails mirrored into S3.
//!
//! The audit file is a JSON object keyed by item identifier. Each run
//! refreshes the storage inventories, fetches the remote inventory when it
//! is not cached yet, records the missing files per category with a status,
//! and always writes a `.bak` copy before saving the updated file, even when
//! the loop fails or is interrupted.

#![warn(clippy::all)]

mod archive;
mod audit;
mod cli;
mod config;
mod logging;
mod reconcile;
mod record;
pub mod retry;
mod shutdown;
mod storage;
mod store;
mod types;

use clap::Parser;

use config::Config;

const DEFAULT_ENV_FILE: &str = ".env.production";

/// Load credentials and endpoints from the env file, if present. Runs before
/// CLI parsing so clap's `env` fallbacks see the values.
fn load_env_file() {
    let path = std::env::var("AUDIT_ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
    match dotenvy::from_filename(&path) {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Warning: failed to load {}: {}", path, e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    let cli = cli::Cli::parse();
    let config = Config::from_cli(cli)?;
    let mut set = store::load_audit_set(&config.path)?;

    let _log_guard = logging::init(&config.log_file, config.log_level)?;
    println!("\nTrack progress by tailing {}\n", config.log_file.display());
    tracing::debug!(?config, "Configuration loaded");

    let archive = archive::IaClient::new(
        &config.ia_base_url,
        config.credentials.clone(),
        config.connect_timeout,
        config.request_timeout,
    )?;
    let storage =
        storage::S3Lister::from_env(config.bucket.clone(), config.s3_endpoint.clone()).await;
    tracing::info!(
        bucket = storage.bucket(),
        archive = %config.ia_base_url,
        items = set.len(),
        "Starting audit of {}",
        config.path.display()
    );

    let shutdown_token = shutdown::install_signal_handler()?;
    let auditor = audit::Auditor::new(&archive, &archive, &storage, &config.audit);
    audit::run_and_save(&auditor, &config.path, &mut set, &shutdown_token).await?;
    Ok(())
}
