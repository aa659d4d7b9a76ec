//! LedgerLens: structured data extraction from PDF sales reports.
//!
//! Splits a document's text into page-aligned segments, sends each segment
//! to an extraction capability under retry with backoff, and merges the
//! partial results into one document-level record. A bounded temp file
//! store manages uploaded artifacts for the rest of the application.

pub mod capability;
pub mod config;
pub mod pdftext;
pub mod pipeline;
pub mod storage;

use tracing_subscriber::EnvFilter;

/// Initialize tracing. RUST_LOG overrides the built-in default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
