//! Page text acquisition.
//!
//! The pipeline consumes per-page plain text through the `PageTextSource`
//! trait so the orchestrator stays testable without real PDFs. The shipped
//! implementation uses the pdf-extract crate and handles digital PDFs with
//! embedded text layers.

use crate::pipeline::PipelineError;

/// Yields the ordered per-page plain text of a document.
pub trait PageTextSource: Send + Sync {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PipelineError>;
}

pub struct PdfTextSource;

impl PageTextSource for PdfTextSource {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PipelineError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PipelineError::PageText(e.to_string()))
    }
}
